//! Benchmarks for message parsing, serialization, and the dispatch path.

use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ircview::{Client, Message, SessionConfig};

const SIMPLE_MESSAGE: &str = "PING :irc.example.com";
const PREFIX_MESSAGE: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";
const TAGGED_MESSAGE: &str = "@time=2023-01-01T00:00:00.000Z;msgid=abc123;+example/tag=value :nick!user@host PRIVMSG #channel :Hello with tags!";
const NUMERIC_RESPONSE: &str = ":irc.server.net 001 nickname :Welcome to the IRC Network";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Parsing");
    for (name, line) in [
        ("simple_ping", SIMPLE_MESSAGE),
        ("with_prefix", PREFIX_MESSAGE),
        ("with_tags", TAGGED_MESSAGE),
        ("numeric_response", NUMERIC_RESPONSE),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let msg: Message = black_box(line).parse().unwrap();
                black_box(msg)
            })
        });
    }
    group.finish();
}

fn benchmark_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Serialization");
    for (name, line) in [
        ("simple_ping", SIMPLE_MESSAGE),
        ("with_prefix", PREFIX_MESSAGE),
        ("with_tags", TAGGED_MESSAGE),
    ] {
        let msg: Message = line.parse().unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let s = black_box(&msg).to_string();
                black_box(s)
            })
        });
    }
    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dispatch");

    fn registered_client() -> Client {
        let mut client = Client::new(SessionConfig {
            host: "irc.example.org".into(),
            nick: "me".into(),
            user: "me".into(),
            real_name: "Me".into(),
            ..SessionConfig::default()
        });
        let now = Instant::now();
        client.open(now).unwrap();
        client.transport_connected(now);
        for line in [
            ":srv 001 me :hi",
            ":me!u@h JOIN #bench",
            ":srv 353 me = #bench :me @op +voice user1 user2 user3",
            ":srv 366 me #bench :End",
        ] {
            client.receive_line(line, now);
        }
        client
    }

    group.bench_function("channel_privmsg", |b| {
        let mut client = registered_client();
        let now = Instant::now();
        b.iter(|| {
            let step = client.receive_line(
                black_box(":user1!u@h PRIVMSG #bench :benchmark message"),
                now,
            );
            black_box(step)
        })
    });

    group.bench_function("names_reply", |b| {
        let mut client = registered_client();
        let now = Instant::now();
        b.iter(|| {
            client.receive_line(black_box(":srv 353 me = #bench :nickA nickB nickC"), now);
            let step = client.receive_line(black_box(":srv 366 me #bench :End"), now);
            black_box(step)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_parsing,
    benchmark_serialization,
    benchmark_dispatch,
);

criterion_main!(benches);
