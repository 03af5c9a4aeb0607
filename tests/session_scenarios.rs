//! End-to-end scenarios: literal server input, expected observable state.
//!
//! These drive the full pipeline (parse, compose, dispatch) through
//! [`Client`] the way a transport host would.

use std::time::{Duration, Instant};

use ircview::{
    Action, Buffer, Casemapping, Client, Command, Event, SessionConfig, SessionState,
};

fn client() -> Client {
    let config = SessionConfig {
        host: "irc.example.org".into(),
        port: 6667,
        nick: "me".into(),
        user: "me".into(),
        real_name: "Me".into(),
        ..SessionConfig::default()
    };
    let mut client = Client::new(config);
    let now = Instant::now();
    client.open(now).unwrap();
    client.transport_connected(now);
    client
}

fn feed(client: &mut Client, input: &str) -> Vec<Event> {
    let now = Instant::now();
    let mut events = Vec::new();
    for line in input.split_inclusive("\r\n") {
        events.extend(client.receive_line(line, now).events);
    }
    events
}

fn channel<'a>(client: &'a Client, name: &str) -> &'a ircview::Channel {
    client
        .buffers()
        .find_by_name(client.isupport().casemapping(), name)
        .and_then(Buffer::as_channel)
        .expect("channel buffer")
}

const MAPPING: Casemapping = Casemapping::Rfc1459;

#[test]
fn scenario_welcome_and_join() {
    let mut client = client();
    let events = feed(
        &mut client,
        ":srv 001 me :hi\r\n:me!u@h JOIN #c\r\n:srv 353 me = #c :me @op +v user\r\n:srv 366 me #c :End\r\n",
    );

    assert_eq!(client.state(), SessionState::Registered);
    assert_eq!(client.buffers().len(), 1);

    let channel = channel(&client, "#c");
    assert_eq!(channel.len(), 4);
    let op = channel.user(MAPPING, "op").unwrap();
    assert_eq!((op.mode.as_str(), op.prefix.as_str()), ("o", "@"));
    let v = channel.user(MAPPING, "v").unwrap();
    assert_eq!((v.mode.as_str(), v.prefix.as_str()), ("v", "+"));
    let user = channel.user(MAPPING, "user").unwrap();
    assert_eq!((user.mode.as_str(), user.prefix.as_str()), ("", ""));

    // Exactly one synthetic Names message came out of the 353/366 pair.
    let names_messages = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                Event::MessageReceived { message, .. }
                    if matches!(message.command, Command::Names { .. })
            )
        })
        .count();
    assert_eq!(names_messages, 1);
}

#[test]
fn scenario_nick_rename_propagation() {
    let mut client = client();
    feed(
        &mut client,
        ":srv 001 me :hi\r\n:me!u@h JOIN #c\r\n:srv 353 me = #c :me @op user\r\n:srv 366 me #c :End\r\n",
    );
    feed(&mut client, ":user!u@h NICK :user2\r\n");

    let channel = channel(&client, "#c");
    assert_eq!(channel.len(), 3);
    assert!(!channel.contains(MAPPING, "user"));
    let renamed = channel.user(MAPPING, "user2").unwrap();
    assert_eq!(renamed.mode, "");
    assert_eq!(renamed.prefix, "");
}

#[test]
fn scenario_rename_keeps_op_mode() {
    let mut client = client();
    feed(
        &mut client,
        ":srv 001 me :hi\r\n:me!u@h JOIN #c\r\n:srv 353 me = #c :me @op\r\n:srv 366 me #c :End\r\n",
    );
    feed(&mut client, ":op!o@h NICK :operator\r\n");
    let renamed = channel(&client, "#c").user(MAPPING, "operator").unwrap();
    assert_eq!(renamed.mode, "o");
    assert_eq!(renamed.prefix, "@");
}

#[test]
fn scenario_motd_coalesce() {
    let mut client = client();
    let events = feed(
        &mut client,
        ":s 375 me :-\r\n:s 372 me :- line1\r\n:s 372 me :- line2\r\n:s 376 me :end\r\n",
    );
    let motds: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::MessageReceived { message, .. } => match &message.command {
                Command::Motd(lines) => Some(lines.clone()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(motds, vec![vec!["- line1".to_owned(), "- line2".to_owned()]]);
}

#[test]
fn scenario_reconnect_backoff() {
    let config = SessionConfig {
        host: "irc.example.org".into(),
        nick: "me".into(),
        user: "me".into(),
        real_name: "Me".into(),
        ..SessionConfig::default()
    };
    let mut client = Client::new(config);
    let mut now = Instant::now();
    let step = client.open(now).unwrap();
    assert!(matches!(step.actions[0], Action::Connect { .. }));

    let mut delays = Vec::new();
    for _ in 0..3 {
        client.transport_connected(now);
        let step = client.transport_closed(now, Some("connection reset".into()));
        let delay = step
            .events
            .iter()
            .find_map(|e| match e {
                Event::ReconnectScheduled { delay, .. } => Some(*delay),
                _ => None,
            })
            .expect("reconnect scheduled");
        delays.push(delay);
        assert_eq!(client.state(), SessionState::Backoff);

        // Jump to the deadline; the machine reconnects on its own.
        let deadline = client.next_deadline().expect("deadline while backing off");
        now = deadline;
        let step = client.tick(now);
        assert!(matches!(step.actions[0], Action::Connect { .. }));
        assert_eq!(client.state(), SessionState::Connecting);
    }

    let secs: Vec<f64> = delays.iter().map(Duration::as_secs_f64).collect();
    assert!((0.8..=1.2).contains(&secs[0]), "attempt 1 at {}s", secs[0]);
    assert!((1.6..=2.4).contains(&secs[1]), "attempt 2 at {}s", secs[1]);
    assert!((3.2..=4.8).contains(&secs[2]), "attempt 3 at {}s", secs[2]);
}

#[test]
fn scenario_ping_is_answered_immediately() {
    let mut client = client();
    let now = Instant::now();
    let step = client.receive_line("PING :token-123\r\n", now);
    let sent: Vec<String> = step
        .actions
        .iter()
        .filter_map(|a| match a {
            Action::Send(msg) => Some(msg.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(sent, vec!["PONG token-123"]);
}

#[test]
fn scenario_self_part_then_rejoin() {
    let mut client = client();
    feed(
        &mut client,
        ":srv 001 me :hi\r\n:me!u@h JOIN #x\r\n:srv 353 me = #x :me other\r\n:srv 366 me #x :End\r\n",
    );
    feed(&mut client, ":me!u@h PART #x\r\n");
    {
        let channel = channel(&client, "#x");
        assert!(channel.is_empty());
        assert!(!channel.is_joined());
    }

    feed(
        &mut client,
        ":me!u@h JOIN #x\r\n:srv 353 me = #x :me\r\n:srv 366 me #x :End\r\n",
    );
    let channel = channel(&client, "#x");
    assert!(channel.is_joined());
    assert_eq!(channel.len(), 1);
}

#[test]
fn scenario_kick_of_self_clears_roster() {
    let mut client = client();
    feed(
        &mut client,
        ":srv 001 me :hi\r\n:me!u@h JOIN #c\r\n:srv 353 me = #c :me bully\r\n:srv 366 me #c :End\r\n",
    );
    feed(&mut client, ":bully!b@h KICK #c me :out\r\n");
    let channel = channel(&client, "#c");
    assert!(channel.is_empty());
    assert!(!channel.is_joined());
}

#[test]
fn scenario_queued_sends_flush_on_welcome() {
    let mut client = client();
    let step = client
        .send(Command::JOIN("#later".into(), None, None))
        .unwrap();
    assert!(step.actions.is_empty(), "buffered before registration");

    let step = client.receive_line(":srv 001 me :hi\r\n", Instant::now());
    let sent: Vec<String> = step
        .actions
        .iter()
        .filter_map(|a| match a {
            Action::Send(msg) => Some(msg.to_string()),
            _ => None,
        })
        .collect();
    assert!(sent.contains(&"JOIN #later".to_owned()));
}

#[test]
fn scenario_casemapped_channel_addressing() {
    let mut client = client();
    feed(
        &mut client,
        ":srv 001 me :hi\r\n:me!u@h JOIN #C[1]\r\n:srv 353 me = #C[1] :me\r\n:srv 366 me #C[1] :End\r\n",
    );
    // rfc1459 folding: {} match [].
    assert!(client
        .buffers()
        .find_by_name(MAPPING, "#c{1}")
        .is_some());
}

#[test]
fn scenario_whois_composed_once() {
    let mut client = client();
    let events = feed(
        &mut client,
        ":s 311 me dan ident h * :Dan\r\n:s 312 me dan srv :info\r\n:s 318 me dan :End of /WHOIS list.\r\n",
    );
    let whois: Vec<_> = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                Event::MessageReceived { message, .. }
                    if matches!(&message.command, Command::Whois(_))
            )
        })
        .collect();
    assert_eq!(whois.len(), 1);
}
