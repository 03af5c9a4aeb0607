//! User model behavior over a live session: sorting, dynamic re-sort, and
//! the mode/prefix invariant.

use std::time::Instant;

use ircview::{
    Buffer, Casemapping, Client, Event, SessionConfig, SortMethod, SortOrder, UserModel,
};

const MAPPING: Casemapping = Casemapping::Rfc1459;

struct Harness {
    client: Client,
    model: UserModel,
}

impl Harness {
    // Connect, announce a PREFIX, join #test, and seed the roster.
    fn new(prefix: &str, names: &str) -> Harness {
        let config = SessionConfig {
            host: "irc.example.org".into(),
            nick: "me".into(),
            user: "me".into(),
            real_name: "Me".into(),
            ..SessionConfig::default()
        };
        let mut client = Client::new(config);
        let now = Instant::now();
        client.open(now).unwrap();
        client.transport_connected(now);
        for line in [
            ":srv 001 me :hi".to_owned(),
            format!(":srv 005 me PREFIX={prefix} :are supported by this server"),
            ":me!u@h JOIN #test".to_owned(),
        ] {
            client.receive_line(&line, now);
        }

        let mut harness = Harness {
            model: UserModel::new(
                client
                    .buffers()
                    .find_by_name(MAPPING, "#test")
                    .and_then(Buffer::as_channel)
                    .unwrap(),
            ),
            client,
        };
        harness.feed(&format!(":srv 353 me = #test :{names}"));
        harness.feed(":srv 366 me #test :End");
        harness
    }

    fn channel(&self) -> &ircview::Channel {
        self.client
            .buffers()
            .find_by_name(MAPPING, "#test")
            .and_then(Buffer::as_channel)
            .unwrap()
    }

    // Run a line through the client and mirror roster changes into the
    // model, the way an embedder would.
    fn feed(&mut self, line: &str) {
        let step = self.client.receive_line(line, Instant::now());
        for event in step.events {
            if let Event::Roster { change, .. } = event {
                let channel = self
                    .client
                    .buffers()
                    .find_by_name(MAPPING, "#test")
                    .and_then(Buffer::as_channel)
                    .unwrap();
                self.model.apply(channel, self.client.isupport(), &change);
            }
        }
    }

    fn names(&self) -> Vec<String> {
        self.model
            .names(self.channel())
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn sort(&mut self, method: SortMethod, order: SortOrder) {
        self.model.set_method(method);
        self.model.set_order(order);
        let channel = self
            .client
            .buffers()
            .find_by_name(MAPPING, "#test")
            .and_then(Buffer::as_channel)
            .unwrap();
        self.model.sort(channel, self.client.isupport());
    }
}

#[test]
fn test_mode_prefix_lengths_always_match() {
    let harness = Harness::new("(qaohv)~&@%+", "me ~&admin @op %half +voice plain");
    for user in harness.channel().users() {
        assert_eq!(user.mode.chars().count(), user.prefix.chars().count());
        for (mode, prefix) in user.mode.chars().zip(user.prefix.chars()) {
            assert_eq!(
                harness.client.isupport().prefix().prefix_for(mode),
                Some(prefix)
            );
        }
    }
    let admin = harness.channel().user(MAPPING, "admin").unwrap();
    assert_eq!(admin.mode, "qa");
    assert_eq!(admin.prefix, "~&");
}

#[test]
fn test_sort_by_name_is_ordered() {
    let mut harness = Harness::new("(ov)@+", "me Zoe @amy +Kim bob");
    harness.sort(SortMethod::ByName, SortOrder::Ascending);
    let names = harness.names();
    assert_eq!(names, vec!["amy", "bob", "Kim", "me", "Zoe"]);
    for pair in names.windows(2) {
        assert!(pair[0].to_lowercase() <= pair[1].to_lowercase());
    }
}

#[test]
fn test_title_sort_with_multi_prefix() {
    // Prefix setting (qaohv)~&@%+; users a:~ b:@ c:+ d:(none).
    let mut harness = Harness::new("(qaohv)~&@%+", "me ~a @b +c d");

    harness.sort(SortMethod::ByTitle, SortOrder::Ascending);
    let names = harness.names();
    let positions: Vec<usize> = ["a", "b", "c", "d"]
        .iter()
        .map(|n| names.iter().position(|x| x == n).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{names:?}");

    harness.sort(SortMethod::ByTitle, SortOrder::Descending);
    let names = harness.names();
    let positions: Vec<usize> = ["d", "c", "b", "a"]
        .iter()
        .map(|n| names.iter().position(|x| x == n).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{names:?}");
}

#[test]
fn test_title_rank_ordering_invariant() {
    let mut harness = Harness::new("(qaohv)~&@%+", "me ~q &a @o %h +v none");
    harness.sort(SortMethod::ByTitle, SortOrder::Ascending);
    let channel = harness.channel();
    let prefix_map = harness.client.isupport().prefix();
    for i in 0..harness.model.count() - 1 {
        let a = harness.model.get(channel, i).unwrap();
        let b = harness.model.get(channel, i + 1).unwrap();
        assert!(a.rank(prefix_map) <= b.rank(prefix_map));
    }
}

#[test]
fn test_activity_reorder() {
    let mut harness = Harness::new("(ov)@+", "me @op user straterra");
    harness.model.set_method(SortMethod::ByActivity);
    harness.model.set_dynamic_sort(true);

    harness.feed("@time=2100-01-01T00:00:00Z :user!u@h PRIVMSG #test :hi");
    assert_eq!(harness.model.index_of(MAPPING, "user"), Some(0));

    harness.feed("@time=2100-01-01T00:00:01Z :straterra!s@h PRIVMSG #test :what?");
    assert_eq!(harness.model.index_of(MAPPING, "straterra"), Some(0));
    assert_eq!(harness.model.index_of(MAPPING, "user"), Some(1));
}

#[test]
fn test_activity_join_and_rename_count() {
    let mut harness = Harness::new("(ov)@+", "me smurfy agsrv");
    harness.model.set_method(SortMethod::ByActivity);
    harness.model.set_dynamic_sort(true);

    harness.feed(":smurfy!s@h PART #test");
    assert_eq!(harness.model.count(), 2);
    assert!(!harness.model.contains(MAPPING, "smurfy"));

    harness.feed("@time=2100-01-01T00:00:00Z :late!l@h JOIN #test");
    assert_eq!(harness.model.count(), 3);
    assert_eq!(harness.model.index_of(MAPPING, "late"), Some(0));

    harness.feed("@time=2100-01-01T00:00:01Z :agsrv!a@h NICK :agsrv_afk");
    assert!(!harness.model.contains(MAPPING, "agsrv"));
    assert_eq!(harness.model.index_of(MAPPING, "agsrv_afk"), Some(0));
    assert_eq!(harness.model.index_of(MAPPING, "late"), Some(1));
}

#[test]
fn test_quit_leaves_model() {
    let mut harness = Harness::new("(ov)@+", "me a b");
    harness.feed(":a!a@h QUIT :gone");
    assert_eq!(harness.model.count(), 2);
    assert!(!harness.model.contains(MAPPING, "a"));
    assert!(harness.model.contains(MAPPING, "b"));
}

#[test]
fn test_mode_grant_resorts_dynamically() {
    let mut harness = Harness::new("(ov)@+", "me @op zed");
    harness.model.set_method(SortMethod::ByTitle);
    harness.model.set_dynamic_sort(true);
    harness.sort(SortMethod::ByTitle, SortOrder::Ascending);
    assert_eq!(harness.names(), vec!["op", "me", "zed"]);

    harness.feed(":op!o@h MODE #test +o zed");
    // zed is now ranked and moves ahead of the unranked user.
    let names = harness.names();
    let zed = names.iter().position(|n| n == "zed").unwrap();
    let me = names.iter().position(|n| n == "me").unwrap();
    assert!(zed < me, "{names:?}");
}

#[test]
fn test_unsorted_keeps_insertion_order() {
    let harness = Harness::new("(ov)@+", "me zed @amy bob");
    assert_eq!(harness.names(), vec!["me", "zed", "amy", "bob"]);
}
