//! Fuzz target for IRC message parsing.
//!
//! Feeds arbitrary input to the parser and ensures it never panics; for
//! lines that do parse, formatting and reparsing must succeed as well.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.len() > 9000 {
            return;
        }

        if let Ok(msg) = input.parse::<ircview::Message>() {
            // Anything that parsed must format and reparse cleanly.
            let wire = msg.to_string();
            let reparsed = wire
                .parse::<ircview::Message>()
                .expect("formatted message must reparse");
            assert_eq!(msg.command, reparsed.command);
        }
    }
});
