//! Fuzz target for CTCP framing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if let Some(ctcp) = ircview::Ctcp::parse(input) {
            let _ = ctcp.is_action();
            let framed = ircview::ctcp::format_ctcp(ctcp.command, ctcp.params);
            assert!(ircview::Ctcp::parse(&framed).is_some());
        }
    }
});
