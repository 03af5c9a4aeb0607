//! CTCP framing inside PRIVMSG/NOTICE text.
//!
//! A CTCP message is the trailing parameter wrapped in `\x01` delimiters:
//! `\x01VERB args\x01`. The closing delimiter is accepted as optional, as
//! many clients omit it.

const DELIM: char = '\u{1}';

/// A CTCP query or reply borrowed from message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The CTCP verb, e.g. `ACTION`, `VERSION`, `PING`.
    pub command: &'a str,
    /// Everything after the verb and its separating space.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse message text as CTCP, if it is one.
    pub fn parse(text: &'a str) -> Option<Ctcp<'a>> {
        let inner = text.strip_prefix(DELIM)?;
        let inner = inner.strip_suffix(DELIM).unwrap_or(inner);
        if inner.is_empty() {
            return None;
        }
        match inner.split_once(' ') {
            Some((command, params)) => Some(Ctcp {
                command,
                params: Some(params),
            }),
            None => Some(Ctcp {
                command: inner,
                params: None,
            }),
        }
    }

    /// Whether this is a `/me` action.
    pub fn is_action(&self) -> bool {
        self.command.eq_ignore_ascii_case("ACTION")
    }
}

/// Frame a CTCP verb and optional arguments for sending.
pub fn format_ctcp(command: &str, params: Option<&str>) -> String {
    match params {
        Some(params) => format!("{}{} {}{}", DELIM, command, params, DELIM),
        None => format!("{}{}{}", DELIM, command, DELIM),
    }
}

/// Frame a `/me` action.
pub fn action(text: &str) -> String {
    format_ctcp("ACTION", Some(text))
}
