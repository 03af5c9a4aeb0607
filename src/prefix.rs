//! Message source prefixes.
//!
//! The optional `:<source>` token at the start of a line names the sender:
//! either a server, or a user in `nick[!user][@host]` form.

use std::fmt;

/// The source of an incoming message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    /// A bare server name (contains a `.` and no `!`/`@`).
    ServerName(String),
    /// `nick[!user][@host]`; missing parts are empty strings.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse a prefix token (without the leading `:`).
    ///
    /// Anything without `!`/`@` that looks like a hostname is a server;
    /// everything else is treated as a nickname.
    pub fn new_from_str(s: &str) -> Prefix {
        let mut name = String::new();
        let mut user = String::new();
        let mut host = String::new();
        let mut dest = 0;
        let mut dotted = false;

        for c in s.chars() {
            match c {
                '!' if dest == 0 => dest = 1,
                '@' if dest < 2 => dest = 2,
                '.' if dest == 0 => {
                    dotted = true;
                    name.push(c);
                }
                _ => match dest {
                    0 => name.push(c),
                    1 => user.push(c),
                    _ => host.push(c),
                },
            }
        }

        if dotted && user.is_empty() && host.is_empty() {
            Prefix::ServerName(name)
        } else {
            Prefix::Nickname(name, user, host)
        }
    }

    /// The nick of a user prefix, if this is one.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) => Some(nick),
            Prefix::ServerName(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Prefix {
        Prefix::new_from_str(s)
    }
}
