//! IRCv3 capability negotiation support.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use std::collections::HashSet;

/// Known IRCv3 capability names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Capability {
    /// Show all user prefix modes in NAMES
    MultiPrefix,
    /// SASL authentication
    Sasl,
    /// Notify of account login/logout
    AccountNotify,
    /// Notify of away status changes
    AwayNotify,
    /// Extended JOIN with account and realname
    ExtendedJoin,
    /// Server-time message tags
    ServerTime,
    /// Unknown/custom capability
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::MultiPrefix => "multi-prefix",
            Self::Sasl => "sasl",
            Self::AccountNotify => "account-notify",
            Self::AwayNotify => "away-notify",
            Self::ExtendedJoin => "extended-join",
            Self::ServerTime => "server-time",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "multi-prefix" => Self::MultiPrefix,
            "sasl" => Self::Sasl,
            "account-notify" => Self::AccountNotify,
            "away-notify" => Self::AwayNotify,
            "extended-join" => Self::ExtendedJoin,
            "server-time" => Self::ServerTime,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Parse a CAP LS/ACK/NAK capability list into `(name, value)` pairs.
///
/// CAP 302 entries may carry `name=value`; the value is kept for callers
/// that need it (e.g. the advertised SASL mechanism list).
pub fn parse_cap_list(list: &str) -> Vec<(String, Option<String>)> {
    list.split_whitespace()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => (name.to_owned(), Some(value.to_owned())),
            None => (entry.to_owned(), None),
        })
        .collect()
}

/// Apply ACK/NEW/DEL changes to the active capability set.
///
/// Entries prefixed with `-` remove; everything else adds. Returns true
/// when the set changed.
pub fn apply_changes(capabilities: &mut HashSet<String>, changes: &str) -> bool {
    let mut modified = false;
    for entry in changes.split_whitespace() {
        if let Some(name) = entry.strip_prefix('-') {
            if capabilities.remove(name) {
                modified = true;
            }
        } else {
            let name = entry.split('=').next().unwrap_or(entry);
            if capabilities.insert(name.to_owned()) {
                modified = true;
            }
        }
    }
    modified
}
