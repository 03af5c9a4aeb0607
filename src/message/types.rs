//! The owned message type.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::command::Command;
use crate::error::MessageParseError;
use crate::prefix::Prefix;

use super::parse::ParsedLine;
use super::tags::{parse_tags, Tag};

/// Maximum length of the message body (excluding `\r\n`).
pub const MAX_BODY_LEN: usize = 512;

/// Maximum length of the leading tag section (excluding the `@`).
pub const MAX_TAGS_LEN: usize = 8191;

/// Properties of a message beyond its wire content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageFlags {
    /// The engine produced or solicited this message itself (also set on
    /// composed replies when any constituent carried it).
    pub implicit: bool,
    /// Replayed history: the timestamp came from a `server-time` tag.
    pub playback: bool,
    /// The line exceeded the body or tag length limit but was parsed anyway.
    pub oversized: bool,
}

/// A parsed IRC message.
///
/// Immutable once parsed; the timestamp is the wall clock at receipt unless
/// a `server-time` tag supplied one.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// IRCv3 tags, keys unique, unordered.
    pub tags: Option<Vec<Tag>>,
    /// The sender, when the line carried one.
    pub prefix: Option<Prefix>,
    /// The typed command.
    pub command: Command,
    /// Receipt (or server-supplied) time.
    pub timestamp: DateTime<Utc>,
    /// Flag set.
    pub flags: MessageFlags,
}

impl Message {
    /// Wrap a command with no tags or prefix, stamped now.
    pub fn new(command: Command) -> Message {
        Message {
            tags: None,
            prefix: None,
            command,
            timestamp: Utc::now(),
            flags: MessageFlags::default(),
        }
    }

    /// Parse one line, `\r\n` (or lone `\n`) tolerated and stripped.
    ///
    /// Lenient about length: over-limit lines parse normally but come back
    /// with `flags.oversized` set. Grammar failures are the only errors.
    pub fn parse(line: &str) -> Result<Message, MessageParseError> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let parsed = ParsedLine::parse(trimmed)?;

        let mut flags = MessageFlags::default();
        let tags_len = parsed.tags.map_or(0, |t| t.len());
        // '@' plus the separating space.
        let body_len = trimmed.len() - parsed.tags.map_or(0, |t| t.len() + 2);
        if tags_len > MAX_TAGS_LEN || body_len > MAX_BODY_LEN {
            flags.oversized = true;
        }

        let tags = parsed.tags.map(parse_tags);
        let prefix = parsed.prefix.map(Prefix::new_from_str);
        let command = Command::new(parsed.command, parsed.params)?;

        let mut timestamp = Utc::now();
        if let Some(tags) = &tags {
            if let Some(Tag(_, Some(value))) = tags.iter().find(|t| t.0 == "time") {
                if let Ok(server_time) = DateTime::parse_from_rfc3339(value) {
                    timestamp = server_time.with_timezone(&Utc);
                    flags.playback = true;
                }
            }
        }

        Ok(Message {
            tags,
            prefix,
            command,
            timestamp,
            flags,
        })
    }

    /// Attach (or replace) a tag.
    pub fn with_tag(mut self, key: &str, value: Option<&str>) -> Message {
        let tags = self.tags.get_or_insert_with(Vec::new);
        if let Some(existing) = tags.iter_mut().find(|t| t.0 == key) {
            existing.1 = value.map(str::to_owned);
        } else {
            tags.push(Tag(key.to_owned(), value.map(str::to_owned)));
        }
        self
    }

    /// Attach a prefix.
    pub fn with_prefix(mut self, prefix: Prefix) -> Message {
        self.prefix = Some(prefix);
        self
    }

    /// The sender's nick, when the prefix names a user.
    pub fn sender_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Look up a tag value.
    pub fn tag(&self, key: &str) -> Option<Option<&str>> {
        self.tags
            .as_ref()?
            .iter()
            .find(|t| t.0 == key)
            .map(|t| t.1.as_deref())
    }

    // Conveniences for the handful of messages the engine itself sends.

    /// `PRIVMSG target :text`
    pub fn privmsg(target: &str, text: &str) -> Message {
        Message::new(Command::PRIVMSG(target.to_owned(), text.to_owned()))
    }

    /// `NOTICE target :text`
    pub fn notice(target: &str, text: &str) -> Message {
        Message::new(Command::NOTICE(target.to_owned(), text.to_owned()))
    }

    /// `JOIN channel`
    pub fn join(channel: &str) -> Message {
        Message::new(Command::JOIN(channel.to_owned(), None, None))
    }

    /// `PONG token`
    pub fn pong(token: &str) -> Message {
        Message::new(Command::PONG(token.to_owned(), None))
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Message {
        Message::new(command)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Message, MessageParseError> {
        Message::parse(s)
    }
}
