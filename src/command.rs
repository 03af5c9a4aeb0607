//! IRC command types.
//!
//! [`Command`] is the tagged-variant sum over the verbs the engine speaks,
//! plus a catch-all for numerics and one for anything unknown. The composer
//! adds synthetic variants (`Motd`, `Names`, `WhoReply`, `Whois`, `Whowas`)
//! that aggregate multi-line server replies; those never appear on the wire
//! themselves.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - IRCv3 specifications: <https://ircv3.net/>

use crate::error::MessageParseError;
use crate::response::Response;

/// An IRC command with its parameters.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Command {
    // === Connection registration ===
    /// `PASS password`
    PASS(String),
    /// `NICK nickname` (the old nick, when any, is in the message prefix)
    NICK(String),
    /// `USER username mode realname`
    USER(String, String, String),
    /// `QUIT [reason]`
    QUIT(Option<String>),

    // === Channel operations ===
    /// `JOIN channel [account] [realname]` (extras filled by extended-join)
    JOIN(String, Option<String>, Option<String>),
    /// `PART channel [reason]`
    PART(String, Option<String>),
    /// `MODE target [modestring] [args...]`
    ///
    /// Mode words are kept raw; their meaning depends on ISUPPORT and is
    /// resolved by the channel state layer.
    MODE(String, Vec<String>),
    /// `TOPIC channel [text]`
    TOPIC(String, Option<String>),
    /// `NAMES [channels]`
    NAMES(Option<String>),
    /// `INVITE nickname channel`
    INVITE(String, String),
    /// `KICK channel user [reason]`
    KICK(String, String, Option<String>),

    // === Messaging ===
    /// `PRIVMSG target text`
    PRIVMSG(String, String),
    /// `NOTICE target text`
    NOTICE(String, String),

    // === Queries ===
    /// `MOTD [target]`
    MOTD(Option<String>),
    /// `WHO [mask]`
    WHO(Option<String>),
    /// `WHOIS nickmasks`
    WHOIS(String),
    /// `WHOWAS nickname`
    WHOWAS(String),

    // === Presence / liveness ===
    /// `AWAY [message]`
    AWAY(Option<String>),
    /// `PING token [token2]`
    PING(String, Option<String>),
    /// `PONG token [token2]`
    PONG(String, Option<String>),
    /// `ERROR message`
    ERROR(String),

    // === IRCv3 ===
    /// `CAP [target] subcommand [param] [capabilities]`
    CAP(
        Option<String>,
        CapSubCommand,
        Option<String>,
        Option<String>,
    ),
    /// `AUTHENTICATE mechanism_or_data`
    AUTHENTICATE(String),
    /// `ACCOUNT accountname` (account-notify)
    ACCOUNT(String),

    // === Numerics and unknowns ===
    /// Numeric reply from the server, code plus raw params.
    Response(Response, Vec<String>),
    /// Unknown command captured as raw.
    Raw(String, Vec<String>),

    // === Composed replies (synthetic, produced by the composer) ===
    /// The complete MOTD, text lines in receipt order.
    Motd(Vec<String>),
    /// A complete NAMES reply for one channel, deduped, prefixes split off.
    Names {
        /// Channel the reply is for.
        channel: String,
        /// Roster entries in receipt order.
        entries: Vec<NameEntry>,
    },
    /// One parsed WHO record.
    WhoReply(Box<UserInfo>),
    /// A filled WHOIS record.
    Whois(Box<UserInfo>),
    /// A filled WHOWAS record.
    Whowas(Box<UserInfo>),
}

/// CAP subcommands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum CapSubCommand {
    /// Request or list server capabilities.
    LS,
    /// List currently enabled capabilities.
    LIST,
    /// Request capabilities.
    REQ,
    /// Acknowledge requested capabilities.
    ACK,
    /// Reject requested capabilities.
    NAK,
    /// End negotiation.
    END,
    /// Capabilities became available (cap-notify).
    NEW,
    /// Capabilities were removed (cap-notify).
    DEL,
}

impl CapSubCommand {
    /// The wire form of this subcommand.
    pub fn to_str(self) -> &'static str {
        match self {
            CapSubCommand::LS => "LS",
            CapSubCommand::LIST => "LIST",
            CapSubCommand::REQ => "REQ",
            CapSubCommand::ACK => "ACK",
            CapSubCommand::NAK => "NAK",
            CapSubCommand::END => "END",
            CapSubCommand::NEW => "NEW",
            CapSubCommand::DEL => "DEL",
        }
    }

    fn parse(s: &str) -> Option<CapSubCommand> {
        match s.to_ascii_uppercase().as_str() {
            "LS" => Some(CapSubCommand::LS),
            "LIST" => Some(CapSubCommand::LIST),
            "REQ" => Some(CapSubCommand::REQ),
            "ACK" => Some(CapSubCommand::ACK),
            "NAK" => Some(CapSubCommand::NAK),
            "END" => Some(CapSubCommand::END),
            "NEW" => Some(CapSubCommand::NEW),
            "DEL" => Some(CapSubCommand::DEL),
            _ => None,
        }
    }
}

/// One entry of a composed NAMES reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameEntry {
    /// The prefix characters that preceded the nick (`"@+"` etc., may be
    /// more than one under multi-prefix), in server rank order.
    pub prefixes: String,
    /// The bare nick.
    pub nick: String,
}

/// A user record filled by WHO/WHOIS/WHOWAS composition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Nickname.
    pub nick: String,
    /// Ident/username.
    pub ident: String,
    /// Hostname.
    pub host: String,
    /// WHO: the mask or channel the reply matched.
    pub mask: Option<String>,
    /// Server the user is connected to.
    pub server: Option<String>,
    /// Server info line (312).
    pub server_info: Option<String>,
    /// WHO status flags (`H`/`G`, `*`, prefix chars).
    pub status: Option<String>,
    /// Real name / GECOS.
    pub realname: Option<String>,
    /// Account name, if logged in (330).
    pub account: Option<String>,
    /// Host/address text (378).
    pub address: Option<String>,
    /// Channels the user is on (319), prefix sigils included verbatim.
    pub channels: Vec<String>,
    /// Seconds idle (317).
    pub idle_secs: Option<u64>,
    /// Signon time as a unix timestamp (317).
    pub signon: Option<i64>,
    /// Connected over TLS (671).
    pub secure: bool,
    /// Away, when the reply carries it (WHO status `G`).
    pub away: Option<bool>,
}

fn trailing(args: &[&str], from: usize) -> Option<String> {
    args.get(from).map(|s| (*s).to_owned())
}

fn require(args: &[&str], n: usize) -> Result<(), MessageParseError> {
    if args.len() < n {
        Err(MessageParseError::NotEnoughArguments {
            expected: n,
            got: args.len(),
        })
    } else {
        Ok(())
    }
}

impl Command {
    /// Type a raw command name plus parameter list.
    ///
    /// Total over well-formed lines: verbs the engine does not know come
    /// back as [`Command::Raw`], three-digit commands as
    /// [`Command::Response`].
    pub fn new(cmd: &str, args: Vec<&str>) -> Result<Command, MessageParseError> {
        let upper = cmd.to_ascii_uppercase();
        Ok(match upper.as_str() {
            "PASS" => {
                require(&args, 1)?;
                Command::PASS(args[0].to_owned())
            }
            "NICK" => {
                require(&args, 1)?;
                Command::NICK(args[0].to_owned())
            }
            "USER" => {
                require(&args, 4)?;
                Command::USER(args[0].to_owned(), args[1].to_owned(), args[3].to_owned())
            }
            "QUIT" => Command::QUIT(trailing(&args, 0)),
            "JOIN" => {
                require(&args, 1)?;
                Command::JOIN(args[0].to_owned(), trailing(&args, 1), trailing(&args, 2))
            }
            "PART" => {
                require(&args, 1)?;
                Command::PART(args[0].to_owned(), trailing(&args, 1))
            }
            "MODE" => {
                require(&args, 1)?;
                Command::MODE(
                    args[0].to_owned(),
                    args[1..].iter().map(|s| (*s).to_owned()).collect(),
                )
            }
            "TOPIC" => {
                require(&args, 1)?;
                Command::TOPIC(args[0].to_owned(), trailing(&args, 1))
            }
            "NAMES" => Command::NAMES(trailing(&args, 0)),
            "INVITE" => {
                require(&args, 2)?;
                Command::INVITE(args[0].to_owned(), args[1].to_owned())
            }
            "KICK" => {
                require(&args, 2)?;
                Command::KICK(args[0].to_owned(), args[1].to_owned(), trailing(&args, 2))
            }
            "PRIVMSG" => {
                require(&args, 2)?;
                Command::PRIVMSG(args[0].to_owned(), args[1].to_owned())
            }
            "NOTICE" => {
                require(&args, 2)?;
                Command::NOTICE(args[0].to_owned(), args[1].to_owned())
            }
            "MOTD" => Command::MOTD(trailing(&args, 0)),
            "WHO" => Command::WHO(trailing(&args, 0)),
            "WHOIS" => {
                require(&args, 1)?;
                Command::WHOIS(args[0].to_owned())
            }
            "WHOWAS" => {
                require(&args, 1)?;
                Command::WHOWAS(args[0].to_owned())
            }
            "AWAY" => Command::AWAY(trailing(&args, 0)),
            "PING" => {
                require(&args, 1)?;
                Command::PING(args[0].to_owned(), trailing(&args, 1))
            }
            "PONG" => {
                require(&args, 1)?;
                Command::PONG(args[0].to_owned(), trailing(&args, 1))
            }
            "ERROR" => {
                require(&args, 1)?;
                Command::ERROR(args[0].to_owned())
            }
            "CAP" => Self::new_cap(&args)?,
            "AUTHENTICATE" => {
                require(&args, 1)?;
                Command::AUTHENTICATE(args[0].to_owned())
            }
            "ACCOUNT" => {
                require(&args, 1)?;
                Command::ACCOUNT(args[0].to_owned())
            }
            _ => {
                if let Ok(resp) = upper.parse::<Response>() {
                    Command::Response(resp, args.into_iter().map(|s| s.to_owned()).collect())
                } else if upper.bytes().all(|b| b.is_ascii_alphabetic()) {
                    Command::Raw(upper, args.into_iter().map(|s| s.to_owned()).collect())
                } else {
                    return Err(MessageParseError::InvalidCommand);
                }
            }
        })
    }

    // `CAP [*|nick] <sub> [param] [:caps]`; servers put our nick (or `*`)
    // first, client-originated CAP has the subcommand first.
    fn new_cap(args: &[&str]) -> Result<Command, MessageParseError> {
        require(args, 1)?;
        let (target, rest) = match CapSubCommand::parse(args[0]) {
            Some(_) => (None, args),
            None => {
                require(args, 2)?;
                (Some(args[0].to_owned()), &args[1..])
            }
        };
        let sub = CapSubCommand::parse(rest[0]).ok_or_else(|| {
            MessageParseError::InvalidArgument(format!("CAP subcommand {}", rest[0]))
        })?;
        let (param, caps) = match rest.len() {
            0 | 1 => (None, None),
            2 => (None, Some(rest[1].to_owned())),
            _ => (Some(rest[1].to_owned()), Some(rest[2].to_owned())),
        };
        Ok(Command::CAP(target, sub, param, caps))
    }

    /// The wire verb, or `"RESPONSE"` for numerics.
    pub fn name(&self) -> &str {
        match self {
            Command::PASS(_) => "PASS",
            Command::NICK(_) => "NICK",
            Command::USER(..) => "USER",
            Command::QUIT(_) => "QUIT",
            Command::JOIN(..) => "JOIN",
            Command::PART(..) => "PART",
            Command::MODE(..) => "MODE",
            Command::TOPIC(..) => "TOPIC",
            Command::NAMES(_) => "NAMES",
            Command::INVITE(..) => "INVITE",
            Command::KICK(..) => "KICK",
            Command::PRIVMSG(..) => "PRIVMSG",
            Command::NOTICE(..) => "NOTICE",
            Command::MOTD(_) | Command::Motd(_) => "MOTD",
            Command::WHO(_) | Command::WhoReply(_) => "WHO",
            Command::WHOIS(_) | Command::Whois(_) => "WHOIS",
            Command::WHOWAS(_) | Command::Whowas(_) => "WHOWAS",
            Command::AWAY(_) => "AWAY",
            Command::PING(..) => "PING",
            Command::PONG(..) => "PONG",
            Command::ERROR(_) => "ERROR",
            Command::CAP(..) => "CAP",
            Command::AUTHENTICATE(_) => "AUTHENTICATE",
            Command::ACCOUNT(_) => "ACCOUNT",
            Command::Response(..) => "RESPONSE",
            Command::Raw(name, _) => name,
            Command::Names { .. } => "NAMES",
        }
    }

    /// The numeric code and params, when this is a numeric reply.
    pub fn response(&self) -> Option<(Response, &[String])> {
        match self {
            Command::Response(resp, args) => Some((*resp, args)),
            _ => None,
        }
    }

    /// True for composer output that has no wire form of its own.
    pub fn is_composed(&self) -> bool {
        matches!(
            self,
            Command::Motd(_)
                | Command::Names { .. }
                | Command::WhoReply(_)
                | Command::Whois(_)
                | Command::Whowas(_)
        )
    }
}
