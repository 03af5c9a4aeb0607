//! Aggregation of multi-line server replies into single messages.
//!
//! MOTD, NAMES, and WHOIS/WHOWAS arrive as runs of numerics bracketed by
//! start and end codes; consumers want one logical event. The composer
//! holds at most one in-flight aggregate per kind: a fresh start of the
//! same kind means the server reset, so the incomplete aggregate is
//! discarded and a diagnostic recorded. Numerics outside the table pass
//! through untouched.

use std::collections::HashSet;

use crate::command::{Command, NameEntry, UserInfo};
use crate::isupport::PrefixMap;
use crate::message::{Message, MessageFlags};
use crate::prefix::Prefix;
use crate::response::Response;

/// What became of a message fed to the composer.
#[derive(Clone, Debug, PartialEq)]
pub enum Composed {
    /// Not a composed numeric; deliver as-is.
    Pass(Message),
    /// Consumed into an in-flight aggregate; nothing to deliver yet.
    Absorbed,
    /// A complete synthetic message.
    Done(Message),
}

#[derive(Debug)]
struct MotdPartial {
    prefix: Option<Prefix>,
    lines: Vec<String>,
    implicit: bool,
}

#[derive(Debug)]
struct NamesPartial {
    prefix: Option<Prefix>,
    channel: String,
    entries: Vec<NameEntry>,
    seen: HashSet<String>,
    implicit: bool,
}

#[derive(Debug)]
struct UserPartial {
    info: UserInfo,
    implicit: bool,
}

/// The per-session reply aggregator.
#[derive(Debug, Default)]
pub struct Composer {
    motd: Option<MotdPartial>,
    names: Option<NamesPartial>,
    whois: Option<UserPartial>,
    whowas: Option<UserPartial>,
    diagnostics: Vec<String>,
}

impl Composer {
    pub fn new() -> Composer {
        Composer::default()
    }

    /// Whether a numeric participates in composition.
    pub fn is_composed(code: Response) -> bool {
        matches!(
            code,
            Response::RPL_MOTDSTART
                | Response::RPL_MOTD
                | Response::RPL_ENDOFMOTD
                | Response::RPL_NAMREPLY
                | Response::RPL_ENDOFNAMES
                | Response::RPL_TOPIC
                | Response::RPL_NOTOPIC
                | Response::RPL_INVITING
                | Response::RPL_INVITED
                | Response::RPL_WHOREPLY
                | Response::RPL_ENDOFWHO
                | Response::RPL_CHANNELMODEIS
                | Response::RPL_AWAY
                | Response::RPL_UNAWAY
                | Response::RPL_NOWAWAY
                | Response::RPL_WHOISUSER
                | Response::RPL_WHOWASUSER
                | Response::RPL_WHOISSERVER
                | Response::RPL_WHOISACCOUNT
                | Response::RPL_WHOISHOST
                | Response::RPL_WHOISIDLE
                | Response::RPL_WHOISSECURE
                | Response::RPL_WHOISCHANNELS
                | Response::RPL_ENDOFWHOIS
                | Response::RPL_ENDOFWHOWAS
        )
    }

    /// Diagnostics recorded since the last call (discarded aggregates,
    /// continuations without a start).
    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Abandon all in-flight aggregates (connection lost).
    pub fn reset(&mut self) {
        self.motd = None;
        self.names = None;
        self.whois = None;
        self.whowas = None;
    }

    /// Feed one message through the composer.
    pub fn feed(&mut self, msg: Message, prefix_map: &PrefixMap) -> Composed {
        let (code, args) = match msg.command.response() {
            Some((code, args)) if Self::is_composed(code) => (code, args.to_vec()),
            _ => return Composed::Pass(msg),
        };

        match code {
            Response::RPL_MOTDSTART => {
                if self.motd.is_some() {
                    self.diagnostics
                        .push("MOTD restarted; discarding incomplete aggregate".to_owned());
                }
                self.motd = Some(MotdPartial {
                    prefix: msg.prefix.clone(),
                    lines: Vec::new(),
                    implicit: msg.flags.implicit,
                });
                Composed::Absorbed
            }
            Response::RPL_MOTD => {
                match &mut self.motd {
                    Some(partial) => {
                        partial.lines.push(args.get(1).cloned().unwrap_or_default());
                        partial.implicit |= msg.flags.implicit;
                    }
                    None => self
                        .diagnostics
                        .push("MOTD line without RPL_MOTDSTART".to_owned()),
                }
                Composed::Absorbed
            }
            Response::RPL_ENDOFMOTD => match self.motd.take() {
                Some(partial) => Composed::Done(finish(
                    Command::Motd(partial.lines),
                    partial.prefix,
                    partial.implicit,
                    &msg,
                )),
                None => Composed::Absorbed,
            },

            Response::RPL_NAMREPLY => {
                // `<me> <symbol> <channel> :[prefix]nick ...`; channel and
                // names are the last two params whatever the server put in
                // between.
                if args.len() < 2 {
                    self.diagnostics.push("short RPL_NAMREPLY".to_owned());
                    return Composed::Absorbed;
                }
                let channel = args[args.len() - 2].clone();
                let names = &args[args.len() - 1];

                if let Some(partial) = &self.names {
                    if partial.channel != channel {
                        self.diagnostics.push(format!(
                            "NAMES for {} restarted by reply for {}",
                            partial.channel, channel
                        ));
                        self.names = None;
                    }
                }
                let partial = self.names.get_or_insert_with(|| NamesPartial {
                    prefix: msg.prefix.clone(),
                    channel,
                    entries: Vec::new(),
                    seen: HashSet::new(),
                    implicit: false,
                });
                partial.implicit |= msg.flags.implicit;
                // ASCII space is the only separator servers use here.
                for word in names.split(' ').filter(|w| !w.is_empty()) {
                    let (prefixes, nick) = prefix_map.split_name(word);
                    if partial.seen.insert(nick.to_owned()) {
                        partial.entries.push(NameEntry {
                            prefixes: prefixes.to_owned(),
                            nick: nick.to_owned(),
                        });
                    }
                }
                Composed::Absorbed
            }
            Response::RPL_ENDOFNAMES => {
                let channel = args.get(1).cloned().unwrap_or_default();
                match self.names.take() {
                    Some(partial) if partial.channel == channel => Composed::Done(finish(
                        Command::Names {
                            channel: partial.channel,
                            entries: partial.entries,
                        },
                        partial.prefix,
                        partial.implicit,
                        &msg,
                    )),
                    Some(partial) => {
                        self.diagnostics.push(format!(
                            "end of NAMES for {} while composing {}",
                            channel, partial.channel
                        ));
                        Composed::Absorbed
                    }
                    None => Composed::Absorbed,
                }
            }

            Response::RPL_WHOREPLY => {
                // `<me> <mask> <ident> <host> <server> <nick> <status> :<hop> <realname>`
                if args.len() < 7 {
                    self.diagnostics.push("short RPL_WHOREPLY".to_owned());
                    return Composed::Absorbed;
                }
                let mut info = UserInfo {
                    nick: args[5].clone(),
                    ident: args[2].clone(),
                    host: args[3].clone(),
                    mask: Some(args[1].clone()),
                    server: Some(args[4].clone()),
                    status: Some(args[6].clone()),
                    away: Some(args[6].contains('G')),
                    ..UserInfo::default()
                };
                // The trailing is `<hopcount> <realname>`; drop the hop.
                if let Some(last) = args.get(7) {
                    info.realname = match last.split_once(' ') {
                        Some((_hops, realname)) => Some(realname.to_owned()),
                        None => None,
                    };
                }
                let prefix = Prefix::Nickname(
                    info.nick.clone(),
                    info.ident.clone(),
                    info.host.clone(),
                );
                Composed::Done(finish(
                    Command::WhoReply(Box::new(info)),
                    Some(prefix),
                    msg.flags.implicit,
                    &msg,
                ))
            }
            Response::RPL_ENDOFWHO => Composed::Absorbed,

            Response::RPL_WHOISUSER | Response::RPL_WHOWASUSER => {
                // `<me> <nick> <ident> <host> * :<realname>`
                if args.len() < 4 {
                    self.diagnostics.push("short WHOIS/WHOWAS start".to_owned());
                    return Composed::Absorbed;
                }
                let partial = UserPartial {
                    info: UserInfo {
                        nick: args[1].clone(),
                        ident: args[2].clone(),
                        host: args[3].clone(),
                        realname: args.get(5).cloned(),
                        ..UserInfo::default()
                    },
                    implicit: msg.flags.implicit,
                };
                let slot = if code == Response::RPL_WHOISUSER {
                    &mut self.whois
                } else {
                    &mut self.whowas
                };
                if slot.is_some() {
                    self.diagnostics
                        .push("WHOIS/WHOWAS restarted; discarding incomplete record".to_owned());
                }
                *slot = Some(partial);
                Composed::Absorbed
            }
            Response::RPL_WHOISSERVER
            | Response::RPL_WHOISACCOUNT
            | Response::RPL_WHOISHOST
            | Response::RPL_WHOISIDLE
            | Response::RPL_WHOISSECURE
            | Response::RPL_WHOISCHANNELS => {
                let implicit = msg.flags.implicit;
                match self.whois.as_mut().or(self.whowas.as_mut()) {
                    Some(partial) => {
                        partial.implicit |= implicit;
                        fill_whois_slot(&mut partial.info, code, &args);
                    }
                    None => self
                        .diagnostics
                        .push(format!("{:?} without a WHOIS in flight", code)),
                }
                Composed::Absorbed
            }
            Response::RPL_ENDOFWHOIS => match self.whois.take() {
                Some(partial) => {
                    let prefix = user_prefix(&partial.info);
                    Composed::Done(finish(
                        Command::Whois(Box::new(partial.info)),
                        Some(prefix),
                        partial.implicit,
                        &msg,
                    ))
                }
                None => Composed::Absorbed,
            },
            Response::RPL_ENDOFWHOWAS => match self.whowas.take() {
                Some(partial) => {
                    let prefix = user_prefix(&partial.info);
                    Composed::Done(finish(
                        Command::Whowas(Box::new(partial.info)),
                        Some(prefix),
                        partial.implicit,
                        &msg,
                    ))
                }
                None => Composed::Absorbed,
            },

            // Immediate composites: one numeric, one message.
            Response::RPL_TOPIC => {
                let channel = args.get(1).cloned().unwrap_or_default();
                let topic = args.get(2).cloned();
                Composed::Done(finish(
                    Command::TOPIC(channel, topic),
                    msg.prefix.clone(),
                    msg.flags.implicit,
                    &msg,
                ))
            }
            Response::RPL_NOTOPIC => {
                let channel = args.get(1).cloned().unwrap_or_default();
                Composed::Done(finish(
                    Command::TOPIC(channel, None),
                    msg.prefix.clone(),
                    msg.flags.implicit,
                    &msg,
                ))
            }
            Response::RPL_INVITING | Response::RPL_INVITED => {
                if args.len() < 3 {
                    self.diagnostics.push("short invite reply".to_owned());
                    return Composed::Absorbed;
                }
                Composed::Done(finish(
                    Command::INVITE(args[1].clone(), args[2].clone()),
                    msg.prefix.clone(),
                    msg.flags.implicit,
                    &msg,
                ))
            }
            Response::RPL_CHANNELMODEIS => {
                if args.len() < 2 {
                    self.diagnostics.push("short RPL_CHANNELMODEIS".to_owned());
                    return Composed::Absorbed;
                }
                Composed::Done(finish(
                    Command::MODE(args[1].clone(), args[2..].to_vec()),
                    msg.prefix.clone(),
                    msg.flags.implicit,
                    &msg,
                ))
            }
            Response::RPL_AWAY => {
                // `<me> <nick> :<away message>`: attribute to the away user.
                if args.len() < 2 {
                    self.diagnostics.push("short RPL_AWAY".to_owned());
                    return Composed::Absorbed;
                }
                let prefix = Prefix::Nickname(args[1].clone(), String::new(), String::new());
                Composed::Done(finish(
                    Command::AWAY(Some(args.get(2).cloned().unwrap_or_default())),
                    Some(prefix),
                    msg.flags.implicit,
                    &msg,
                ))
            }
            Response::RPL_UNAWAY | Response::RPL_NOWAWAY => {
                let prefix = args
                    .first()
                    .map(|me| Prefix::Nickname(me.clone(), String::new(), String::new()));
                let away = if code == Response::RPL_NOWAWAY {
                    Some(args.get(1).cloned().unwrap_or_default())
                } else {
                    None
                };
                Composed::Done(finish(Command::AWAY(away), prefix, msg.flags.implicit, &msg))
            }

            _ => Composed::Pass(msg),
        }
    }
}

fn user_prefix(info: &UserInfo) -> Prefix {
    Prefix::Nickname(info.nick.clone(), info.ident.clone(), info.host.clone())
}

fn fill_whois_slot(info: &mut UserInfo, code: Response, args: &[String]) {
    match code {
        Response::RPL_WHOISSERVER => {
            info.server = args.get(2).cloned();
            info.server_info = args.get(3).cloned();
        }
        Response::RPL_WHOISACCOUNT => info.account = args.get(2).cloned(),
        Response::RPL_WHOISHOST => {
            let text = args.get(2..).unwrap_or_default().join(" ");
            if !text.is_empty() {
                info.address = Some(text);
            }
        }
        Response::RPL_WHOISIDLE => {
            info.idle_secs = args.get(2).and_then(|s| s.parse().ok());
            info.signon = args.get(3).and_then(|s| s.parse().ok());
        }
        Response::RPL_WHOISSECURE => info.secure = true,
        Response::RPL_WHOISCHANNELS => {
            if let Some(channels) = args.get(2) {
                info.channels = channels
                    .split(' ')
                    .filter(|c| !c.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
        }
        _ => {}
    }
}

// The synthetic message carries the terminator's timestamp and inherits
// `implicit` from any constituent.
fn finish(command: Command, prefix: Option<Prefix>, implicit: bool, end: &Message) -> Message {
    Message {
        tags: None,
        prefix,
        command,
        timestamp: end.timestamp,
        flags: MessageFlags {
            implicit: implicit || end.flags.implicit,
            playback: end.flags.playback,
            oversized: false,
        },
    }
}
