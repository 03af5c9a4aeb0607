//! Wire formatting, the inverse of parsing.

use std::fmt;

use crate::command::Command;
use crate::message::types::Message;

use super::tags::format_tags;

// Middle params space-separated; the last gets a `:` only when it needs one.
fn stringify(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((trailing, middle)) = args.split_last() {
        for param in middle {
            write!(f, " {}", param)?;
        }
        if trailing.is_empty() || trailing.contains(' ') || trailing.starts_with(':') {
            write!(f, " :{}", trailing)?;
        } else {
            write!(f, " {}", trailing)?;
        }
    }
    Ok(())
}

// Free-text commands always mark the last param as trailing.
fn stringify_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((trailing, middle)) = args.split_last() {
        for param in middle {
            write!(f, " {}", param)?;
        }
        write!(f, " :{}", trailing)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => stringify(f, "PASS", &[p]),
            Command::NICK(n) => stringify(f, "NICK", &[n]),
            Command::USER(u, m, r) => stringify_freeform(f, "USER", &[u, m, "*", r]),
            Command::QUIT(Some(m)) => stringify_freeform(f, "QUIT", &[m]),
            Command::QUIT(None) => stringify(f, "QUIT", &[]),
            Command::JOIN(c, Some(a), Some(r)) => stringify_freeform(f, "JOIN", &[c, a, r]),
            Command::JOIN(c, Some(a), None) => stringify(f, "JOIN", &[c, a]),
            Command::JOIN(c, None, _) => stringify(f, "JOIN", &[c]),
            Command::PART(c, Some(m)) => stringify_freeform(f, "PART", &[c, m]),
            Command::PART(c, None) => stringify(f, "PART", &[c]),
            Command::MODE(t, words) => {
                let mut args: Vec<&str> = vec![t];
                args.extend(words.iter().map(String::as_str));
                stringify(f, "MODE", &args)
            }
            Command::TOPIC(c, Some(t)) => stringify_freeform(f, "TOPIC", &[c, t]),
            Command::TOPIC(c, None) => stringify(f, "TOPIC", &[c]),
            Command::NAMES(Some(c)) => stringify(f, "NAMES", &[c]),
            Command::NAMES(None) => stringify(f, "NAMES", &[]),
            Command::INVITE(n, c) => stringify(f, "INVITE", &[n, c]),
            Command::KICK(c, n, Some(r)) => stringify_freeform(f, "KICK", &[c, n, r]),
            Command::KICK(c, n, None) => stringify(f, "KICK", &[c, n]),
            Command::PRIVMSG(t, m) => stringify_freeform(f, "PRIVMSG", &[t, m]),
            Command::NOTICE(t, m) => stringify_freeform(f, "NOTICE", &[t, m]),
            Command::MOTD(Some(t)) => stringify(f, "MOTD", &[t]),
            Command::MOTD(None) => stringify(f, "MOTD", &[]),
            Command::WHO(Some(m)) => stringify(f, "WHO", &[m]),
            Command::WHO(None) => stringify(f, "WHO", &[]),
            Command::WHOIS(m) => stringify(f, "WHOIS", &[m]),
            Command::WHOWAS(n) => stringify(f, "WHOWAS", &[n]),
            Command::AWAY(Some(m)) => stringify_freeform(f, "AWAY", &[m]),
            Command::AWAY(None) => stringify(f, "AWAY", &[]),
            Command::PING(t, Some(t2)) => stringify(f, "PING", &[t, t2]),
            Command::PING(t, None) => stringify(f, "PING", &[t]),
            Command::PONG(t, Some(t2)) => stringify(f, "PONG", &[t, t2]),
            Command::PONG(t, None) => stringify(f, "PONG", &[t]),
            Command::ERROR(m) => stringify_freeform(f, "ERROR", &[m]),
            Command::CAP(target, sub, param, caps) => {
                let mut args: Vec<&str> = Vec::with_capacity(4);
                if let Some(target) = target {
                    args.push(target);
                }
                args.push(sub.to_str());
                if let Some(param) = param {
                    args.push(param);
                }
                match caps {
                    Some(caps) => {
                        args.push(caps);
                        stringify_freeform(f, "CAP", &args)
                    }
                    None => stringify(f, "CAP", &args),
                }
            }
            Command::AUTHENTICATE(d) => stringify(f, "AUTHENTICATE", &[d]),
            Command::ACCOUNT(a) => stringify(f, "ACCOUNT", &[a]),
            Command::Response(resp, args) => {
                let code = format!("{:03}", resp.code());
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                stringify(f, &code, &args)
            }
            Command::Raw(cmd, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                stringify(f, cmd, &args)
            }

            // Composed replies have no wire form; render a readable stand-in.
            Command::Motd(lines) => stringify_freeform(f, "MOTD", &[&lines.join(" ")]),
            Command::Names { channel, entries } => {
                let list = entries
                    .iter()
                    .map(|e| format!("{}{}", e.prefixes, e.nick))
                    .collect::<Vec<_>>()
                    .join(" ");
                stringify_freeform(f, "NAMES", &[channel, &list])
            }
            Command::WhoReply(info) => stringify(f, "WHO", &[&info.nick]),
            Command::Whois(info) => stringify(f, "WHOIS", &[&info.nick]),
            Command::Whowas(info) => stringify(f, "WHOWAS", &[&info.nick]),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            if !tags.is_empty() {
                f.write_str("@")?;
                let mut buf = String::new();
                format_tags(&mut buf, tags)?;
                f.write_str(&buf)?;
                f.write_str(" ")?;
            }
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)
    }
}
