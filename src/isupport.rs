//! Server capability registry, populated from `005` (RPL_ISUPPORT).
//!
//! Holds an owned snapshot with the RFC defaults in place until the server
//! says otherwise. Unknown tokens are retained verbatim so embedders can
//! query dialect quirks the engine itself does not interpret.

use crate::casemap::Casemapping;

/// The ISUPPORT `PREFIX` pairing: user-mode letters and their visible
/// prefix characters, most privileged first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixMap {
    modes: String,
    prefixes: String,
}

impl Default for PrefixMap {
    fn default() -> PrefixMap {
        PrefixMap {
            modes: "ov".to_owned(),
            prefixes: "@+".to_owned(),
        }
    }
}

impl PrefixMap {
    /// Parse a `(modes)prefixes` value. The two halves must be the same
    /// length; an empty value is a server that grants no prefixes at all.
    pub fn parse(s: &str) -> Option<PrefixMap> {
        if s.is_empty() {
            return Some(PrefixMap {
                modes: String::new(),
                prefixes: String::new(),
            });
        }
        let inner = s.strip_prefix('(')?;
        let close = inner.find(')')?;
        let modes = &inner[..close];
        let prefixes = &inner[close + 1..];
        if modes.chars().count() != prefixes.chars().count() {
            return None;
        }
        Some(PrefixMap {
            modes: modes.to_owned(),
            prefixes: prefixes.to_owned(),
        })
    }

    /// Mode letters in rank order.
    pub fn modes(&self) -> &str {
        &self.modes
    }

    /// Prefix characters in rank order.
    pub fn prefixes(&self) -> &str {
        &self.prefixes
    }

    /// Rank of a mode letter; 0 is the most privileged.
    pub fn rank(&self, mode: char) -> Option<usize> {
        self.modes.chars().position(|m| m == mode)
    }

    /// The prefix character shown for a mode letter.
    pub fn prefix_for(&self, mode: char) -> Option<char> {
        let rank = self.rank(mode)?;
        self.prefixes.chars().nth(rank)
    }

    /// The mode letter behind a prefix character.
    pub fn mode_for(&self, prefix: char) -> Option<char> {
        let rank = self.prefixes.chars().position(|p| p == prefix)?;
        self.modes.chars().nth(rank)
    }

    /// Whether a mode letter is a user prefix mode.
    pub fn is_mode(&self, mode: char) -> bool {
        self.modes.contains(mode)
    }

    /// Split the leading prefix characters off a NAMES word.
    pub fn split_name<'a>(&self, word: &'a str) -> (&'a str, &'a str) {
        let end = word
            .char_indices()
            .find(|(_, c)| !self.prefixes.contains(*c))
            .map_or(word.len(), |(i, _)| i);
        word.split_at(end)
    }
}

/// The CHANMODES four-list grouping of channel mode letters.
///
/// A: list modes, B: setting with parameter, C: parameter when set only,
/// D: flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    /// List modes (always take a parameter).
    pub a: String,
    /// Settings that always take a parameter.
    pub b: String,
    /// Settings that take a parameter only when set.
    pub c: String,
    /// Parameterless flags.
    pub d: String,
}

impl Default for ChanModes {
    fn default() -> ChanModes {
        ChanModes {
            a: "b".to_owned(),
            b: "k".to_owned(),
            c: "l".to_owned(),
            d: "imnpstr".to_owned(),
        }
    }
}

impl ChanModes {
    /// Parse an `A,B,C,D` value.
    pub fn parse(s: &str) -> Option<ChanModes> {
        let mut parts = s.splitn(4, ',');
        let (a, b, c, d) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        Some(ChanModes {
            a: a.to_owned(),
            b: b.to_owned(),
            c: c.to_owned(),
            d: d.to_owned(),
        })
    }
}

/// The server dialect, as accumulated from `005` tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Isupport {
    casemapping: Casemapping,
    chantypes: String,
    prefix: PrefixMap,
    chanmodes: ChanModes,
    nicklen: usize,
    channellen: usize,
    topiclen: usize,
    modes: usize,
    network: Option<String>,
    statusmsg: Option<String>,
    monitor: Option<usize>,
    chanlimit: Option<String>,
    excepts: Option<char>,
    invex: Option<char>,
    whox: bool,
    other: Vec<(String, Option<String>)>,
}

impl Default for Isupport {
    fn default() -> Isupport {
        Isupport {
            casemapping: Casemapping::default(),
            chantypes: "#&".to_owned(),
            prefix: PrefixMap::default(),
            chanmodes: ChanModes::default(),
            nicklen: 9,
            channellen: 200,
            topiclen: 390,
            modes: 3,
            network: None,
            statusmsg: None,
            monitor: None,
            chanlimit: None,
            excepts: None,
            invex: None,
            whox: false,
            other: Vec::new(),
        }
    }
}

impl Isupport {
    /// Apply the tokens of one `005` reply.
    ///
    /// `args` are the numeric's params: our nick first, then tokens, then
    /// the human-readable trailing, which is dropped when present. Returns
    /// true when CASEMAPPING changed, so callers can re-fold their keys.
    pub fn apply(&mut self, args: &[String]) -> bool {
        let mut tokens: &[String] = match args {
            [] => return false,
            [_nick, rest @ ..] => rest,
        };
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }

        let before = self.casemapping;
        for token in tokens {
            let (token, removed) = match token.strip_prefix('-') {
                Some(stripped) => (stripped, true),
                None => (token.as_str(), false),
            };
            let (key, value) = match token.find('=') {
                Some(eq) => (&token[..eq], Some(&token[eq + 1..])),
                None => (token, None),
            };
            if !key.is_empty() {
                self.apply_token(key, value, removed);
            }
        }
        self.casemapping != before
    }

    fn apply_token(&mut self, key: &str, value: Option<&str>, removed: bool) {
        let key = key.to_ascii_uppercase();
        match key.as_str() {
            "CASEMAPPING" => {
                if removed {
                    self.casemapping = Casemapping::default();
                } else if let Some(mapping) = value.and_then(Casemapping::parse) {
                    self.casemapping = mapping;
                }
            }
            "CHANTYPES" => {
                self.chantypes = if removed {
                    "#&".to_owned()
                } else {
                    value.unwrap_or("").to_owned()
                };
            }
            "PREFIX" => {
                if removed {
                    self.prefix = PrefixMap::default();
                } else if let Some(map) = value.and_then(PrefixMap::parse) {
                    self.prefix = map;
                }
            }
            "CHANMODES" => {
                if removed {
                    self.chanmodes = ChanModes::default();
                } else if let Some(modes) = value.and_then(ChanModes::parse) {
                    self.chanmodes = modes;
                }
            }
            "NICKLEN" => self.nicklen = parse_or(value, removed, 9),
            "CHANNELLEN" => self.channellen = parse_or(value, removed, 200),
            "TOPICLEN" => self.topiclen = parse_or(value, removed, 390),
            "MODES" => self.modes = parse_or(value, removed, 3),
            "NETWORK" => self.network = keep(value, removed),
            "STATUSMSG" => self.statusmsg = keep(value, removed),
            "MONITOR" => {
                self.monitor = if removed {
                    None
                } else {
                    // Valueless MONITOR means supported without a limit.
                    Some(value.and_then(|v| v.parse().ok()).unwrap_or(0))
                };
            }
            "CHANLIMIT" => self.chanlimit = keep(value, removed),
            "EXCEPTS" => {
                self.excepts = if removed {
                    None
                } else {
                    Some(value.and_then(|v| v.chars().next()).unwrap_or('e'))
                };
            }
            "INVEX" => {
                self.invex = if removed {
                    None
                } else {
                    Some(value.and_then(|v| v.chars().next()).unwrap_or('I'))
                };
            }
            "WHOX" => self.whox = !removed,
            _ => {
                self.other.retain(|(k, _)| k != &key);
                if !removed {
                    self.other.push((key, value.map(str::to_owned)));
                }
            }
        }
    }

    pub fn casemapping(&self) -> Casemapping {
        self.casemapping
    }

    pub fn chantypes(&self) -> &str {
        &self.chantypes
    }

    pub fn prefix(&self) -> &PrefixMap {
        &self.prefix
    }

    pub fn chanmodes(&self) -> &ChanModes {
        &self.chanmodes
    }

    pub fn nicklen(&self) -> usize {
        self.nicklen
    }

    pub fn channellen(&self) -> usize {
        self.channellen
    }

    pub fn topiclen(&self) -> usize {
        self.topiclen
    }

    /// Maximum mode changes per MODE command.
    pub fn modes(&self) -> usize {
        self.modes
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn statusmsg(&self) -> Option<&str> {
        self.statusmsg.as_deref()
    }

    pub fn monitor(&self) -> Option<usize> {
        self.monitor
    }

    pub fn chanlimit(&self) -> Option<&str> {
        self.chanlimit.as_deref()
    }

    pub fn excepts(&self) -> Option<char> {
        self.excepts
    }

    pub fn invex(&self) -> Option<char> {
        self.invex
    }

    pub fn whox(&self) -> bool {
        self.whox
    }

    /// Look up a token the engine does not interpret.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.other
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_deref())
    }

    /// Channel detection: first character in CHANTYPES.
    pub fn is_channel_name(&self, name: &str) -> bool {
        name.chars()
            .next()
            .is_some_and(|c| self.chantypes.contains(c))
    }

    /// Strip a leading STATUSMSG sigil (`@#chan` -> `#chan`) so targeted
    /// messages resolve to the channel buffer.
    pub fn strip_statusmsg<'a>(&self, target: &'a str) -> &'a str {
        match (&self.statusmsg, target.chars().next()) {
            (Some(sigils), Some(c)) if sigils.contains(c) => &target[c.len_utf8()..],
            _ => target,
        }
    }
}

fn parse_or(value: Option<&str>, removed: bool, default: usize) -> usize {
    if removed {
        return default;
    }
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn keep(value: Option<&str>, removed: bool) -> Option<String> {
    if removed {
        None
    } else {
        value.map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        let mut v = vec!["me".to_owned()];
        v.extend(tokens.iter().map(|s| (*s).to_owned()));
        v.push("are supported by this server".to_owned());
        v
    }

    #[test]
    fn test_defaults() {
        let isupport = Isupport::default();
        assert_eq!(isupport.casemapping(), Casemapping::Rfc1459);
        assert_eq!(isupport.chantypes(), "#&");
        assert_eq!(isupport.prefix().modes(), "ov");
        assert_eq!(isupport.prefix().prefixes(), "@+");
        assert_eq!(isupport.chanmodes().d, "imnpstr");
        assert_eq!(isupport.nicklen(), 9);
        assert_eq!(isupport.topiclen(), 390);
    }

    #[test]
    fn test_apply_freenode_style() {
        let mut isupport = Isupport::default();
        isupport.apply(&args(&[
            "CHANTYPES=#",
            "EXCEPTS",
            "INVEX",
            "CHANMODES=eIbq,k,flj,CFLMPQScgimnprstz",
            "PREFIX=(ov)@+",
            "NETWORK=freenode",
            "STATUSMSG=@+",
            "NICKLEN=16",
        ]));
        assert_eq!(isupport.chantypes(), "#");
        assert_eq!(isupport.excepts(), Some('e'));
        assert_eq!(isupport.invex(), Some('I'));
        assert_eq!(isupport.chanmodes().a, "eIbq");
        assert_eq!(isupport.network(), Some("freenode"));
        assert_eq!(isupport.nicklen(), 16);
    }

    #[test]
    fn test_casemapping_change_reported() {
        let mut isupport = Isupport::default();
        assert!(isupport.apply(&args(&["CASEMAPPING=ascii"])));
        assert_eq!(isupport.casemapping(), Casemapping::Ascii);
        assert!(!isupport.apply(&args(&["CASEMAPPING=ascii"])));
    }

    #[test]
    fn test_unknown_token_retained() {
        let mut isupport = Isupport::default();
        isupport.apply(&args(&["EXTBAN=$,arxz", "SAFELIST"]));
        assert_eq!(isupport.get("extban"), Some(Some("$,arxz")));
        assert_eq!(isupport.get("SAFELIST"), Some(None));
        assert_eq!(isupport.get("ELIST"), None);
    }

    #[test]
    fn test_token_removal() {
        let mut isupport = Isupport::default();
        isupport.apply(&args(&["NICKLEN=30", "SAFELIST"]));
        isupport.apply(&args(&["-NICKLEN", "-SAFELIST"]));
        assert_eq!(isupport.nicklen(), 9);
        assert_eq!(isupport.get("SAFELIST"), None);
    }

    #[test]
    fn test_prefix_map() {
        let map = PrefixMap::parse("(qaohv)~&@%+").unwrap();
        assert_eq!(map.rank('q'), Some(0));
        assert_eq!(map.rank('v'), Some(4));
        assert_eq!(map.prefix_for('o'), Some('@'));
        assert_eq!(map.mode_for('%'), Some('h'));
        assert!(map.is_mode('a'));
        assert!(!map.is_mode('b'));
        assert_eq!(map.split_name("~&nick"), ("~&", "nick"));
        assert_eq!(map.split_name("plain"), ("", "plain"));
    }

    #[test]
    fn test_prefix_map_rejects_mismatch() {
        assert!(PrefixMap::parse("(ov)@").is_none());
        assert!(PrefixMap::parse("ov)@+").is_none());
    }

    #[test]
    fn test_channel_detection() {
        let isupport = Isupport::default();
        assert!(isupport.is_channel_name("#rust"));
        assert!(isupport.is_channel_name("&local"));
        assert!(!isupport.is_channel_name("nick"));
        assert!(!isupport.is_channel_name(""));
    }

    #[test]
    fn test_strip_statusmsg() {
        let mut isupport = Isupport::default();
        isupport.apply(&args(&["STATUSMSG=@+"]));
        assert_eq!(isupport.strip_statusmsg("@#ops"), "#ops");
        assert_eq!(isupport.strip_statusmsg("#ops"), "#ops");
        assert_eq!(isupport.strip_statusmsg("nick"), "nick");
    }
}
