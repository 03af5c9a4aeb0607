//! Live channel state: roster, topic, and channel modes.
//!
//! A [`Channel`] owns its [`User`] records; the same nick on two channels
//! is two records, because per-channel mode and prefix differ. All lookups
//! go through the casemapped key.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::casemap::{Casemapping, FoldedName};
use crate::command::{NameEntry, UserInfo};
use crate::isupport::{Isupport, PrefixMap};
use crate::mode::ModeChange;

/// A member of one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Current nick, first-seen casing.
    pub name: String,
    /// Ident, when observed (WHO, userhost-in-names).
    pub ident: String,
    /// Host, when observed.
    pub host: String,
    /// Channel mode letters applied to this user, in server rank order.
    pub mode: String,
    /// Prefix characters aligned with `mode`, same index, same rank.
    pub prefix: String,
    /// Away, as last observed.
    pub away: bool,
    /// Real name, when observed.
    pub realname: String,
    /// Server the user is connected to, when observed.
    pub server: String,
    /// Account name, if logged in.
    pub account: Option<String>,
    /// Most recent time the user spoke, joined, or was renamed.
    pub activity: DateTime<Utc>,
    /// Roster insertion order, used as the activity tie-break.
    pub seq: u64,
}

impl User {
    fn new(name: &str, activity: DateTime<Utc>, seq: u64) -> User {
        User {
            name: name.to_owned(),
            ident: String::new(),
            host: String::new(),
            mode: String::new(),
            prefix: String::new(),
            away: false,
            realname: String::new(),
            server: String::new(),
            account: None,
            activity,
            seq,
        }
    }

    /// Rank under a PREFIX mapping; unranked users sort after every ranked
    /// one.
    pub fn rank(&self, prefix_map: &PrefixMap) -> usize {
        self.mode
            .chars()
            .next()
            .and_then(|m| prefix_map.rank(m))
            .unwrap_or(usize::MAX)
    }
}

/// A channel topic with provenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic {
    /// The topic text.
    pub text: String,
    /// Nick that set it, when known.
    pub set_by: Option<String>,
    /// When it was set, when known.
    pub set_at: Option<DateTime<Utc>>,
}

/// A roster mutation, reported to observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterChange {
    /// A user joined or was first observed.
    Added(FoldedName),
    /// A user parted, quit, or was kicked.
    Removed(FoldedName),
    /// A user changed nick; the record moved keys.
    Renamed {
        /// The key that no longer resolves.
        old: FoldedName,
        /// The key the record now lives under.
        new: FoldedName,
    },
    /// Mode, prefix, activity, or detail fields changed in place.
    Changed(FoldedName),
}

/// Live state of one channel.
#[derive(Clone, Debug)]
pub struct Channel {
    name: String,
    key: FoldedName,
    topic: Option<Topic>,
    modes: BTreeMap<char, Option<String>>,
    lists: BTreeMap<char, BTreeSet<String>>,
    users: Vec<User>,
    index: HashMap<FoldedName, usize>,
    joined: bool,
    created_at: DateTime<Utc>,
    next_seq: u64,
}

impl Channel {
    pub fn new(mapping: Casemapping, name: &str) -> Channel {
        Channel {
            name: name.to_owned(),
            key: FoldedName::new(mapping, name),
            topic: None,
            modes: BTreeMap::new(),
            lists: BTreeMap::new(),
            users: Vec::new(),
            index: HashMap::new(),
            joined: false,
            created_at: Utc::now(),
            next_seq: 0,
        }
    }

    /// Display name, first-seen casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Casemapped key.
    pub fn key(&self) -> &FoldedName {
        &self.key
    }

    /// Whether the local client is currently in the channel.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub(crate) fn set_joined(&mut self, joined: bool) {
        self.joined = joined;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    /// Channel modes with their arguments (B/C/D types).
    pub fn modes(&self) -> &BTreeMap<char, Option<String>> {
        &self.modes
    }

    /// List-mode sets (+b/+e/+I and friends).
    pub fn list(&self, mode: char) -> Option<&BTreeSet<String>> {
        self.lists.get(&mode)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Roster in insertion order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Roster keys in insertion order.
    pub fn keys(&self) -> Vec<FoldedName> {
        let mut keys: Vec<(usize, &FoldedName)> =
            self.index.iter().map(|(k, &i)| (i, k)).collect();
        keys.sort_by_key(|(i, _)| *i);
        keys.into_iter().map(|(_, k)| k.clone()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&User> {
        self.users.get(index)
    }

    pub fn contains(&self, mapping: Casemapping, name: &str) -> bool {
        self.index.contains_key(&FoldedName::new(mapping, name))
    }

    pub fn user(&self, mapping: Casemapping, name: &str) -> Option<&User> {
        self.user_by_key(&FoldedName::new(mapping, name))
    }

    pub fn user_by_key(&self, key: &FoldedName) -> Option<&User> {
        self.index.get(key).map(|&i| &self.users[i])
    }

    fn user_mut(&mut self, key: &FoldedName) -> Option<&mut User> {
        let i = *self.index.get(key)?;
        Some(&mut self.users[i])
    }

    /// Add a user, idempotently. Returns the change, if any.
    pub fn add_user(
        &mut self,
        mapping: Casemapping,
        name: &str,
        at: DateTime<Utc>,
    ) -> Option<RosterChange> {
        let key = FoldedName::new(mapping, name);
        if self.index.contains_key(&key) {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.users.push(User::new(name, at, seq));
        self.index.insert(key.clone(), self.users.len() - 1);
        Some(RosterChange::Added(key))
    }

    /// Remove a user. Returns the change, if the user was present.
    pub fn remove_user(&mut self, mapping: Casemapping, name: &str) -> Option<RosterChange> {
        let key = FoldedName::new(mapping, name);
        let i = self.index.remove(&key)?;
        self.users.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(RosterChange::Removed(key))
    }

    /// Empty the roster and mark the channel unjoined (self PART/KICK).
    pub fn clear(&mut self) -> Vec<RosterChange> {
        let removed = self
            .index
            .drain()
            .map(|(key, _)| RosterChange::Removed(key))
            .collect();
        self.users.clear();
        self.joined = false;
        removed
    }

    /// Rename a user, preserving mode, prefix, and insertion order, and
    /// bumping activity. When the new key is already occupied the two
    /// records merge: the occupant keeps its channel mode and prefix, the
    /// newer record wins the display fields.
    pub fn rename_user(
        &mut self,
        mapping: Casemapping,
        old: &str,
        new: &str,
        at: DateTime<Utc>,
    ) -> Vec<RosterChange> {
        let old_key = FoldedName::new(mapping, old);
        let new_key = FoldedName::new(mapping, new);
        let Some(&old_i) = self.index.get(&old_key) else {
            return Vec::new();
        };

        if old_key == new_key {
            // Casing-only rename.
            let user = &mut self.users[old_i];
            user.name = new.to_owned();
            user.activity = at;
            return vec![RosterChange::Changed(new_key)];
        }

        if self.index.contains_key(&new_key) {
            let moved = self.users[old_i].clone();
            let _ = self.remove_user(mapping, old);
            if let Some(occupant) = self.user_mut(&new_key) {
                occupant.name = new.to_owned();
                occupant.ident = moved.ident;
                occupant.host = moved.host;
                occupant.realname = moved.realname;
                occupant.server = moved.server;
                occupant.account = moved.account;
                occupant.activity = at;
            }
            return vec![
                RosterChange::Removed(old_key),
                RosterChange::Changed(new_key),
            ];
        }

        self.index.remove(&old_key);
        self.index.insert(new_key.clone(), old_i);
        let user = &mut self.users[old_i];
        user.name = new.to_owned();
        user.activity = at;
        vec![RosterChange::Renamed {
            old: old_key,
            new: new_key,
        }]
    }

    /// Seed (or refresh) the roster from a composed NAMES reply.
    pub fn apply_names(
        &mut self,
        isupport: &Isupport,
        entries: &[NameEntry],
        at: DateTime<Utc>,
    ) -> Vec<RosterChange> {
        let mapping = isupport.casemapping();
        let mut changes = Vec::new();
        for entry in entries {
            if let Some(change) = self.add_user(mapping, &entry.nick, at) {
                changes.push(change);
            }
            let key = FoldedName::new(mapping, &entry.nick);
            let mode: String = entry
                .prefixes
                .chars()
                .filter_map(|p| isupport.prefix().mode_for(p))
                .collect();
            let prefix_map = isupport.prefix().clone();
            if let Some(user) = self.user_mut(&key) {
                user.mode.clear();
                user.prefix.clear();
                for m in mode.chars() {
                    grant(user, &prefix_map, m);
                }
            }
        }
        changes
    }

    /// Apply parsed MODE changes. Prefix modes mutate user records; list
    /// modes mutate the list sets; the rest mutate channel mode state.
    pub fn apply_modes(
        &mut self,
        isupport: &Isupport,
        changes: &[ModeChange],
    ) -> Vec<RosterChange> {
        let mapping = isupport.casemapping();
        let chanmodes = isupport.chanmodes().clone();
        let prefix_map = isupport.prefix().clone();
        let mut roster_changes = Vec::new();

        for change in changes {
            if prefix_map.is_mode(change.mode) {
                let Some(nick) = &change.arg else {
                    tracing::debug!(mode = %change.mode, "prefix mode without a nick");
                    continue;
                };
                let key = FoldedName::new(mapping, nick);
                let Some(user) = self.user_mut(&key) else {
                    tracing::debug!(%nick, "MODE for unknown user");
                    continue;
                };
                if change.add {
                    grant(user, &prefix_map, change.mode);
                } else {
                    revoke(user, &prefix_map, change.mode);
                }
                roster_changes.push(RosterChange::Changed(key));
            } else if chanmodes.a.contains(change.mode) {
                // A bare list mode is a query, not a change.
                let Some(mask) = &change.arg else { continue };
                let set = self.lists.entry(change.mode).or_default();
                if change.add {
                    set.insert(mask.clone());
                } else {
                    set.remove(mask);
                }
            } else if change.add {
                self.modes.insert(change.mode, change.arg.clone());
            } else {
                self.modes.remove(&change.mode);
            }
        }
        roster_changes
    }

    /// Update the topic from a TOPIC message or composed 332/331.
    pub fn set_topic(
        &mut self,
        text: Option<&str>,
        set_by: Option<&str>,
        at: Option<DateTime<Utc>>,
    ) {
        self.topic = text.map(|text| Topic {
            text: text.to_owned(),
            set_by: set_by.map(str::to_owned),
            set_at: at,
        });
    }

    /// Bump a user's activity clock (message, CTCP ACTION).
    pub fn bump_activity(
        &mut self,
        mapping: Casemapping,
        name: &str,
        at: DateTime<Utc>,
    ) -> Option<RosterChange> {
        let key = FoldedName::new(mapping, name);
        let user = self.user_mut(&key)?;
        user.activity = at;
        Some(RosterChange::Changed(key))
    }

    /// Fill user details from a WHO record.
    pub fn apply_who(&mut self, mapping: Casemapping, info: &UserInfo) -> Option<RosterChange> {
        let key = FoldedName::new(mapping, &info.nick);
        let user = self.user_mut(&key)?;
        user.ident = info.ident.clone();
        user.host = info.host.clone();
        if let Some(server) = &info.server {
            user.server = server.clone();
        }
        if let Some(realname) = &info.realname {
            user.realname = realname.clone();
        }
        if let Some(away) = info.away {
            user.away = away;
        }
        Some(RosterChange::Changed(key))
    }

    /// Set a user's away flag (away-notify, RPL_AWAY).
    pub fn set_away(
        &mut self,
        mapping: Casemapping,
        name: &str,
        away: bool,
    ) -> Option<RosterChange> {
        let key = FoldedName::new(mapping, name);
        let user = self.user_mut(&key)?;
        if user.away == away {
            return None;
        }
        user.away = away;
        Some(RosterChange::Changed(key))
    }

    /// Set a user's account (account-notify, extended-join). `*` means
    /// logged out.
    pub fn set_account(
        &mut self,
        mapping: Casemapping,
        name: &str,
        account: Option<&str>,
    ) -> Option<RosterChange> {
        let key = FoldedName::new(mapping, name);
        let user = self.user_mut(&key)?;
        user.account = account.filter(|a| *a != "*").map(str::to_owned);
        Some(RosterChange::Changed(key))
    }

    /// Re-fold every roster key after a CASEMAPPING change.
    pub(crate) fn rekey(&mut self, mapping: Casemapping) {
        self.key = FoldedName::new(mapping, &self.name);
        self.index = self
            .users
            .iter()
            .enumerate()
            .map(|(i, u)| (FoldedName::new(mapping, &u.name), i))
            .collect();
    }
}

// Insert a prefix mode in server rank order and rebuild the prefix string
// to match, keeping len(mode) == len(prefix).
fn grant(user: &mut User, prefix_map: &PrefixMap, mode: char) {
    if user.mode.contains(mode) || !prefix_map.is_mode(mode) {
        return;
    }
    let mut modes: Vec<char> = user.mode.chars().collect();
    modes.push(mode);
    user.mode = prefix_map
        .modes()
        .chars()
        .filter(|m| modes.contains(m))
        .collect();
    user.prefix = user
        .mode
        .chars()
        .filter_map(|m| prefix_map.prefix_for(m))
        .collect();
}

fn revoke(user: &mut User, prefix_map: &PrefixMap, mode: char) {
    user.mode = user.mode.chars().filter(|m| *m != mode).collect();
    user.prefix = user
        .mode
        .chars()
        .filter_map(|m| prefix_map.prefix_for(m))
        .collect();
}
