//! An ordered view over one channel's roster.
//!
//! The model owns only an ordering of casemapped keys; the user records
//! stay in the channel (the roster is the arena, the view resolves through
//! it). Feed it every [`RosterChange`] the channel reports: with dynamic
//! sort enabled each change repositions the affected user, otherwise order
//! is only rebuilt on an explicit [`UserModel::sort`].

use std::cmp::Ordering;

use crate::casemap::{Casemapping, FoldedName};
use crate::channel::{Channel, RosterChange, User};
use crate::isupport::Isupport;

/// How the view orders users.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMethod {
    /// Roster insertion order.
    #[default]
    Unsorted,
    /// Case-insensitive by nick.
    ByName,
    /// By PREFIX rank (most privileged first), then by nick. Users with no
    /// rank sort after every ranked user.
    ByTitle,
    /// Most recent activity first, insertion order as the tie-break.
    ByActivity,
}

/// Sort direction, independent of the method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A sortable view of a channel roster.
#[derive(Clone, Debug)]
pub struct UserModel {
    method: SortMethod,
    order: SortOrder,
    dynamic: bool,
    keys: Vec<FoldedName>,
}

impl UserModel {
    /// Create a view seeded with the channel's insertion order.
    pub fn new(channel: &Channel) -> UserModel {
        UserModel {
            method: SortMethod::default(),
            order: SortOrder::default(),
            dynamic: false,
            keys: channel.keys(),
        }
    }

    pub fn method(&self) -> SortMethod {
        self.method
    }

    pub fn set_method(&mut self, method: SortMethod) {
        self.method = method;
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn set_order(&mut self, order: SortOrder) {
        self.order = order;
    }

    pub fn dynamic_sort(&self) -> bool {
        self.dynamic
    }

    pub fn set_dynamic_sort(&mut self, dynamic: bool) {
        self.dynamic = dynamic;
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Resolve the user at a view index.
    pub fn get<'a>(&self, channel: &'a Channel, index: usize) -> Option<&'a User> {
        channel.user_by_key(self.keys.get(index)?)
    }

    /// Nicks in view order.
    pub fn names<'a>(&self, channel: &'a Channel) -> Vec<&'a str> {
        self.keys
            .iter()
            .filter_map(|k| channel.user_by_key(k))
            .map(|u| u.name.as_str())
            .collect()
    }

    pub fn contains(&self, mapping: Casemapping, name: &str) -> bool {
        self.keys.contains(&FoldedName::new(mapping, name))
    }

    /// Casemapped lookup through to the roster.
    pub fn user<'a>(
        &self,
        channel: &'a Channel,
        mapping: Casemapping,
        name: &str,
    ) -> Option<&'a User> {
        let key = FoldedName::new(mapping, name);
        if !self.keys.contains(&key) {
            return None;
        }
        channel.user_by_key(&key)
    }

    /// View position of a user.
    pub fn index_of(&self, mapping: Casemapping, name: &str) -> Option<usize> {
        let key = FoldedName::new(mapping, name);
        self.keys.iter().position(|k| *k == key)
    }

    /// Rebuild the whole ordering (stable).
    pub fn sort(&mut self, channel: &Channel, isupport: &Isupport) {
        let mut keys = std::mem::take(&mut self.keys);
        keys.sort_by(|a, b| self.compare_keys(channel, isupport, a, b));
        self.keys = keys;
    }

    /// Apply one roster change. Membership is always kept in sync; order
    /// is preserved dynamically only when dynamic sort is on.
    pub fn apply(&mut self, channel: &Channel, isupport: &Isupport, change: &RosterChange) {
        match change {
            RosterChange::Added(key) => {
                if !self.keys.contains(key) {
                    self.insert(channel, isupport, key.clone());
                }
            }
            RosterChange::Removed(key) => {
                self.keys.retain(|k| k != key);
            }
            RosterChange::Renamed { old, new } => {
                match self.keys.iter().position(|k| k == old) {
                    Some(i) => self.keys[i] = new.clone(),
                    None => self.keys.push(new.clone()),
                }
                if self.dynamic {
                    self.reposition(channel, isupport, new);
                }
            }
            RosterChange::Changed(key) => {
                if self.dynamic {
                    self.reposition(channel, isupport, key);
                }
            }
        }
    }

    fn insert(&mut self, channel: &Channel, isupport: &Isupport, key: FoldedName) {
        if !self.dynamic || self.method == SortMethod::Unsorted {
            self.keys.push(key);
            return;
        }
        let at = self
            .keys
            .iter()
            .position(|k| self.compare_keys(channel, isupport, &key, k) == Ordering::Less)
            .unwrap_or(self.keys.len());
        self.keys.insert(at, key);
    }

    fn reposition(&mut self, channel: &Channel, isupport: &Isupport, key: &FoldedName) {
        if self.method == SortMethod::Unsorted {
            return;
        }
        let Some(i) = self.keys.iter().position(|k| k == key) else {
            return;
        };
        let key = self.keys.remove(i);
        self.insert(channel, isupport, key);
    }

    fn compare_keys(
        &self,
        channel: &Channel,
        isupport: &Isupport,
        a: &FoldedName,
        b: &FoldedName,
    ) -> Ordering {
        let ordering = match (channel.user_by_key(a), channel.user_by_key(b)) {
            (Some(a), Some(b)) => compare(a, b, self.method, isupport),
            // Keys the roster no longer resolves sink to the end.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

fn compare(a: &User, b: &User, method: SortMethod, isupport: &Isupport) -> Ordering {
    let mapping = isupport.casemapping();
    match method {
        SortMethod::Unsorted => a.seq.cmp(&b.seq),
        SortMethod::ByName => mapping.fold(&a.name).cmp(&mapping.fold(&b.name)),
        SortMethod::ByTitle => a
            .rank(isupport.prefix())
            .cmp(&b.rank(isupport.prefix()))
            .then_with(|| mapping.fold(&a.name).cmp(&mapping.fold(&b.name))),
        SortMethod::ByActivity => b
            .activity
            .cmp(&a.activity)
            .then_with(|| a.seq.cmp(&b.seq)),
    }
}
