//! The set of open conversations: channels and queries.
//!
//! Buffers are created lazily, keyed by casemapped name, and kept in
//! insertion order. A name whose first character is in CHANTYPES is a
//! channel; anything else is a private query.

use crate::casemap::{Casemapping, FoldedName};
use crate::channel::Channel;
use crate::isupport::Isupport;

/// A private conversation with one remote nick.
#[derive(Clone, Debug)]
pub struct Query {
    name: String,
    key: FoldedName,
}

impl Query {
    fn new(mapping: Casemapping, name: &str) -> Query {
        Query {
            name: name.to_owned(),
            key: FoldedName::new(mapping, name),
        }
    }

    /// The remote nick, first-seen casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &FoldedName {
        &self.key
    }

    /// Track the remote side across a rename.
    pub(crate) fn rename(&mut self, mapping: Casemapping, name: &str) {
        self.name = name.to_owned();
        self.key = FoldedName::new(mapping, name);
    }
}

/// Any addressable conversation.
#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug)]
pub enum Buffer {
    /// A channel with live roster state.
    Channel(Channel),
    /// A private query.
    Query(Query),
}

impl Buffer {
    pub fn key(&self) -> &FoldedName {
        match self {
            Buffer::Channel(channel) => channel.key(),
            Buffer::Query(query) => query.key(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Buffer::Channel(channel) => channel.name(),
            Buffer::Query(query) => query.name(),
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Buffer::Channel(channel) => Some(channel),
            Buffer::Query(_) => None,
        }
    }

    pub fn as_channel_mut(&mut self) -> Option<&mut Channel> {
        match self {
            Buffer::Channel(channel) => Some(channel),
            Buffer::Query(_) => None,
        }
    }
}

/// The ordered, casemap-keyed buffer collection.
#[derive(Debug, Default)]
pub struct BufferModel {
    buffers: Vec<Buffer>,
}

impl BufferModel {
    pub fn new() -> BufferModel {
        BufferModel::default()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Buffer at an insertion-order index.
    pub fn get(&self, index: usize) -> Option<&Buffer> {
        self.buffers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    pub fn find(&self, key: &FoldedName) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.key() == key)
    }

    pub fn find_mut(&mut self, key: &FoldedName) -> Option<&mut Buffer> {
        self.buffers.iter_mut().find(|b| b.key() == key)
    }

    /// Look up by display name.
    pub fn find_by_name(&self, mapping: Casemapping, name: &str) -> Option<&Buffer> {
        self.find(&FoldedName::new(mapping, name))
    }

    /// Get or create the buffer for a name. Channel detection follows
    /// CHANTYPES. Returns the key and whether a buffer was created.
    pub fn add(&mut self, isupport: &Isupport, name: &str) -> (FoldedName, bool) {
        let mapping = isupport.casemapping();
        let key = FoldedName::new(mapping, name);
        if self.find(&key).is_some() {
            return (key, false);
        }
        let buffer = if isupport.is_channel_name(name) {
            Buffer::Channel(Channel::new(mapping, name))
        } else {
            Buffer::Query(Query::new(mapping, name))
        };
        self.buffers.push(buffer);
        (key, true)
    }

    /// Remove a buffer. Returns it, if present.
    pub fn remove(&mut self, key: &FoldedName) -> Option<Buffer> {
        let i = self.buffers.iter().position(|b| b.key() == key)?;
        Some(self.buffers.remove(i))
    }

    /// Channels only, in insertion order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.buffers.iter().filter_map(Buffer::as_channel)
    }

    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.buffers.iter_mut().filter_map(Buffer::as_channel_mut)
    }

    /// Rename the query for a nick, if one is open. Returns the old and
    /// new keys.
    pub(crate) fn rename_query(
        &mut self,
        mapping: Casemapping,
        old: &str,
        new: &str,
    ) -> Option<(FoldedName, FoldedName)> {
        let old_key = FoldedName::new(mapping, old);
        for buffer in &mut self.buffers {
            if let Buffer::Query(query) = buffer {
                if *query.key() == old_key {
                    query.rename(mapping, new);
                    return Some((old_key, query.key().clone()));
                }
            }
        }
        None
    }

    /// Re-fold all keys after a CASEMAPPING change.
    pub(crate) fn rekey(&mut self, mapping: Casemapping) {
        for buffer in &mut self.buffers {
            match buffer {
                Buffer::Channel(channel) => channel.rekey(mapping),
                Buffer::Query(query) => {
                    let name = query.name().to_owned();
                    query.rename(mapping, &name);
                }
            }
        }
    }
}
