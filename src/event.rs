//! Events the engine reports to its embedder.
//!
//! Emission is synchronous: every entry point returns the events its
//! processing produced, in order. Observers that need asynchrony marshal
//! themselves.

use std::time::Duration;

use crate::casemap::FoldedName;
use crate::channel::RosterChange;
use crate::error::{MessageParseError, RegistrationError};
use crate::message::Message;
use crate::state::SessionState;

/// One observable engine event.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// Registration completed (001 received).
    Connected,
    /// The transport closed or failed.
    Disconnected {
        /// Human-readable cause, when known.
        reason: Option<String>,
    },
    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        /// Time until the attempt.
        delay: Duration,
        /// 1-based attempt counter since the last good connection.
        attempt: u32,
    },
    /// Registration failed fatally; auto-reconnect stopped.
    RegistrationFailed(RegistrationError),
    /// Our own nick changed (server-confirmed).
    NickChanged {
        /// The previous nick.
        old: String,
        /// The nick now in effect.
        new: String,
    },
    /// A buffer was created.
    BufferAdded(FoldedName),
    /// A buffer was removed.
    BufferRemoved(FoldedName),
    /// A channel roster changed.
    Roster {
        /// The channel whose roster changed.
        channel: FoldedName,
        /// What happened.
        change: RosterChange,
    },
    /// A channel topic changed.
    TopicChanged {
        /// The channel whose topic changed.
        channel: FoldedName,
    },
    /// A message to deliver, composed where applicable, routed to a buffer
    /// when one is responsible for it.
    MessageReceived {
        /// The buffer this message belongs to, if any.
        buffer: Option<FoldedName>,
        /// The message itself.
        message: Box<Message>,
    },
    /// A line failed the wire grammar; the stream continues.
    Malformed {
        /// The offending line.
        line: String,
        /// Why it failed.
        error: MessageParseError,
    },
    /// A non-fatal protocol oddity, applied best-effort.
    Diagnostic(String),
}
