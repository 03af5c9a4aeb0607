//! # ircview
//!
//! An observable IRC client protocol engine. ircview turns the raw byte
//! stream of an IRC connection into structured, live-updated conversation
//! state — buffers, channel rosters, topics, modes — and turns application
//! intent back into wire messages.
//!
//! ## Features
//!
//! - IRC message parsing and formatting with IRCv3 tags, prefixes, and CTCP
//! - Multi-line server replies (MOTD, NAMES, WHO, WHOIS, WHOWAS) composed
//!   into single logical messages
//! - Sans-IO connection state machine: registration, CAP 302 negotiation,
//!   SASL (PLAIN/EXTERNAL), PING/PONG liveness, reconnection with jittered
//!   backoff
//! - ISUPPORT-driven behavior: CASEMAPPING, PREFIX, CHANMODES, CHANTYPES
//! - Live channel rosters with per-user mode/prefix state and sortable
//!   views (by name, by rank, by activity)
//! - Optional Tokio transport with TLS and legacy-encoding fallback
//!
//! ## Quick Start
//!
//! ### Parsing and building messages
//!
//! ```rust
//! use ircview::{Command, Message};
//!
//! let raw = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #channel :Hello!";
//! let message: Message = raw.parse().expect("valid IRC message");
//! assert!(matches!(message.command, Command::PRIVMSG(..)));
//!
//! let reply = Message::privmsg("#channel", "Hello yourself");
//! assert_eq!(reply.to_string(), "PRIVMSG #channel :Hello yourself");
//! ```
//!
//! ### Driving a session
//!
//! The engine performs no I/O of its own. Feed it transport events and
//! received lines; execute the [`Action`]s it hands back:
//!
//! ```rust
//! use std::time::Instant;
//! use ircview::{Client, SessionConfig};
//!
//! let mut client = Client::new(SessionConfig {
//!     host: "irc.libera.chat".into(),
//!     port: 6697,
//!     secure: true,
//!     nick: "viewbot".into(),
//!     user: "viewbot".into(),
//!     real_name: "ircview demo".into(),
//!     ..SessionConfig::default()
//! });
//!
//! let now = Instant::now();
//! let step = client.open(now).unwrap();
//! // step.actions: [Connect { .. }] — open the transport, then call
//! // client.transport_connected(now) and client.receive_line(..) per line.
//! # let _ = step;
//! ```

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buffer;
pub mod caps;
pub mod casemap;
pub mod channel;
mod client;
pub mod command;
pub mod composer;
pub mod ctcp;
pub mod error;
pub mod event;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;
pub mod sasl;
pub mod state;
pub mod usermodel;

pub use self::buffer::{Buffer, BufferModel, Query};
pub use self::caps::Capability;
pub use self::casemap::{Casemapping, FoldedName};
pub use self::channel::{Channel, RosterChange, Topic, User};
pub use self::client::Client;
pub use self::command::{CapSubCommand, Command, NameEntry, UserInfo};
pub use self::composer::{Composed, Composer};
pub use self::ctcp::Ctcp;
pub use self::error::{EngineError, MessageParseError, RegistrationError, UsageError};
pub use self::event::Event;
pub use self::isupport::{ChanModes, Isupport, PrefixMap};
pub use self::message::{Message, MessageFlags, Tag};
pub use self::mode::ModeChange;
pub use self::prefix::Prefix;
pub use self::response::Response;
pub use self::sasl::SaslMechanism;
pub use self::state::{
    Action, SaslConfig, SessionConfig, SessionMachine, SessionState, Step,
};
pub use self::usermodel::{SortMethod, SortOrder, UserModel};

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod line;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod transport;

#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
#[cfg(feature = "tokio")]
pub use self::transport::{connect, Transport};
