//! Sans-IO connection state machine.
//!
//! The machine performs no I/O and sets no timers. It consumes explicit
//! inputs (`open`, `transport_connected`, `transport_closed`, messages,
//! `tick`) and produces [`Action`]s for the host to execute plus
//! [`Event`](crate::event::Event)s for observers. Timers are deadlines the
//! host reads from [`SessionMachine::next_deadline`] and fires by calling
//! `tick`.

mod machine;

pub use machine::SessionMachine;

use std::time::Duration;

use crate::event::Event;
use crate::message::Message;
use crate::sasl::SaslMechanism;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Configured but not running.
    #[default]
    Inactive,
    /// Transport connect in progress.
    Connecting,
    /// Transport up; registering and negotiating capabilities.
    Negotiating,
    /// 001 received; fully connected.
    Registered,
    /// QUIT sent; waiting for the flush or the transport to drop.
    Closing,
    /// Connection lost; a reconnect is scheduled.
    Backoff,
}

/// SASL credentials, when authentication is wanted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SaslConfig {
    /// No SASL.
    #[default]
    None,
    /// PLAIN: account name and password.
    Plain {
        /// Account name.
        account: String,
        /// Password.
        password: String,
    },
    /// EXTERNAL: TLS client certificate, optional authzid.
    External {
        /// Authorization identity, when different from the certificate.
        authzid: Option<String>,
    },
}

impl SaslConfig {
    /// The mechanism this configuration speaks, if any.
    pub fn mechanism(&self) -> Option<SaslMechanism> {
        match self {
            SaslConfig::None => None,
            SaslConfig::Plain { .. } => Some(SaslMechanism::Plain),
            SaslConfig::External { .. } => Some(SaslMechanism::External),
        }
    }
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Server address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Wrap the transport in TLS.
    pub secure: bool,
    /// Desired nickname.
    pub nick: String,
    /// Username (ident).
    pub user: String,
    /// Real name / GECOS.
    pub real_name: String,
    /// Server password, sent via PASS before NICK.
    pub password: Option<String>,
    /// SASL credentials.
    pub sasl: SaslConfig,
    /// Treat SASL failure as a registration failure.
    pub sasl_required: bool,
    /// Initial reconnect backoff.
    pub reconnect_delay: Duration,
    /// Reconnect backoff cap.
    pub reconnect_max: Duration,
    /// Give up after this many consecutive reconnect attempts.
    pub reconnect_limit: Option<u32>,
    /// Idle time before the engine sends its own PING.
    pub ping_interval: Duration,
    /// Time to wait for any traffic after our PING before failing.
    pub ping_timeout: Duration,
    /// Bound on the QUIT flush before the transport is closed anyway.
    pub quit_flush: Duration,
    /// Fallback text encoding for non-UTF-8 input (transport layer).
    pub encoding: String,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            host: String::new(),
            port: 6667,
            secure: false,
            nick: String::new(),
            user: String::new(),
            real_name: String::new(),
            password: None,
            sasl: SaslConfig::None,
            sasl_required: false,
            reconnect_delay: Duration::from_millis(1000),
            reconnect_max: Duration::from_millis(300_000),
            reconnect_limit: None,
            ping_interval: Duration::from_millis(60_000),
            ping_timeout: Duration::from_millis(60_000),
            quit_flush: Duration::from_millis(2000),
            encoding: "utf-8".to_owned(),
        }
    }
}

/// What the host must do on the machine's behalf.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Open the transport.
    Connect {
        /// Server address.
        host: String,
        /// Server port.
        port: u16,
        /// Wrap in TLS.
        secure: bool,
    },
    /// Write one message to the transport.
    ///
    /// Boxed to keep the enum small.
    Send(Box<Message>),
    /// Close the transport.
    Close,
}

/// The output of one machine input: actions to execute, events to deliver.
#[derive(Debug, Default, PartialEq)]
pub struct Step {
    /// Host actions, in order.
    pub actions: Vec<Action>,
    /// Observer events, in order.
    pub events: Vec<Event>,
}

impl Step {
    pub(crate) fn merge(&mut self, other: Step) {
        self.actions.extend(other.actions);
        self.events.extend(other.events);
    }
}
