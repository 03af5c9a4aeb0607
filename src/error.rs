//! Error types for the engine.
//!
//! The split follows the propagation policy: transport and registration
//! failures surface as state-change events, codec failures are non-fatal
//! diagnostics, and usage errors are returned synchronously to the caller.

use thiserror::Error;

/// Convenience type alias for Results using [`EngineError`].
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors surfaced to the embedding application.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The underlying byte stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Registration failed fatally; auto-reconnect is stopped.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The caller invoked an operation in the wrong state.
    #[error(transparent)]
    Usage(#[from] UsageError),
}

/// Fatal failures while negotiating with the server.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    /// Every nick retry collided (433).
    #[error("no free nickname after {attempts} attempts")]
    NickExhausted {
        /// Retries performed before giving up.
        attempts: u32,
    },

    /// Server rejected the PASS password (464).
    #[error("server password rejected")]
    BadPassword,

    /// We are banned from this server (465).
    #[error("banned from server: {0}")]
    Banned(String),

    /// SASL was marked required and the exchange failed.
    #[error("SASL authentication failed: {0}")]
    SaslFailed(String),

    /// Server sent ERROR before registration completed.
    #[error("server error: {0}")]
    ServerError(String),
}

/// The caller invoked an operation the current state does not allow.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
    /// Sending requires an open session.
    #[error("connection is not open")]
    NotOpen,

    /// `open` on a session that is already running.
    #[error("connection is already open")]
    AlreadyOpen,
}

/// A line that fails the wire grammar, or a numeric reply missing the
/// parameters its kind requires. Never aborts the stream.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was missing, or neither a verb nor three digits.
    #[error("invalid command")]
    InvalidCommand,

    /// Not enough arguments for the command.
    #[error("not enough arguments: expected {expected}, got {got}")]
    NotEnoughArguments {
        /// Expected number of arguments.
        expected: usize,
        /// Actual number of arguments.
        got: usize,
    },

    /// An argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid message prefix.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Parsing failed at a known position in the line.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}
