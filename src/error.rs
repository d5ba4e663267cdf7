//! Error taxonomy surfaced by the remote analyzer protocol endpoint.

use std::io;
use thiserror::Error;

/// Every failure mode the core can report, per the error taxonomy in the
/// design notes: configuration, resolution/connect, version/auth
/// negotiation, transport, and malformed-PDU errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Missing or invalid host/port/user/password at construction time.
    /// No session is created when this variant is returned.
    #[error("invalid session configuration: {0}")]
    Config(String),

    /// Hostname resolution failed.
    #[error("cannot resolve host: {0}")]
    Resolve(String),

    /// TCP connect failed (excluding timeout/cancellation, which have
    /// their own variants).
    #[error("cannot connect: {0}")]
    Connect(io::Error),

    /// A per-operation timeout elapsed (read, connect, or auth phase).
    #[error("operation timed out")]
    Timeout,

    /// The cancellation descriptor fired. This is the orderly shutdown
    /// path, not a failure: callers that observe it should stop quietly.
    #[error("operation cancelled")]
    Cancelled,

    /// The peer's protocol major version is older than ours.
    #[error("incompatible server protocol {server_major}.{server_minor}")]
    IncompatibleVersion { server_major: u8, server_minor: u8 },

    /// The peer rejected the supplied credentials.
    #[error("authentication rejected")]
    AuthRejected,

    /// The peer's handshake did not look like a valid analyzer server.
    #[error("invalid server: {0}")]
    InvalidServer(String),

    /// A framing or codec invariant was violated: bad magic, short read,
    /// an undefined tag, or a failed per-variant invariant such as
    /// `hop.min >= hop.max`.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer closed the connection.
    #[error("disconnected")]
    Disconnected,

    /// Catch-all transport I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
