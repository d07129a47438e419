//! Shared error type across castv2 crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, CastError>;

/// Unified error type used by core and the sender engine.
#[derive(Debug, Error)]
pub enum CastError {
    /// Wire-level corruption (bad length prefix, unparsable CastMessage,
    /// missing required field). Fatal to the connection.
    #[error("frame error: {0}")]
    Frame(String),
    /// The envelope parsed but its payload is unusable (text that is not
    /// valid JSON, unsupported payload type). The envelope is dropped and
    /// the connection stays up.
    #[error("payload error: {0}")]
    Payload(String),
    /// A session-scoped request was issued and no session could be resolved.
    #[error("no current session")]
    NoCurrentSession,
    /// A launch or load completed without the expected session appearing in
    /// the response.
    #[error("no session found for {0}")]
    SessionNotFound(String),
    /// A pending request exceeded the configured wait bound.
    #[error("request timed out")]
    Timeout,
    /// The transport is gone; pending and future sends fail.
    #[error("transport disconnected")]
    Disconnected,
    /// Connect, TLS handshake, or socket I/O failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Rejected configuration value.
    #[error("invalid config: {0}")]
    Config(String),
    /// Engine bug surfaced as an error instead of a panic.
    #[error("internal: {0}")]
    Internal(String),
}

impl CastError {
    /// Whether this error ends the connection, as opposed to dropping a
    /// single envelope and carrying on.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            CastError::Frame(_) | CastError::Transport(_) | CastError::Disconnected
        )
    }
}
