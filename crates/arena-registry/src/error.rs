//! Error types for the registry layer.

use arena_session::SessionError;
use arena_types::SessionKey;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No live session under this key.
    #[error("session {0} not found")]
    UnknownSession(SessionKey),

    /// The key is taken, or a creation or release for it is in flight.
    #[error("session {0} already exists")]
    SessionAlreadyExists(SessionKey),

    /// The backing resource could not be acquired or is unusable.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The registry's host loop has stopped.
    #[error("session registry is unavailable")]
    Unavailable,

    /// The session refused the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
}
