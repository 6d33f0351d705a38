//! Error types for the session layer.

use arena_types::{PlayerId, SessionKey};

use crate::SessionState;

/// Errors returned by session and spawn-allocator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The state machine refused the move. Also returned for joins in a
    /// state that does not accept players (`from == to` in that case).
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: SessionState,
        to: SessionState,
    },

    /// Every spawn point is taken.
    #[error("session {0} is full")]
    SessionFull(SessionKey),

    /// The allocator had no free point for this player.
    #[error("no spawn point available for player {0}")]
    NoSpawnAvailable(PlayerId),

    /// The player is already on the roster.
    #[error("player {0} is already registered")]
    AlreadyRegistered(PlayerId),

    /// The player is not on the roster.
    #[error("player {0} is not registered")]
    NotRegistered(PlayerId),

    /// The player is still playing and may not spectate.
    #[error("player {0} cannot spectate while still in the round")]
    NotSpectatable(PlayerId),
}
