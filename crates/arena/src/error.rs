//! Unified error type for Arena.

use arena_registry::RegistryError;
use arena_session::SessionError;

/// Top-level error wrapping the errors of every Arena crate.
///
/// With `?` a function returning `ArenaError` can call into both the
/// session and the registry layer without mapping errors by hand.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// A session refused a state change or player operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The registry refused a request or its host loop is gone.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use arena_session::SessionState;
    use arena_types::SessionKey;

    use super::*;

    #[test]
    fn test_from_session_error() {
        let err = SessionError::InvalidStateTransition {
            from: SessionState::Running,
            to: SessionState::Idle,
        };
        let arena_err: ArenaError = err.into();
        assert!(matches!(arena_err, ArenaError::Session(_)));
        assert!(arena_err.to_string().contains("Running"));
    }

    #[test]
    fn test_from_registry_error() {
        let err = RegistryError::UnknownSession(SessionKey::new("royale:gone"));
        let arena_err: ArenaError = err.into();
        assert!(matches!(arena_err, ArenaError::Registry(_)));
        assert!(arena_err.to_string().contains("royale:gone"));
    }

    #[test]
    fn test_session_error_through_registry_keeps_message() {
        let inner = SessionError::SessionFull(SessionKey::new("royale:full"));
        let arena_err: ArenaError = RegistryError::from(inner.clone()).into();
        assert_eq!(arena_err.to_string(), inner.to_string());
    }
}
