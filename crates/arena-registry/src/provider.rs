//! The resource provider hook.
//!
//! Every session is bound to one backing world. The registry does not know
//! how worlds are loaded; it asks a [`ResourceProvider`] for one when a
//! session is created and hands it back when the session is unloaded.
//!
//! Acquisition and release are asynchronous and run outside the host loop.
//! The remaining methods are cheap, synchronous checks the host loop calls
//! directly.

use std::future::Future;

use arena_types::{PlayerId, SessionKey};

use crate::RegistryError;

/// Loads and unloads the worlds sessions run in.
///
/// # Example
///
/// ```rust
/// use arena_registry::{RegistryError, ResourceProvider};
/// use arena_types::{PlayerId, SessionKey};
///
/// /// Every key maps to a flat 512-block world that never goes away.
/// struct FlatWorlds;
///
/// impl ResourceProvider for FlatWorlds {
///     type Resource = SessionKey;
///
///     async fn acquire(&self, key: &SessionKey) -> Result<SessionKey, RegistryError> {
///         Ok(key.clone())
///     }
///
///     async fn release(&self, _world: SessionKey) -> bool {
///         true
///     }
///
///     fn is_available(&self, _world: &SessionKey) -> bool {
///         true
///     }
///
///     fn extent(&self, _world: &SessionKey) -> u64 {
///         512
///     }
///
///     fn evacuate(&self, _world: &SessionKey, _players: &[PlayerId]) {}
/// }
/// ```
pub trait ResourceProvider: Send + Sync + 'static {
    /// Handle to a loaded world. Cloned when a release has to be retried.
    type Resource: Clone + Send + Sync + 'static;

    /// Loads the world for `key`.
    ///
    /// Return [`RegistryError::ResourceUnavailable`] when it cannot be
    /// loaded.
    fn acquire(
        &self,
        key: &SessionKey,
    ) -> impl Future<Output = Result<Self::Resource, RegistryError>> + Send;

    /// Unloads a world. `false` means the world is still loaded and the
    /// release may be retried.
    fn release(&self, resource: Self::Resource) -> impl Future<Output = bool> + Send;

    /// `false` once the world has gone away underneath the session.
    fn is_available(&self, resource: &Self::Resource) -> bool;

    /// Size of the world along its largest axis, in blocks.
    fn extent(&self, resource: &Self::Resource) -> u64;

    /// Moves players out of the world to the holding area.
    fn evacuate(&self, resource: &Self::Resource, players: &[PlayerId]);
}
