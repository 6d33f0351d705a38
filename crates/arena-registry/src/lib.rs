//! Session registry and host loop for Arena.
//!
//! A host runs many sessions at once, one per world. This crate keeps
//! them in a single [`SessionRegistry`] owned by one Tokio task, the
//! registry actor, which also drives the round clock. Callers talk to it
//! through a cloneable [`RegistryHandle`].
//!
//! # Key types
//!
//! - [`spawn_registry`]: starts the actor and returns its handle
//! - [`ResourceProvider`]: loads and unloads the worlds sessions run in
//! - [`MutatorPipeline`]: seeds a new session before it opens
//! - [`RegistryConfig`]: world size limit and channel sizing
//! - [`RegistryError`]: what registry operations can fail with
//!
//! ```text
//! RegistryHandle ──commands──▶ RegistryActor ──owns──▶ SessionRegistry
//!                                   │                    ├─ Session ×N
//!                             RoundClock ticks           └─ RoundTasks
//! ```

#![allow(async_fn_in_trait)]

mod actor;
mod error;
mod mutator;
mod provider;
mod registry;

pub use actor::{RegistryHandle, spawn_registry};
pub use error::RegistryError;
pub use mutator::{MutatorPipeline, SpawnListPipeline};
pub use provider::ResourceProvider;
pub use registry::{RegistryConfig, SessionRegistry};
