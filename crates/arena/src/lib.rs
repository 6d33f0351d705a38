//! # Arena
//!
//! Elimination-round session engine for simulated worlds.
//!
//! A host runs many rounds at once, each bound to its own world. Players
//! join a session, take a spawn point and get a loadout; once enough have
//! joined a countdown starts, the round runs on a fixed-rate clock and
//! ends when one survivor is left or time runs out, with overtime pressure
//! in between. Finished sessions are torn down and their worlds released.
//!
//! This crate re-exports the layers and adds the [`ArenaHost`] builder:
//!
//! ```text
//! ArenaHost → RegistryHandle → registry actor → Session → round tasks
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arena::prelude::*;
//!
//! // Implement ResourceProvider for your world storage, then:
//! // ArenaHost::init_tracing();
//! // let host = ArenaHost::builder()
//! //     .tick_rate(1)
//! //     .spawn(MyWorlds::new(), SpawnListPipeline::ring(8, 24.0, 64));
//! // host.handle().create_session("royale:canyon", Arc::new(SessionType::default()), false).await?;
//! ```

mod error;
mod host;

pub use error::ArenaError;
pub use host::{ArenaConfig, ArenaHost, ArenaHostBuilder};

pub use arena_clock as clock;
pub use arena_registry as registry;
pub use arena_session as session;
pub use arena_types as types;

/// Everything needed to run a host and write a provider.
pub mod prelude {
    pub use std::sync::Arc;

    pub use arena_clock::ClockConfig;
    pub use arena_registry::{
        MutatorPipeline, RegistryConfig, RegistryError, RegistryHandle, ResourceProvider,
        SpawnListPipeline,
    };
    pub use arena_session::{
        NullPresentation, Outcome, Presentation, PressureMode, Session, SessionError, SessionInfo,
        SessionState, SessionType,
    };
    pub use arena_types::{LoadoutItem, PlayerId, SessionKey, SpawnPoint};

    pub use crate::{ArenaConfig, ArenaError, ArenaHost, ArenaHostBuilder};
}
