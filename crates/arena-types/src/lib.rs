//! Shared identity and value types for Arena.
//!
//! Every other crate in the workspace speaks in terms of these types:
//!
//! - [`PlayerId`]: who is playing
//! - [`SessionKey`]: which round (and which backing world) we mean
//! - [`SpawnPoint`]: where a player enters the world
//! - [`LoadoutItem`]: what a player is handed when they join
//!
//! # Architecture
//!
//! ```text
//! Registry (sessions by key) → Session (roster, spawns) → Types (this crate)
//! ```
//!
//! Nothing here knows about clocks, state machines or providers.

mod types;

pub use types::{LoadoutItem, PlayerId, SessionKey, SpawnPoint};
