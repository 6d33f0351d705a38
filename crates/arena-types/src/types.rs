//! Core value types for Arena.
//!
//! These are small, cheap-to-clone values that travel between the
//! registry, sessions, tasks and external collaborators.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype wrapper around `u64` so a player id can never be confused with
/// a tick count or a task id. Serialized as the bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The key of a session, which is also the key of its backing world.
///
/// Keys are namespaced strings such as `"royale:canyon"`. The registry
/// holds at most one session per key.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Creates a key from anything string-like.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// ---------------------------------------------------------------------------
// World positions
// ---------------------------------------------------------------------------

/// A position in the session's world where one player enters the round.
///
/// Spawn points are discovered by the mutator pipeline (usually from marker
/// blocks) and handed to the session's spawn allocator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SpawnPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Centers a spawn on top of a block: `+0.5` on both horizontal axes
    /// and a hair above the floor so the player does not clip into it.
    pub fn on_block(x: i32, y: i32, z: i32) -> Self {
        Self::new(f64::from(x) + 0.5, f64::from(y) + 0.0125, f64::from(z) + 0.5)
    }
}

impl fmt::Display for SpawnPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Loadout
// ---------------------------------------------------------------------------

/// One stack of items handed to a player when they take a spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutItem {
    /// Namespaced item type, e.g. `"minecraft:bow"`.
    pub item: String,
    /// Stack size.
    pub quantity: u32,
}

impl LoadoutItem {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}
