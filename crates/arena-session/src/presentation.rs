//! The `Presentation` trait: everything a session wants shown to players.
//!
//! Sessions never render anything. They describe what happened (a
//! countdown marker, a time indicator, a hostile wave) and a
//! presentation implementation turns that into signs, scoreboards, titles
//! or log lines.

use arena_types::{LoadoutItem, PlayerId, SessionKey, SpawnPoint};
use serde::{Deserialize, Serialize};

use crate::{RunningPhase, SessionState};

// ---------------------------------------------------------------------------
// Snapshots and events
// ---------------------------------------------------------------------------

/// Read-only snapshot of a session, sent on every change and returned by
/// registry lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub key: SessionKey,
    pub type_name: String,
    pub state: SessionState,
    pub phase: RunningPhase,
    /// Registered players, eliminated ones included.
    pub roster: usize,
    /// Roster members not yet eliminated.
    pub survivors: usize,
    pub spectators: usize,
    pub free_spawns: usize,
    pub total_spawns: usize,
    pub winner: Option<PlayerId>,
    pub unloading: bool,
}

/// Colour band of a [`TimeIndicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorColor {
    Green,
    Yellow,
    Red,
}

impl IndicatorColor {
    /// Green at two thirds or more, yellow at one third or more, red below.
    pub fn for_progress(progress: f32) -> Self {
        if progress >= 0.66 {
            Self::Green
        } else if progress >= 0.33 {
            Self::Yellow
        } else {
            Self::Red
        }
    }
}

/// A bar showing how much of the current phase is left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeIndicator {
    pub title: String,
    /// 0.0 (expired) to 1.0 (full).
    pub progress: f32,
    pub color: IndicatorColor,
    /// `mm:ss`, `ss`, `--` or a free-form overtime label.
    pub label: String,
}

impl TimeIndicator {
    /// Round timer with `remaining` of `total` ticks left.
    pub fn countdown(remaining: u64, total: u64) -> Self {
        let progress = fraction(remaining, total);
        let label = if remaining >= 60 {
            format!("{:02}:{:02}", remaining / 60, remaining % 60)
        } else {
            format!("{remaining:02}")
        };
        Self {
            title: "Time remaining".to_owned(),
            progress,
            color: IndicatorColor::for_progress(progress),
            label,
        }
    }

    /// Round timer for a round without a time limit.
    pub fn unlimited() -> Self {
        Self {
            title: "Time remaining".to_owned(),
            progress: 1.0,
            color: IndicatorColor::Green,
            label: "--".to_owned(),
        }
    }

    /// Overtime bar. Always red.
    pub fn overtime(remaining: u64, total: u64, survivors: usize) -> Self {
        Self {
            title: "OVERTIME!".to_owned(),
            progress: fraction(remaining, total),
            color: IndicatorColor::Red,
            label: format!("{survivors} players left"),
        }
    }
}

fn fraction(remaining: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (remaining as f32 / total as f32).clamp(0.0, 1.0)
}

/// Kind of hostile actor sent after survivors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostileKind {
    Swordsman,
    Ranger,
}

/// One hostile actor to spawn near a survivor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostileSpawn {
    pub target: PlayerId,
    pub kind: HostileKind,
    /// Block offset from the target on the x axis (±5..=8).
    pub offset_x: i32,
    /// Block offset from the target on the z axis (±5..=8).
    pub offset_z: i32,
    /// 0.0 at the start of the wave phase, approaching 1.0 at its end.
    pub aggression: f32,
}

/// An area blast near a survivor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blast {
    pub target: PlayerId,
    /// Block offset from the target, each axis in `0..=3`.
    pub offset: (i32, i32, i32),
    pub radius: f32,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(PlayerId),
    Draw,
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Receiver of everything a session wants players to see.
///
/// Only `on_session_changed` is required. Every other hook defaults to a
/// no-op so a presentation can pick the events it cares about.
///
/// Hooks run on the host loop, so they must not block.
pub trait Presentation: Send + Sync {
    /// Called on every state transition, join, leave and elimination.
    fn on_session_changed(&self, info: &SessionInfo);

    /// A countdown marker during Starting.
    fn on_countdown(&self, _key: &SessionKey, _remaining: u64) {}

    /// The countdown hit zero.
    fn on_round_start(&self, _key: &SessionKey) {}

    /// Shows or updates the session's time indicator.
    fn on_time_indicator(&self, _key: &SessionKey, _indicator: &TimeIndicator) {}

    /// Hides the time indicator shown by [`on_time_indicator`](Self::on_time_indicator).
    fn on_indicator_hidden(&self, _key: &SessionKey) {}

    /// Spawns a hostile actor.
    fn on_hostile_spawn(&self, _key: &SessionKey, _spawn: &HostileSpawn) {}

    /// Triggers an area blast.
    fn on_blast(&self, _key: &SessionKey, _blast: &Blast) {}

    /// Announces the outcome. Sent once per session, on entering Ending.
    fn on_outcome(&self, _key: &SessionKey, _outcome: &Outcome) {}

    /// Celebratory effect for the winner.
    fn on_celebrate(&self, _key: &SessionKey, _winner: PlayerId) {}

    /// Hands a joining player their spawn point and starting items.
    fn on_loadout(
        &self,
        _key: &SessionKey,
        _player: PlayerId,
        _spawn: SpawnPoint,
        _items: &[LoadoutItem],
    ) {
    }

    /// Players were moved out of the session's world to the holding area.
    fn on_evacuate(&self, _key: &SessionKey, _players: &[PlayerId]) {}
}

/// A presentation that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn on_session_changed(&self, _info: &SessionInfo) {}
}
