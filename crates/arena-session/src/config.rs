//! Round configuration and the session state machine's behavior table.

use std::fmt;

use arena_types::LoadoutItem;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionType
// ---------------------------------------------------------------------------

/// Which task drives the Overtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureMode {
    /// Fixed-length overtime with hostile waves, then Ending.
    #[default]
    Overtime,
    /// Legacy cleanup crew: hostile waves for a grace period, then blasts
    /// until the round is decided.
    Cleanup,
}

/// Immutable configuration of one kind of round.
///
/// All lengths are in clock ticks. A session keeps the `Arc<SessionType>`
/// it was created with; reloading configuration produces a new value and
/// only affects sessions created afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionType {
    /// Display name, e.g. `"Last Man Standing"`.
    pub name: String,

    /// Countdown before the round starts. With a countdown of `n`, the
    /// session reaches Running on the `n`-th tick after entering Starting.
    pub countdown_length: u64,

    /// Length of the Running state. `None` runs until a winner is found.
    pub round_length: Option<u64>,

    /// Length of the Ending state. `None` keeps the session in Ending until
    /// it is stopped by hand.
    pub end_length: Option<u64>,

    /// Roster size at which an Idle session starts itself. `None` disables
    /// auto-start.
    pub auto_start_count: Option<usize>,

    /// Length of overtime. `None` skips the Overtime state entirely.
    pub overtime: Option<u64>,

    /// Task used while in Overtime.
    pub pressure: PressureMode,

    /// Ticks of hostile waves before [`PressureMode::Cleanup`] switches to
    /// blasts.
    pub cleanup_grace: u64,

    /// Items handed to every player when they take a spawn.
    pub default_loadout: Vec<LoadoutItem>,
}

impl Default for SessionType {
    fn default() -> Self {
        Self {
            name: "Last Man Standing".to_owned(),
            countdown_length: 5,
            round_length: Some(300),
            end_length: Some(10),
            auto_start_count: Some(6),
            overtime: Some(150),
            pressure: PressureMode::default(),
            cleanup_grace: 150,
            default_loadout: vec![
                LoadoutItem::new("minecraft:stone_sword", 1),
                LoadoutItem::new("minecraft:bow", 1),
                LoadoutItem::new("minecraft:stone_axe", 1),
                LoadoutItem::new("minecraft:stone_pickaxe", 1),
                LoadoutItem::new("minecraft:arrow", 5),
            ],
        }
    }
}

impl SessionType {
    pub fn has_overtime(&self) -> bool {
        self.overtime.is_some()
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Per-state behavior flags. One row of a static table; states never
/// override behavior individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateBehavior {
    /// Players may join.
    pub can_join: bool,
    /// Players may leave without being eliminated.
    pub can_leave: bool,
    /// Owned task handles are reconciled and cancelled on entry.
    pub cancel_tasks_on_entry: bool,
    /// Entering this state with at most one survivor redirects to Ending.
    pub check_round_over_on_entry: bool,
}

const fn behavior(
    can_join: bool,
    can_leave: bool,
    cancel_tasks_on_entry: bool,
    check_round_over_on_entry: bool,
) -> StateBehavior {
    StateBehavior {
        can_join,
        can_leave,
        cancel_tasks_on_entry,
        check_round_over_on_entry,
    }
}

/// Indexed by [`SessionState::ordinal`].
const BEHAVIORS: [StateBehavior; 7] = [
    behavior(true, true, true, false),    // Idle
    behavior(false, false, true, true),   // Starting
    behavior(false, false, true, true),   // Running
    behavior(false, false, true, true),   // Overtime
    behavior(false, false, true, false),  // Ending
    behavior(false, false, true, false),  // Stopped
    behavior(false, false, true, false),  // ForceStop
];

/// The lifecycle state of a session.
///
/// ```text
/// Idle → Starting → Running → (Overtime) → Ending → Stopped
///                                                   ForceStop (from anywhere)
/// ```
///
/// - **Idle**: accepting players, nothing ticking.
/// - **Starting**: countdown running, roster frozen.
/// - **Running**: the round proper. Eliminations can decide it early.
/// - **Overtime**: optional pressure phase once the round timer runs out.
/// - **Ending**: outcome announced, short celebration.
/// - **Stopped** / **ForceStop**: terminal; the registry tears the session
///   down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Overtime,
    Ending,
    Stopped,
    ForceStop,
}

impl SessionState {
    /// Position in forward order.
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Behavior flags for this state.
    pub const fn behavior(self) -> StateBehavior {
        BEHAVIORS[self.ordinal()]
    }

    /// Stopped and ForceStop. No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::ForceStop)
    }

    /// States in which eliminations can decide the round.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Overtime)
    }

    /// The next state in forward order. Overtime is skipped when the round
    /// has none. Terminal states have no successor.
    pub fn next(self, overtime: bool) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Starting),
            Self::Starting => Some(Self::Running),
            Self::Running if overtime => Some(Self::Overtime),
            Self::Running | Self::Overtime => Some(Self::Ending),
            Self::Ending => Some(Self::Stopped),
            Self::Stopped | Self::ForceStop => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Overtime => "Overtime",
            Self::Ending => "Ending",
            Self::Stopped => "Stopped",
            Self::ForceStop => "ForceStop",
        };
        f.write_str(name)
    }
}

/// Sub-phase of Running. The round enters Running in `Warmup` and the
/// first progress tick makes it `Live`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunningPhase {
    #[default]
    Warmup,
    Live,
}
