//! Elimination rounds for Arena.
//!
//! A [`Session`] is one round on one backing world: a roster, a
//! [`SpawnAllocator`], an elimination set, a winner and the task handles of
//! its current state. Its state machine follows a static behavior table
//! ([`SessionState::behavior`]):
//!
//! ```text
//! Idle → Starting → Running → (Overtime) → Ending → Stopped
//!                                                   ForceStop
//! ```
//!
//! Entering a state schedules that state's round task (see [`task`]) in
//! the host's job table. Tasks tick once per clock tick, publish through a
//! [`Presentation`], and ask the session to advance when their time is up.
//!
//! # Ownership
//!
//! The session never holds on to its host. Every mutating call takes a
//! [`SessionCtx`] carrying the job table and the presentation, and tasks
//! get the session passed in on each tick. Transitions come back as
//! [`Transition`] values so the host can tear a session down once it
//! reaches a terminal state.

mod config;
mod error;
mod presentation;
mod session;
mod spawn;
pub mod task;

pub use config::{PressureMode, RunningPhase, SessionState, SessionType, StateBehavior};
pub use error::SessionError;
pub use presentation::{
    Blast, HostileKind, HostileSpawn, IndicatorColor, NullPresentation, Outcome, Presentation,
    SessionInfo, TimeIndicator,
};
pub use session::{Session, SessionCtx, Transition};
pub use spawn::SpawnAllocator;
pub use task::{RoundTask, RoundTaskHandle, RoundTasks, TaskKind, TaskTag, TickOutcome};
