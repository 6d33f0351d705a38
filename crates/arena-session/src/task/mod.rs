//! Round tasks: the jobs that drive a session forward on clock ticks.
//!
//! Each state that needs time to pass schedules exactly one task on entry:
//!
//! | state    | task                                      |
//! |----------|-------------------------------------------|
//! | Starting | [`StartTask`]                             |
//! | Running  | [`ProgressTask`]                          |
//! | Overtime | [`OvertimeTask`] or [`CleanupTask`]       |
//! | Ending   | [`EndTask`]                               |
//!
//! A task never holds a reference to its session. The host resolves the
//! session by key on every tick and passes it in; the task reports what it
//! wants done with a [`TickOutcome`].

mod cleanup;
mod end;
mod overtime;
mod progress;
mod start;

pub use cleanup::CleanupTask;
pub use end::EndTask;
pub use overtime::OvertimeTask;
pub use progress::ProgressTask;
pub use start::StartTask;

use arena_clock::{Job, TaskHandle, TaskTable};
use arena_types::{PlayerId, SessionKey};
use rand::Rng;

use crate::{HostileKind, HostileSpawn, Presentation, PressureMode, Session, SessionState, SessionType};

/// Tag stored with every scheduled round task.
pub type TaskTag = (SessionKey, SessionState);

/// The job table shared by every session of one host.
pub type RoundTasks = TaskTable<RoundTask, TaskTag>;

/// Handle to one scheduled round task.
pub type RoundTaskHandle = TaskHandle<TaskKind, TaskTag>;

/// Discriminant of [`RoundTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Start,
    Progress,
    Overtime,
    End,
    Cleanup,
}

/// What a task asks for after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking.
    Continue,
    /// Move the session to its next state.
    Advance,
    /// Move the session to a specific state.
    AdvanceTo(SessionState),
    /// Stop this task; the session stays where it is.
    Cancel,
}

/// Any round task.
#[derive(Debug)]
pub enum RoundTask {
    Start(StartTask),
    Progress(ProgressTask),
    Overtime(OvertimeTask),
    End(EndTask),
    Cleanup(CleanupTask),
}

impl RoundTask {
    /// The task a session schedules on entering `state`, if any.
    pub fn for_state(state: SessionState, session_type: &SessionType) -> Option<Self> {
        match state {
            SessionState::Starting => Some(Self::Start(StartTask::new(session_type.countdown_length))),
            SessionState::Running => Some(Self::Progress(ProgressTask::new(session_type.round_length))),
            SessionState::Overtime => Some(match session_type.pressure {
                PressureMode::Overtime => Self::Overtime(OvertimeTask::new(
                    session_type.overtime.unwrap_or(OvertimeTask::DEFAULT_LENGTH),
                )),
                PressureMode::Cleanup => Self::Cleanup(CleanupTask::new(session_type.cleanup_grace)),
            }),
            SessionState::Ending => Some(Self::End(EndTask::new(session_type.end_length))),
            SessionState::Idle | SessionState::Stopped | SessionState::ForceStop => None,
        }
    }

    /// Runs one tick against the session.
    pub fn tick(&mut self, session: &mut Session, presentation: &dyn Presentation) -> TickOutcome {
        match self {
            Self::Start(task) => task.tick(session, presentation),
            Self::Progress(task) => task.tick(session, presentation),
            Self::Overtime(task) => task.tick(session, presentation),
            Self::End(task) => task.tick(session, presentation),
            Self::Cleanup(task) => task.tick(session, presentation),
        }
    }

    /// Undoes whatever the task put on screen. Runs before the task is
    /// cancelled during reconciliation.
    pub fn cleanup(&mut self, key: &SessionKey, presentation: &dyn Presentation) {
        match self {
            Self::Progress(_) | Self::Overtime(_) | Self::Cleanup(_) => {
                presentation.on_indicator_hidden(key);
            }
            Self::Start(_) | Self::End(_) => {}
        }
    }
}

impl Job for RoundTask {
    type Kind = TaskKind;

    fn kind(&self) -> TaskKind {
        match self {
            Self::Start(_) => TaskKind::Start,
            Self::Progress(_) => TaskKind::Progress,
            Self::Overtime(_) => TaskKind::Overtime,
            Self::End(_) => TaskKind::End,
            Self::Cleanup(_) => TaskKind::Cleanup,
        }
    }
}

// ---------------------------------------------------------------------------
// Hostile waves
// ---------------------------------------------------------------------------

const RANGER_CHANCE: f64 = 0.3;

/// Rolls one hostile actor 5–8 blocks away from `target` on a random side.
pub(crate) fn roll_hostile(rng: &mut impl Rng, target: PlayerId, aggression: f32) -> HostileSpawn {
    let offset_x = side_offset(rng);
    let offset_z = side_offset(rng);
    let kind = if rng.random_bool(RANGER_CHANCE) {
        HostileKind::Ranger
    } else {
        HostileKind::Swordsman
    };
    HostileSpawn {
        target,
        kind,
        offset_x,
        offset_z,
        aggression: aggression.clamp(0.0, 1.0),
    }
}

fn side_offset(rng: &mut impl Rng) -> i32 {
    let distance = rng.random_range(5..=8);
    if rng.random_bool(0.5) { distance } else { -distance }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_hostile_offsets_stay_in_range() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let spawn = roll_hostile(&mut rng, PlayerId(1), 0.5);
            assert!((5..=8).contains(&spawn.offset_x.abs()));
            assert!((5..=8).contains(&spawn.offset_z.abs()));
            assert_eq!(spawn.target, PlayerId(1));
        }
    }

    #[test]
    fn test_for_state_picks_pressure_task() {
        let mut t = SessionType::default();
        let task = RoundTask::for_state(SessionState::Overtime, &t).unwrap();
        assert_eq!(task.kind(), TaskKind::Overtime);

        t.pressure = PressureMode::Cleanup;
        let task = RoundTask::for_state(SessionState::Overtime, &t).unwrap();
        assert_eq!(task.kind(), TaskKind::Cleanup);
    }

    #[test]
    fn test_for_state_idle_and_terminal_have_no_task() {
        let t = SessionType::default();
        assert!(RoundTask::for_state(SessionState::Idle, &t).is_none());
        assert!(RoundTask::for_state(SessionState::Stopped, &t).is_none());
        assert!(RoundTask::for_state(SessionState::ForceStop, &t).is_none());
    }
}
