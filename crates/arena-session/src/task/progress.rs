use tracing::info;

use super::TickOutcome;
use crate::{Presentation, RunningPhase, Session, TimeIndicator};

/// Round timer for the Running state.
///
/// The first tick takes the round from warmup to live. After that it
/// publishes the time left every tick and advances once it reaches zero
/// (to Overtime when the round has one, otherwise to Ending).
#[derive(Debug)]
pub struct ProgressTask {
    total: Option<u64>,
    remaining: u64,
}

impl ProgressTask {
    /// `None` means the round has no time limit.
    pub fn new(round_length: Option<u64>) -> Self {
        Self {
            total: round_length,
            remaining: round_length.unwrap_or(u64::MAX),
        }
    }

    pub fn remaining(&self) -> Option<u64> {
        self.total.map(|_| self.remaining)
    }

    pub(crate) fn tick(&mut self, session: &mut Session, presentation: &dyn Presentation) -> TickOutcome {
        if session.phase() == RunningPhase::Warmup {
            session.set_phase(RunningPhase::Live, presentation);
            info!(key = %session.key(), survivors = session.survivor_count(), "round is live");
        }

        let Some(total) = self.total else {
            presentation.on_time_indicator(session.key(), &TimeIndicator::unlimited());
            return TickOutcome::Continue;
        };

        presentation.on_time_indicator(session.key(), &TimeIndicator::countdown(self.remaining, total));
        if self.remaining == 0 {
            info!(key = %session.key(), "round time expired");
            return TickOutcome::Advance;
        }
        self.remaining -= 1;
        TickOutcome::Continue
    }
}
