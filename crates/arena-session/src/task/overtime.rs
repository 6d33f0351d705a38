use tracing::info;

use super::{TickOutcome, roll_hostile};
use crate::{Presentation, Session, SessionState, TimeIndicator};

/// Fixed-length overtime. Every tick sends a hostile wave after each
/// survivor, more aggressive as time runs out, and ends the round when the
/// time is up whether or not anyone is left.
#[derive(Debug)]
pub struct OvertimeTask {
    total: u64,
    remaining: u64,
}

impl OvertimeTask {
    /// Used when a round enables overtime without a length.
    pub const DEFAULT_LENGTH: u64 = 150;

    pub fn new(length: u64) -> Self {
        Self {
            total: length,
            remaining: length,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn tick(&mut self, session: &mut Session, presentation: &dyn Presentation) -> TickOutcome {
        let survivors = session.active_survivors();
        presentation.on_time_indicator(
            session.key(),
            &TimeIndicator::overtime(self.remaining, self.total, survivors.len()),
        );

        if self.remaining == 0 {
            info!(key = %session.key(), survivors = survivors.len(), "overtime expired");
            return TickOutcome::AdvanceTo(SessionState::Ending);
        }

        let aggression = 1.0 - self.remaining as f32 / self.total.max(1) as f32;
        let mut rng = rand::rng();
        for player in survivors {
            let spawn = roll_hostile(&mut rng, player, aggression);
            presentation.on_hostile_spawn(session.key(), &spawn);
        }

        self.remaining -= 1;
        TickOutcome::Continue
    }
}
