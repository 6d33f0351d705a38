use rand::Rng;
use tracing::info;

use super::{TickOutcome, roll_hostile};
use crate::{Blast, Presentation, Session, TimeIndicator};

const BLAST_RADIUS: f32 = 8.0;

/// Legacy overtime: hostile waves for a grace period, then blasts next to
/// every survivor until the round is decided. Never advances by itself.
#[derive(Debug)]
pub struct CleanupTask {
    grace: u64,
    elapsed: u64,
}

impl CleanupTask {
    pub fn new(grace: u64) -> Self {
        Self { grace, elapsed: 0 }
    }

    pub fn in_grace(&self) -> bool {
        self.elapsed < self.grace
    }

    pub(crate) fn tick(&mut self, session: &mut Session, presentation: &dyn Presentation) -> TickOutcome {
        let survivors = session.active_survivors();
        let remaining = self.grace.saturating_sub(self.elapsed);
        presentation.on_time_indicator(
            session.key(),
            &TimeIndicator::overtime(remaining, self.grace, survivors.len()),
        );

        let mut rng = rand::rng();
        if self.in_grace() {
            let aggression = self.elapsed as f32 / self.grace.max(1) as f32;
            for player in survivors {
                let spawn = roll_hostile(&mut rng, player, aggression);
                presentation.on_hostile_spawn(session.key(), &spawn);
            }
        } else {
            if self.elapsed == self.grace {
                info!(key = %session.key(), "cleanup grace over, switching to blasts");
            }
            for player in survivors {
                let blast = Blast {
                    target: player,
                    offset: (
                        rng.random_range(0..=3),
                        rng.random_range(0..=3),
                        rng.random_range(0..=3),
                    ),
                    radius: BLAST_RADIUS,
                };
                presentation.on_blast(session.key(), &blast);
            }
        }

        self.elapsed += 1;
        TickOutcome::Continue
    }
}
