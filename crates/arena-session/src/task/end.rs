use tracing::{info, warn};

use super::TickOutcome;
use crate::{Outcome, Presentation, Session};

/// Outcome announcement and the short celebration before Stopped.
///
/// The first tick announces the outcome. A draw stops the session right
/// away; a winner gets `end_length` ticks of celebration first. Without an
/// `end_length` the task ends after the announcement and the session waits
/// in Ending.
#[derive(Debug)]
pub struct EndTask {
    total: Option<u64>,
    remaining: u64,
    announced: bool,
}

impl EndTask {
    /// `None` keeps the session in Ending until someone stops it.
    pub fn new(end_length: Option<u64>) -> Self {
        Self {
            total: end_length,
            remaining: end_length.unwrap_or(u64::MAX),
            announced: false,
        }
    }

    pub(crate) fn tick(&mut self, session: &mut Session, presentation: &dyn Presentation) -> TickOutcome {
        if !self.announced {
            self.announced = true;
            let outcome = session.winner().map_or(Outcome::Draw, Outcome::Winner);
            presentation.on_outcome(session.key(), &outcome);
            match outcome {
                Outcome::Winner(winner) => {
                    info!(key = %session.key(), %winner, "round finished");
                    presentation.on_celebrate(session.key(), winner);
                }
                Outcome::Draw => {
                    warn!(key = %session.key(), "round ended without a winner");
                    if self.total.is_some() {
                        return TickOutcome::Advance;
                    }
                }
            }
        }

        if self.total.is_none() {
            return TickOutcome::Cancel;
        }
        if self.remaining == 0 {
            return TickOutcome::Advance;
        }
        self.remaining -= 1;
        TickOutcome::Continue
    }
}
