use tracing::debug;

use super::TickOutcome;
use crate::{Presentation, Session};

/// Countdown from Starting to Running.
///
/// With a countdown of `n` the session reaches Running on the `n`-th tick,
/// showing markers `n - 1` down to `1` on the ticks before it.
#[derive(Debug)]
pub struct StartTask {
    total: u64,
    elapsed: u64,
}

impl StartTask {
    pub fn new(countdown_length: u64) -> Self {
        Self {
            total: countdown_length,
            elapsed: 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.elapsed)
    }

    pub(crate) fn tick(&mut self, session: &mut Session, presentation: &dyn Presentation) -> TickOutcome {
        self.elapsed += 1;
        let remaining = self.remaining();
        if remaining > 0 {
            presentation.on_countdown(session.key(), remaining);
            return TickOutcome::Continue;
        }

        debug!(key = %session.key(), "countdown finished");
        presentation.on_round_start(session.key());
        TickOutcome::Advance
    }
}
