//! The host's fixed-cadence round clock.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the host wakes up late for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickPolicy {
    /// Fire one tick now and schedule the next from now.
    #[default]
    Skip,
    /// Keep the original cadence, firing missed ticks back to back, but
    /// never more than `max_catchup` of them.
    CatchUp {
        /// Hard cap on consecutive catch-up ticks.
        max_catchup: u32,
    },
}

/// Configuration for the round clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Ticks per second. Round lengths in a `SessionType` count these.
    /// 0 = manual clock: `wait_for_tick` never fires and the owner ticks
    /// explicitly.
    pub tick_rate_hz: u32,
    /// Late-tick handling.
    pub policy: TickPolicy,
    /// A warning is logged when tick work exceeds this fraction of the
    /// tick budget (0.0–1.0).
    pub budget_warn_threshold: f64,
    /// Random jitter (0–max µs) added to the first tick.
    pub initial_jitter_us: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter_us: 2_000,
        }
    }
}

impl ClockConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 20;

    /// A config for a specific tick rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// A manual clock. The owner drives ticks itself.
    pub fn manual() -> Self {
        Self {
            tick_rate_hz: 0,
            initial_jitter_us: 0,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values. Called by [`RoundClock::new`].
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// Duration of one tick, `None` for a manual clock.
    pub fn tick_duration(&self) -> Option<Duration> {
        if self.tick_rate_hz == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`RoundClock::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    /// Monotonically increasing tick number, starting at 1.
    pub tick: u64,
    /// `true` if the host woke up more than 10% of a tick late.
    pub late: bool,
    /// Ticks dropped under [`TickPolicy::Skip`] (or beyond the catch-up cap).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Fixed-cadence tick source for the host loop.
pub struct RoundClock {
    config: ClockConfig,
    tick_duration: Option<Duration>,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    tick_start: Option<Instant>,
    paused: bool,
}

impl RoundClock {
    /// Creates a clock. The first tick is delayed by a random jitter.
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        let next_tick = tick_duration.map(|d| {
            let jitter = if config.initial_jitter_us > 0 {
                Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
            } else {
                Duration::ZERO
            };
            TokioInstant::now() + d + jitter
        });

        match tick_duration {
            Some(d) => debug!(
                rate_hz = config.tick_rate_hz,
                tick_ms = d.as_secs_f64() * 1000.0,
                policy = ?config.policy,
                "round clock created"
            ),
            None => debug!("round clock created in manual mode"),
        }

        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick,
            tick_start: None,
            paused: false,
        }
    }

    /// Waits for the next tick.
    ///
    /// Pends forever on a manual or paused clock, so the other
    /// `select!` branches keep running.
    pub async fn wait_for_tick(&mut self) -> ClockTick {
        let (next, tick_dur) = match (self.next_tick, self.tick_duration) {
            (Some(next), Some(dur)) if !self.paused => (next, dur),
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let late = late_by > tick_dur / 10;
        let behind = if late {
            (late_by.as_nanos() / tick_dur.as_nanos()) as u64
        } else {
            0
        };

        let (next_tick, ticks_skipped) = match self.config.policy {
            TickPolicy::Skip => (now + tick_dur, behind),
            TickPolicy::CatchUp { max_catchup } => {
                if behind <= u64::from(max_catchup) {
                    (next + tick_dur, 0)
                } else {
                    (now + tick_dur, behind - u64::from(max_catchup))
                }
            }
        };
        self.next_tick = Some(next_tick);

        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "round clock fell behind"
            );
        }
        trace!(tick = self.tick_count, late, "clock tick");

        ClockTick {
            tick: self.tick_count,
            late,
            ticks_skipped,
        }
    }

    /// Records that the work for the current tick has finished and warns
    /// when it ate most of the tick budget.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let Some(budget) = self.tick_duration else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                "round tick approaching budget"
            );
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "round clock paused");
        }
    }

    /// Resumes ticking one full tick from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(dur) = self.tick_duration {
                self.next_tick = Some(TokioInstant::now() + dur);
            }
            debug!(tick = self.tick_count, "round clock resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_manual(&self) -> bool {
        self.tick_duration.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
