//! Round clock and task table for Arena.
//!
//! Two pieces live here:
//!
//! - [`RoundClock`]: the host's fixed-cadence tick source (1 Hz by
//!   default). It sits in the host actor's `tokio::select!` loop, exactly
//!   one tick resolves at a time.
//! - [`TaskTable`]: the jobs that run on those ticks. Scheduling a job
//!   returns a strongly typed [`TaskHandle`]; the handle is the only way to
//!   cancel it, so callers never go looking for jobs by introspection.
//!
//! Countdowns are expressed in ticks, not wall-clock time. A late tick is
//! still exactly one tick.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = clock.wait_for_tick() => {
//!             for (id, tag) in table.advance() { /* run job */ }
//!             clock.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod clock;
mod table;

pub use clock::{ClockConfig, ClockTick, RoundClock, TickPolicy};
pub use table::{Job, JobStatus, TaskHandle, TaskId, TaskTable};
