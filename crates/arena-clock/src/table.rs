//! Tick-counted job table with typed cancellation handles.
//!
//! The table owns the jobs; callers own [`TaskHandle`]s. Every handle is
//! returned by [`TaskTable::schedule`] and carries the job's kind plus a
//! caller-chosen tag (the session layer tags with `(key, state)`).
//!
//! Jobs are visited in creation order, which keeps tick processing
//! deterministic regardless of when the host woke up.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

/// Anything that can be scheduled in a [`TaskTable`].
pub trait Job {
    /// Discriminant used to check that a handle still points at the kind
    /// of job it was created for.
    type Kind: Copy + Eq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Identifier of a scheduled job. Never reused within one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// What the table knows about a job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus<K> {
    /// No such job (never scheduled, or already swept).
    Missing,
    /// The job's handle was cancelled; it will be swept on the next tick.
    Cancelled,
    /// The job is scheduled.
    Live(K),
}

// ---------------------------------------------------------------------------
// TaskHandle
// ---------------------------------------------------------------------------

/// Cancellation handle for one scheduled job.
///
/// Cloning a handle shares the cancellation flag.
#[derive(Debug, Clone)]
pub struct TaskHandle<K, T> {
    id: TaskId,
    kind: K,
    tag: T,
    cancelled: Arc<AtomicBool>,
}

impl<K: Copy, T> TaskHandle<K, T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }

    /// Cancels the job. Returns `true` only for the call that actually
    /// flipped the flag, so repeated calls are harmless.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// TaskTable
// ---------------------------------------------------------------------------

struct Entry<J: Job, T> {
    /// `None` while the job is checked out for its tick.
    job: Option<J>,
    kind: J::Kind,
    tag: T,
    period: u64,
    next_due: u64,
    cancelled: Arc<AtomicBool>,
}

/// All scheduled jobs of one host.
pub struct TaskTable<J: Job, T> {
    entries: BTreeMap<TaskId, Entry<J, T>>,
    next_id: u64,
    now: u64,
}

impl<J: Job, T: Clone> TaskTable<J, T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
            now: 0,
        }
    }

    /// Ticks elapsed since the table was created.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `job` to run every `period` ticks, first on the tick
    /// `period` ticks from now. A `period` of 0 is treated as 1.
    pub fn schedule(&mut self, tag: T, job: J, period: u64) -> TaskHandle<J::Kind, T> {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let period = period.max(1);
        let kind = job.kind();
        let cancelled = Arc::new(AtomicBool::new(false));

        self.entries.insert(
            id,
            Entry {
                job: Some(job),
                kind,
                tag: tag.clone(),
                period,
                next_due: self.now + period,
                cancelled: Arc::clone(&cancelled),
            },
        );
        trace!(task = %id, ?kind, period, "job scheduled");

        TaskHandle {
            id,
            kind,
            tag,
            cancelled,
        }
    }

    /// Moves the table one tick forward.
    ///
    /// Sweeps cancelled jobs, then returns the ids (and tags) of every job
    /// due on this tick, in creation order.
    pub fn advance(&mut self) -> Vec<(TaskId, T)> {
        self.now += 1;
        self.sweep();
        let now = self.now;
        self.entries
            .iter()
            .filter(|(_, e)| e.job.is_some() && e.next_due <= now)
            .map(|(id, e)| (*id, e.tag.clone()))
            .collect()
    }

    /// Takes a job out of the table for its tick. Returns `None` if the
    /// job is missing, cancelled or already checked out.
    pub fn checkout(&mut self, id: TaskId) -> Option<J> {
        let entry = self.entries.get_mut(&id)?;
        if entry.cancelled.load(Ordering::Acquire) {
            return None;
        }
        entry.job.take()
    }

    /// Puts a checked-out job back and books its next run.
    ///
    /// If the job was cancelled (or removed) while it was out, it is
    /// handed back to the caller instead so its cleanup can still run.
    pub fn checkin(&mut self, id: TaskId, job: J) -> Option<J> {
        let now = self.now;
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.cancelled.load(Ordering::Acquire) && entry.job.is_none() => {
                entry.next_due = now + entry.period;
                entry.job = Some(job);
                None
            }
            _ => {
                self.entries.remove(&id);
                Some(job)
            }
        }
    }

    /// Mutable access to a scheduled (not checked-out) job.
    pub fn job_mut(&mut self, id: TaskId) -> Option<&mut J> {
        self.entries.get_mut(&id).and_then(|e| e.job.as_mut())
    }

    pub fn status(&self, id: TaskId) -> JobStatus<J::Kind> {
        match self.entries.get(&id) {
            None => JobStatus::Missing,
            Some(e) if e.cancelled.load(Ordering::Acquire) => JobStatus::Cancelled,
            Some(e) => JobStatus::Live(e.kind),
        }
    }

    /// Cancels and removes a job. Returns `false` if it was not live.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => !entry.cancelled.swap(true, Ordering::AcqRel),
            None => false,
        }
    }

    /// Number of live (not cancelled) jobs.
    pub fn live(&self) -> usize {
        self.entries
            .values()
            .filter(|e| !e.cancelled.load(Ordering::Acquire))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.live() == 0
    }

    fn sweep(&mut self) {
        self.entries.retain(|id, e| {
            let keep = !e.cancelled.load(Ordering::Acquire);
            if !keep {
                trace!(task = %id, "cancelled job swept");
            }
            keep
        });
    }
}

impl<J: Job, T: Clone> Default for TaskTable<J, T> {
    fn default() -> Self {
        Self::new()
    }
}
