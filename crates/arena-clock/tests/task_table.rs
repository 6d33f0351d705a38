//! Integration tests for the tick-counted task table.

use arena_clock::{Job, JobStatus, TaskTable};

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Count,
    Other,
}

#[derive(Debug)]
struct Counter {
    kind: Kind,
    runs: u32,
}

impl Counter {
    fn new(kind: Kind) -> Self {
        Self { kind, runs: 0 }
    }
}

impl Job for Counter {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        self.kind
    }
}

type Table = TaskTable<Counter, &'static str>;

/// Runs every due job once, the way the registry does.
fn run_tick(table: &mut Table) -> Vec<&'static str> {
    let mut ran = Vec::new();
    for (id, tag) in table.advance() {
        if let Some(mut job) = table.checkout(id) {
            job.runs += 1;
            ran.push(tag);
            assert!(table.checkin(id, job).is_none());
        }
    }
    ran
}

// =========================================================================
// Scheduling
// =========================================================================

#[test]
fn test_schedule_first_run_is_next_tick() {
    let mut table = Table::new();
    let handle = table.schedule("a", Counter::new(Kind::Count), 1);

    assert_eq!(handle.kind(), Kind::Count);
    assert_eq!(*handle.tag(), "a");
    assert_eq!(table.status(handle.id()), JobStatus::Live(Kind::Count));
    assert_eq!(run_tick(&mut table), vec!["a"]);
    assert_eq!(table.job_mut(handle.id()).unwrap().runs, 1);
}

#[test]
fn test_schedule_period_spaces_runs() {
    let mut table = Table::new();
    table.schedule("slow", Counter::new(Kind::Count), 3);

    let ran: Vec<_> = (0..6).map(|_| run_tick(&mut table).len()).collect();
    assert_eq!(ran, vec![0, 0, 1, 0, 0, 1]);
}

#[test]
fn test_advance_runs_in_creation_order() {
    let mut table = Table::new();
    table.schedule("first", Counter::new(Kind::Count), 1);
    table.schedule("second", Counter::new(Kind::Other), 1);
    table.schedule("third", Counter::new(Kind::Count), 1);

    assert_eq!(run_tick(&mut table), vec!["first", "second", "third"]);
    assert_eq!(table.now(), 1);
}

// =========================================================================
// Cancellation
// =========================================================================

#[test]
fn test_handle_cancel_is_idempotent() {
    let mut table = Table::new();
    let handle = table.schedule("a", Counter::new(Kind::Count), 1);

    assert!(handle.cancel());
    assert!(!handle.cancel());
    assert!(handle.is_cancelled());
    assert_eq!(table.status(handle.id()), JobStatus::Cancelled);

    assert!(run_tick(&mut table).is_empty());
    assert_eq!(table.status(handle.id()), JobStatus::Missing);
    assert!(table.is_empty());
}

#[test]
fn test_table_cancel_removes_job() {
    let mut table = Table::new();
    let handle = table.schedule("a", Counter::new(Kind::Count), 1);

    assert!(table.cancel(handle.id()));
    assert!(!table.cancel(handle.id()));
    assert!(handle.is_cancelled());
    assert_eq!(table.status(handle.id()), JobStatus::Missing);
}

#[test]
fn test_checkin_after_cancel_returns_job() {
    let mut table = Table::new();
    let handle = table.schedule("a", Counter::new(Kind::Count), 1);

    let due = table.advance();
    assert_eq!(due.len(), 1);
    let job = table.checkout(handle.id()).unwrap();
    handle.cancel();

    let returned = table.checkin(handle.id(), job);
    assert!(returned.is_some());
    assert_eq!(table.status(handle.id()), JobStatus::Missing);
}

#[test]
fn test_checkout_twice_yields_nothing() {
    let mut table = Table::new();
    let handle = table.schedule("a", Counter::new(Kind::Count), 1);
    table.advance();

    let job = table.checkout(handle.id());
    assert!(job.is_some());
    assert!(table.checkout(handle.id()).is_none());
    // Still reported live while checked out.
    assert_eq!(table.status(handle.id()), JobStatus::Live(Kind::Count));
}

#[test]
fn test_live_counts_only_uncancelled() {
    let mut table = Table::new();
    let a = table.schedule("a", Counter::new(Kind::Count), 1);
    table.schedule("b", Counter::new(Kind::Count), 1);
    assert_eq!(table.live(), 2);

    a.cancel();
    assert_eq!(table.live(), 1);
}
