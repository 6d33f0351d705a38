//! A single elimination round.
//!
//! A `Session` owns its roster, spawn pool and task handles. It does not
//! own the job table or the presentation; every mutating call gets them
//! through a [`SessionCtx`] from whoever hosts the session (the registry
//! in production, a bare table in tests).
//!
//! Nothing here is synchronized. The host runs every call on one task.

use std::collections::BTreeSet;
use std::sync::Arc;

use arena_clock::{JobStatus, TaskId};
use arena_types::{PlayerId, SessionKey, SpawnPoint};
use tracing::{debug, info, warn};

use crate::task::{RoundTask, RoundTaskHandle, RoundTasks, TickOutcome};
use crate::{
    Presentation, RunningPhase, SessionError, SessionInfo, SessionState, SessionType,
    SpawnAllocator,
};

/// What a session needs from its host for a mutating call.
pub struct SessionCtx<'a> {
    pub tasks: &'a mut RoundTasks,
    pub presentation: &'a dyn Presentation,
}

impl<'a> SessionCtx<'a> {
    pub fn new(tasks: &'a mut RoundTasks, presentation: &'a dyn Presentation) -> Self {
        Self {
            tasks,
            presentation,
        }
    }
}

/// An accepted state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
}

impl Transition {
    /// The session ended up in Stopped or ForceStop and should be torn down.
    pub fn is_terminal(&self) -> bool {
        self.to.is_terminal()
    }
}

/// One round bound to one backing world.
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
    session_type: Arc<SessionType>,
    state: SessionState,
    phase: RunningPhase,
    roster: BTreeSet<PlayerId>,
    spawns: SpawnAllocator,
    eliminated: BTreeSet<PlayerId>,
    spectators: BTreeSet<PlayerId>,
    winner: Option<PlayerId>,
    tasks: Vec<RoundTaskHandle>,
    unloading: bool,
}

impl Session {
    /// Creates an Idle session with an empty spawn pool.
    pub fn new(key: SessionKey, session_type: Arc<SessionType>) -> Self {
        Self {
            key,
            session_type,
            state: SessionState::Idle,
            phase: RunningPhase::default(),
            roster: BTreeSet::new(),
            spawns: SpawnAllocator::new(),
            eliminated: BTreeSet::new(),
            spectators: BTreeSet::new(),
            winner: None,
            tasks: Vec::new(),
            unloading: false,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn session_type(&self) -> &Arc<SessionType> {
        &self.session_type
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> RunningPhase {
        self.phase
    }

    pub fn roster(&self) -> &BTreeSet<PlayerId> {
        &self.roster
    }

    pub fn eliminated(&self) -> &BTreeSet<PlayerId> {
        &self.eliminated
    }

    pub fn spectators(&self) -> &BTreeSet<PlayerId> {
        &self.spectators
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn spawns(&self) -> &SpawnAllocator {
        &self.spawns
    }

    /// Mutable spawn pool, for the mutator pipeline.
    pub fn spawns_mut(&mut self) -> &mut SpawnAllocator {
        &mut self.spawns
    }

    pub fn task_handles(&self) -> &[RoundTaskHandle] {
        &self.tasks
    }

    pub fn is_unloading(&self) -> bool {
        self.unloading
    }

    /// Registered and not eliminated.
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.roster.contains(&player) && !self.eliminated.contains(&player)
    }

    pub fn survivor_count(&self) -> usize {
        self.roster.len() - self.eliminated.len()
    }

    /// Survivors that are not spectating, in id order.
    pub fn active_survivors(&self) -> Vec<PlayerId> {
        self.roster
            .iter()
            .filter(|p| !self.eliminated.contains(*p) && !self.spectators.contains(*p))
            .copied()
            .collect()
    }

    /// At most one roster member is left standing.
    pub fn is_round_over(&self) -> bool {
        self.survivor_count() <= 1
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            key: self.key.clone(),
            type_name: self.session_type.name.clone(),
            state: self.state,
            phase: self.phase,
            roster: self.roster.len(),
            survivors: self.survivor_count(),
            spectators: self.spectators.len(),
            free_spawns: self.spawns.free(),
            total_spawns: self.spawns.total(),
            winner: self.winner,
            unloading: self.unloading,
        }
    }

    pub(crate) fn set_phase(&mut self, phase: RunningPhase, presentation: &dyn Presentation) {
        if self.phase != phase {
            self.phase = phase;
            presentation.on_session_changed(&self.info());
        }
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    /// Moves to the next state in forward order.
    pub fn advance(&mut self, ctx: &mut SessionCtx<'_>) -> Result<Transition, SessionError> {
        let next = self
            .state
            .next(self.session_type.has_overtime())
            .ok_or(SessionError::InvalidStateTransition {
                from: self.state,
                to: self.state,
            })?;
        self.advance_to(next, ctx)
    }

    /// Moves to `target`, or to Ending when `target` checks for a finished
    /// round and at most one player is left.
    ///
    /// Rejects the current state, anything from a terminal state, and any
    /// backward move other than ForceStop.
    pub fn advance_to(
        &mut self,
        target: SessionState,
        ctx: &mut SessionCtx<'_>,
    ) -> Result<Transition, SessionError> {
        let from = self.state;
        if from.is_terminal()
            || target == from
            || (target != SessionState::ForceStop && target < from)
        {
            return Err(SessionError::InvalidStateTransition { from, to: target });
        }

        let mut to = target;
        if to.behavior().check_round_over_on_entry && self.is_round_over() {
            debug!(key = %self.key, requested = %target, "round already decided, ending instead");
            to = SessionState::Ending;
        }
        if to == from {
            return Err(SessionError::InvalidStateTransition { from, to: target });
        }

        if to == SessionState::Ending && self.winner.is_none() && self.survivor_count() == 1 {
            self.winner = self.roster.iter().find(|p| !self.eliminated.contains(*p)).copied();
        }

        if to.behavior().cancel_tasks_on_entry {
            self.stop_tasks(ctx);
        }
        if to == SessionState::Running {
            self.phase = RunningPhase::Warmup;
        }
        if let Some(task) = RoundTask::for_state(to, &self.session_type) {
            let handle = ctx.tasks.schedule((self.key.clone(), to), task, 1);
            debug!(key = %self.key, task = %handle.id(), kind = ?handle.kind(), "task scheduled");
            self.tasks.push(handle);
        }

        self.state = to;
        info!(key = %self.key, %from, %to, winner = ?self.winner, "session advanced");
        ctx.presentation.on_session_changed(&self.info());

        Ok(Transition { from, to })
    }

    /// Jumps to ForceStop from any non-terminal state.
    pub fn force_stop(&mut self, ctx: &mut SessionCtx<'_>) -> Result<Transition, SessionError> {
        self.advance_to(SessionState::ForceStop, ctx)
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Registers a player and hands them a spawn point.
    ///
    /// Starts the session when the roster reaches the auto-start count
    /// while Idle.
    pub fn add_player(
        &mut self,
        player: PlayerId,
        ctx: &mut SessionCtx<'_>,
    ) -> Result<SpawnPoint, SessionError> {
        if self.spawns.is_full() {
            return Err(SessionError::SessionFull(self.key.clone()));
        }
        if !self.state.behavior().can_join || self.unloading {
            return Err(SessionError::InvalidStateTransition {
                from: self.state,
                to: self.state,
            });
        }
        if self.roster.contains(&player) {
            return Err(SessionError::AlreadyRegistered(player));
        }

        let spawn = self.spawns.assign(player)?;
        self.roster.insert(player);
        info!(key = %self.key, %player, %spawn, roster = self.roster.len(), "player joined");

        ctx.presentation
            .on_loadout(&self.key, player, spawn, &self.session_type.default_loadout);
        ctx.presentation.on_session_changed(&self.info());

        if self.state == SessionState::Idle
            && self
                .session_type
                .auto_start_count
                .is_some_and(|n| self.roster.len() >= n)
        {
            info!(key = %self.key, roster = self.roster.len(), "auto-starting session");
            self.advance(ctx)?;
        }
        Ok(spawn)
    }

    /// A player leaves.
    ///
    /// While the state allows leaving, the player is unregistered and their
    /// spawn returns to the pool. Otherwise leaving counts as an
    /// elimination.
    pub fn remove_player(
        &mut self,
        player: PlayerId,
        ctx: &mut SessionCtx<'_>,
    ) -> Result<Option<Transition>, SessionError> {
        if !self.roster.contains(&player) {
            return Err(SessionError::NotRegistered(player));
        }
        if self.state.behavior().can_leave {
            self.unregister(player, ctx);
            return Ok(None);
        }
        self.eliminate(player, ctx)
    }

    /// A player is out of the round. They keep their spawn point.
    ///
    /// While the round is live, the last elimination that leaves one
    /// survivor makes them the winner and ends the round; leaving nobody is
    /// a draw. Once the round is decided eliminations are only recorded and
    /// the winner can no longer be eliminated.
    pub fn eliminate(
        &mut self,
        player: PlayerId,
        ctx: &mut SessionCtx<'_>,
    ) -> Result<Option<Transition>, SessionError> {
        if !self.roster.contains(&player) {
            return Err(SessionError::NotRegistered(player));
        }
        if self.state.behavior().can_leave {
            self.unregister(player, ctx);
            return Ok(None);
        }
        if self.eliminated.contains(&player) || self.winner == Some(player) {
            return Ok(None);
        }

        self.eliminated.insert(player);
        info!(key = %self.key, %player, survivors = self.survivor_count(), "player eliminated");
        ctx.presentation.on_session_changed(&self.info());

        if !self.state.is_live() || !self.is_round_over() {
            return Ok(None);
        }
        self.advance_to(SessionState::Ending, ctx).map(Some)
    }

    /// Lets a player watch. Only eliminated players, or registered players
    /// without a spawn point, may spectate.
    pub fn add_spectator(
        &mut self,
        player: PlayerId,
        ctx: &mut SessionCtx<'_>,
    ) -> Result<(), SessionError> {
        if !self.roster.contains(&player) {
            return Err(SessionError::NotRegistered(player));
        }
        if !self.eliminated.contains(&player) && self.spawns.spawn_of(player).is_some() {
            return Err(SessionError::NotSpectatable(player));
        }
        if self.spectators.insert(player) {
            debug!(key = %self.key, %player, "player spectating");
            ctx.presentation.on_session_changed(&self.info());
        }
        Ok(())
    }

    fn unregister(&mut self, player: PlayerId, ctx: &mut SessionCtx<'_>) {
        self.roster.remove(&player);
        self.spectators.remove(&player);
        self.spawns.release(player);
        info!(key = %self.key, %player, roster = self.roster.len(), "player left");
        ctx.presentation.on_session_changed(&self.info());
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Reconciles and cancels every owned task handle.
    ///
    /// Handles whose job is missing or already cancelled are dropped with a
    /// warning. Live jobs get their cleanup hook first.
    /// The handle set is always empty afterwards.
    pub fn stop_tasks(&mut self, ctx: &mut SessionCtx<'_>) {
        for handle in self.tasks.drain(..) {
            let id = handle.id();
            match ctx.tasks.status(id) {
                JobStatus::Missing => {
                    warn!(key = %self.key, task = %id, "task handle has no scheduled job");
                }
                JobStatus::Cancelled => {
                    warn!(key = %self.key, task = %id, "task was already cancelled");
                }
                JobStatus::Live(_) => {
                    if let Some(job) = ctx.tasks.job_mut(id) {
                        job.cleanup(&self.key, ctx.presentation);
                    }
                    ctx.tasks.cancel(id);
                    debug!(key = %self.key, task = %id, kind = ?handle.kind(), "task cancelled");
                }
            }
        }
    }

    /// Runs one due task of this session and applies what it asked for.
    ///
    /// A task that belongs to an earlier state, to another session, or to a
    /// session being unloaded is cancelled without running. A task whose
    /// requested transition fails is cancelled as well, and the error is
    /// returned.
    pub fn run_task(
        &mut self,
        id: TaskId,
        ctx: &mut SessionCtx<'_>,
    ) -> Result<Option<Transition>, SessionError> {
        let Some(pos) = self.tasks.iter().position(|h| h.id() == id) else {
            warn!(key = %self.key, task = %id, "session does not own this task");
            ctx.tasks.cancel(id);
            return Ok(None);
        };
        if self.unloading || self.tasks[pos].tag().1 != self.state {
            debug!(key = %self.key, task = %id, "stale task dropped");
            self.tasks.swap_remove(pos);
            ctx.tasks.cancel(id);
            return Ok(None);
        }

        let Some(mut job) = ctx.tasks.checkout(id) else {
            return Ok(None);
        };
        let outcome = job.tick(self, ctx.presentation);
        if let Some(mut job) = ctx.tasks.checkin(id, job) {
            job.cleanup(&self.key, ctx.presentation);
        }

        let result = match outcome {
            TickOutcome::Continue => Ok(None),
            TickOutcome::Cancel => {
                self.cancel_task(id, ctx);
                Ok(None)
            }
            TickOutcome::Advance => self.advance(ctx).map(Some),
            TickOutcome::AdvanceTo(target) => self.advance_to(target, ctx).map(Some),
        };
        if let Err(err) = &result {
            warn!(key = %self.key, task = %id, error = %err, "task transition rejected, cancelling task");
            self.cancel_task(id, ctx);
        }
        result
    }

    fn cancel_task(&mut self, id: TaskId, ctx: &mut SessionCtx<'_>) {
        if let Some(pos) = self.tasks.iter().position(|h| h.id() == id) {
            let handle = self.tasks.swap_remove(pos);
            if let Some(job) = ctx.tasks.job_mut(id) {
                job.cleanup(&self.key, ctx.presentation);
            }
            handle.cancel();
        }
        ctx.tasks.cancel(id);
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// First step of unloading: flags the session, stops its tasks and
    /// returns everyone who has to be moved out of its world.
    ///
    /// Idempotent. A second call returns an empty list.
    pub fn begin_unload(&mut self, ctx: &mut SessionCtx<'_>) -> Vec<PlayerId> {
        if self.unloading {
            return Vec::new();
        }
        self.unloading = true;
        self.stop_tasks(ctx);

        let players: Vec<PlayerId> = self.roster.iter().copied().collect();
        info!(key = %self.key, players = players.len(), "session unloading");
        if !players.is_empty() {
            ctx.presentation.on_evacuate(&self.key, &players);
        }
        ctx.presentation.on_session_changed(&self.info());
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullPresentation;
    use crate::task::TaskKind;

    fn session(spawns: i32, auto_start: Option<usize>) -> Session {
        let t = SessionType {
            auto_start_count: auto_start,
            ..SessionType::default()
        };
        let mut s = Session::new(SessionKey::new("royale:test"), Arc::new(t));
        s.spawns_mut()
            .seed((0..spawns).map(|i| SpawnPoint::on_block(i, 64, 0)));
        s
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let s = session(2, None);
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.roster().is_empty());
        assert_eq!(s.winner(), None);
        assert!(!s.is_unloading());
        assert_eq!(s.info().total_spawns, 2);
    }

    #[test]
    fn test_advance_schedules_one_task_per_state() {
        let mut tasks = RoundTasks::new();
        let mut s = session(4, None);
        let mut ctx = SessionCtx::new(&mut tasks, &NullPresentation);
        for id in 1..=3 {
            s.add_player(PlayerId(id), &mut ctx).unwrap();
        }

        s.advance(&mut ctx).unwrap();
        assert_eq!(s.task_handles().len(), 1);
        assert_eq!(s.task_handles()[0].kind(), TaskKind::Start);

        s.advance(&mut ctx).unwrap();
        assert_eq!(s.task_handles().len(), 1);
        assert_eq!(s.task_handles()[0].kind(), TaskKind::Progress);
        assert_eq!(s.phase(), RunningPhase::Warmup);
        assert_eq!(tasks.live(), 1);
    }

    #[test]
    fn test_stop_tasks_drops_already_cancelled_handle() {
        let mut tasks = RoundTasks::new();
        let mut s = session(4, None);
        let mut ctx = SessionCtx::new(&mut tasks, &NullPresentation);
        s.add_player(PlayerId(1), &mut ctx).unwrap();
        s.add_player(PlayerId(2), &mut ctx).unwrap();
        s.advance(&mut ctx).unwrap();

        s.task_handles()[0].cancel();
        s.stop_tasks(&mut ctx);
        assert!(s.task_handles().is_empty());
    }

    #[test]
    fn test_stop_tasks_drops_handle_whose_job_is_gone() {
        let mut tasks = RoundTasks::new();
        let mut s = session(4, None);
        let mut ctx = SessionCtx::new(&mut tasks, &NullPresentation);
        s.add_player(PlayerId(1), &mut ctx).unwrap();
        s.add_player(PlayerId(2), &mut ctx).unwrap();
        s.advance(&mut ctx).unwrap();

        let id = s.task_handles()[0].id();
        assert!(ctx.tasks.cancel(id));
        assert_eq!(ctx.tasks.status(id), JobStatus::Missing);
        assert_eq!(s.task_handles().len(), 1);

        s.stop_tasks(&mut ctx);
        assert!(s.task_handles().is_empty());
        assert!(ctx.tasks.is_empty());

        // The session still schedules the next state's task normally.
        s.advance(&mut ctx).unwrap();
        assert_eq!(s.task_handles().len(), 1);
        assert_eq!(s.task_handles()[0].kind(), TaskKind::Progress);
    }

    #[test]
    fn test_begin_unload_is_idempotent() {
        let mut tasks = RoundTasks::new();
        let mut s = session(2, None);
        let mut ctx = SessionCtx::new(&mut tasks, &NullPresentation);
        s.add_player(PlayerId(1), &mut ctx).unwrap();

        assert_eq!(s.begin_unload(&mut ctx), vec![PlayerId(1)]);
        assert!(s.is_unloading());
        assert!(s.begin_unload(&mut ctx).is_empty());
        assert_eq!(
            s.add_player(PlayerId(2), &mut ctx),
            Err(SessionError::InvalidStateTransition {
                from: SessionState::Idle,
                to: SessionState::Idle,
            })
        );
    }
}
