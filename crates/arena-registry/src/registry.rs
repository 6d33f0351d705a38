//! The session registry: every session of one host, keyed by world.
//!
//! The registry itself is synchronous and owned by the host actor (see
//! [`spawn_registry`](crate::spawn_registry)). The two asynchronous steps,
//! acquiring and releasing worlds, run in spawned tasks that report back
//! as [`Completion`]s on a channel the actor drains.
//!
//! Keys go through these slots:
//!
//! ```text
//! (absent) → Pending → Live → Live(unloading, release in flight) → (absent)
//!                ↘ (absent) on failed or cancelled acquisition
//! ```
//!
//! A key is reserved as `Pending` before acquisition starts, so two
//! creations for the same key can never both succeed.

use std::collections::BTreeMap;
use std::sync::Arc;

use arena_session::{
    Presentation, RoundTasks, Session, SessionCtx, SessionError, SessionInfo, SessionState,
    SessionType,
};
use arena_types::{PlayerId, SessionKey, SpawnPoint};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{MutatorPipeline, RegistryError, ResourceProvider};

/// Reply channel for a registry request.
pub(crate) type Reply<T> = oneshot::Sender<Result<T, RegistryError>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Worlds larger than this (in blocks) are refused.
    pub max_resource_extent: u64,
    /// Capacity of the host actor's command channel.
    pub channel_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_resource_extent: 100_000,
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseState {
    NotStarted,
    InFlight,
    Failed,
}

struct Entry<R> {
    session: Session,
    resource: R,
    release: ReleaseState,
    release_reply: Option<Reply<()>>,
}

enum Slot<R> {
    /// Acquisition in flight. `cancelled` is set by an unload that arrived
    /// before the world did.
    Pending { generation: u64, cancelled: bool },
    Live { generation: u64, entry: Box<Entry<R>> },
}

/// Results of spawned acquire and release tasks.
pub(crate) enum Completion<R> {
    Acquired {
        key: SessionKey,
        generation: u64,
        session_type: Arc<SessionType>,
        result: Result<R, RegistryError>,
        reply: Reply<SessionInfo>,
    },
    Released {
        key: SessionKey,
        generation: u64,
        released: bool,
    },
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Owns every session of a host, their worlds and the shared task table.
pub struct SessionRegistry<P: ResourceProvider, M: MutatorPipeline> {
    config: RegistryConfig,
    provider: Arc<P>,
    pipeline: M,
    presentation: Arc<dyn Presentation>,
    sessions: BTreeMap<SessionKey, Slot<P::Resource>>,
    tasks: RoundTasks,
    next_generation: u64,
    completions: mpsc::UnboundedSender<Completion<P::Resource>>,
}

impl<P: ResourceProvider, M: MutatorPipeline> SessionRegistry<P, M> {
    pub(crate) fn new(
        config: RegistryConfig,
        provider: Arc<P>,
        pipeline: M,
        presentation: Arc<dyn Presentation>,
        completions: mpsc::UnboundedSender<Completion<P::Resource>>,
    ) -> Self {
        Self {
            config,
            provider,
            pipeline,
            presentation,
            sessions: BTreeMap::new(),
            tasks: RoundTasks::new(),
            next_generation: 1,
            completions,
        }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Reserves `key` and starts acquiring its world. The reply is sent once
    /// the session is open, or as soon as the request is refused.
    ///
    /// `force` replaces an existing Idle session. Keys with a creation or
    /// release in flight are never replaced.
    pub(crate) fn create_session(
        &mut self,
        key: SessionKey,
        session_type: Arc<SessionType>,
        force: bool,
        reply: Reply<SessionInfo>,
    ) {
        if let Err(err) = self.reserve(&key, force) {
            debug!(%key, error = %err, "create refused");
            let _ = reply.send(Err(err));
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.sessions.insert(
            key.clone(),
            Slot::Pending {
                generation,
                cancelled: false,
            },
        );
        info!(%key, session_type = %session_type.name, "creating session");

        let provider = Arc::clone(&self.provider);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = provider.acquire(&key).await;
            let _ = completions.send(Completion::Acquired {
                key,
                generation,
                session_type,
                result,
                reply,
            });
        });
    }

    /// Checks that `key` may be (re)created and clears out a forced Idle
    /// session.
    fn reserve(&mut self, key: &SessionKey, force: bool) -> Result<(), RegistryError> {
        let entry = match self.sessions.get_mut(key) {
            None => return Ok(()),
            Some(Slot::Pending { .. }) => {
                return Err(RegistryError::SessionAlreadyExists(key.clone()));
            }
            Some(Slot::Live { entry, .. }) => entry,
        };
        if !force {
            return Err(RegistryError::SessionAlreadyExists(key.clone()));
        }
        let state = entry.session.state();
        if state != SessionState::Idle {
            return Err(SessionError::InvalidStateTransition {
                from: state,
                to: SessionState::Idle,
            }
            .into());
        }
        if entry.session.is_unloading() {
            return Err(RegistryError::SessionAlreadyExists(key.clone()));
        }

        // The replaced session's world is released in the background; its
        // completion no longer matches the key's generation.
        let mut ctx = SessionCtx::new(&mut self.tasks, &*self.presentation);
        let players = entry.session.begin_unload(&mut ctx);
        if !players.is_empty() {
            self.provider.evacuate(&entry.resource, &players);
        }
        info!(%key, "replacing idle session");
        if let Some(Slot::Live { generation, entry }) = self.sessions.remove(key) {
            self.spawn_release(key.clone(), generation, entry.resource);
        }
        Ok(())
    }

    /// Opens the session once its world has arrived.
    fn finish_create(
        &mut self,
        key: SessionKey,
        generation: u64,
        session_type: Arc<SessionType>,
        result: Result<P::Resource, RegistryError>,
    ) -> Result<SessionInfo, RegistryError> {
        let cancelled = match self.sessions.get(&key) {
            Some(Slot::Pending {
                generation: g,
                cancelled,
            }) if *g == generation => *cancelled,
            _ => true,
        };

        let resource = match result {
            Ok(resource) => resource,
            Err(err) => {
                warn!(%key, error = %err, "world acquisition failed");
                self.drop_pending(&key, generation);
                return Err(err);
            }
        };

        let refusal = if cancelled {
            Some(RegistryError::ResourceUnavailable(format!(
                "session {key} was unloaded during creation"
            )))
        } else {
            let extent = self.provider.extent(&resource);
            (extent > self.config.max_resource_extent).then(|| {
                RegistryError::ResourceUnavailable(format!(
                    "world {key} extent {extent} exceeds limit {}",
                    self.config.max_resource_extent
                ))
            })
        };
        if let Some(err) = refusal {
            warn!(%key, error = %err, "refusing acquired world");
            self.drop_pending(&key, generation);
            self.spawn_release(key, generation, resource);
            return Err(err);
        }

        let mut session = Session::new(key.clone(), session_type);
        self.pipeline.seed(&mut session);
        if session.spawns().total() == 0 {
            let err = RegistryError::ResourceUnavailable(format!("world {key} has no spawn points"));
            warn!(%key, "mutator pipeline left no spawn points");
            self.drop_pending(&key, generation);
            self.spawn_release(key, generation, resource);
            return Err(err);
        }

        let info = session.info();
        info!(%key, spawns = info.total_spawns, "session created");
        self.presentation.on_session_changed(&info);
        self.sessions.insert(
            key,
            Slot::Live {
                generation,
                entry: Box::new(Entry {
                    session,
                    resource,
                    release: ReleaseState::NotStarted,
                    release_reply: None,
                }),
            },
        );
        Ok(info)
    }

    fn drop_pending(&mut self, key: &SessionKey, generation: u64) {
        if matches!(self.sessions.get(key), Some(Slot::Pending { generation: g, .. }) if *g == generation) {
            self.sessions.remove(key);
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Moves the session to Starting.
    pub fn start_session(&mut self, key: &SessionKey) -> Result<SessionInfo, RegistryError> {
        self.with_session(key, |session, ctx| {
            session.advance_to(SessionState::Starting, ctx)?;
            Ok(session.info())
        })
    }

    /// Moves the session to Ending, or to ForceStop when `force` is set.
    pub fn end_session(&mut self, key: &SessionKey, force: bool) -> Result<SessionInfo, RegistryError> {
        let target = if force {
            SessionState::ForceStop
        } else {
            SessionState::Ending
        };
        self.with_session(key, |session, ctx| {
            session.advance_to(target, ctx)?;
            Ok(session.info())
        })
    }

    /// Tears a session down: stops its tasks, evacuates its players and
    /// releases its world. The entry is removed once the world is released.
    ///
    /// Succeeds without doing anything when the key is absent or a release
    /// is already in flight. After a failed release the entry stays so the
    /// call can be retried.
    pub(crate) fn unload_session(&mut self, key: &SessionKey, reply: Option<Reply<()>>) {
        let (generation, entry) = match self.sessions.get_mut(key) {
            None => {
                debug!(%key, "unload of absent session");
                send(reply, Ok(()));
                return;
            }
            Some(Slot::Pending { cancelled, .. }) => {
                info!(%key, "unload cancels pending creation");
                *cancelled = true;
                send(reply, Ok(()));
                return;
            }
            Some(Slot::Live { generation, entry }) => (*generation, entry),
        };
        if entry.release == ReleaseState::InFlight {
            debug!(%key, "release already in flight");
            send(reply, Ok(()));
            return;
        }

        let mut ctx = SessionCtx::new(&mut self.tasks, &*self.presentation);
        let players = entry.session.begin_unload(&mut ctx);
        if !players.is_empty() {
            self.provider.evacuate(&entry.resource, &players);
        }
        if entry.release == ReleaseState::Failed {
            info!(%key, "retrying world release");
        }
        entry.release = ReleaseState::InFlight;
        entry.release_reply = reply;
        let resource = entry.resource.clone();
        self.spawn_release(key.clone(), generation, resource);
    }

    fn finish_release(&mut self, key: SessionKey, generation: u64, released: bool) {
        let entry = match self.sessions.get_mut(&key) {
            Some(Slot::Live { generation: g, entry }) if *g == generation => entry,
            _ => {
                if released {
                    debug!(%key, "released world of a replaced session");
                } else {
                    warn!(%key, "failed to release world of a replaced session");
                }
                return;
            }
        };

        if released {
            let reply = entry.release_reply.take();
            self.sessions.remove(&key);
            info!(%key, "session unloaded");
            send(reply, Ok(()));
        } else {
            warn!(%key, "world release failed, session kept for retry");
            entry.release = ReleaseState::Failed;
            send(
                entry.release_reply.take(),
                Err(RegistryError::ResourceUnavailable(format!("failed to release world {key}"))),
            );
        }
    }

    fn spawn_release(&self, key: SessionKey, generation: u64, resource: P::Resource) {
        let provider = Arc::clone(&self.provider);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let released = provider.release(resource).await;
            let _ = completions.send(Completion::Released {
                key,
                generation,
                released,
            });
        });
    }

    /// Applies the result of a spawned acquire or release.
    pub(crate) fn complete(&mut self, completion: Completion<P::Resource>) {
        match completion {
            Completion::Acquired {
                key,
                generation,
                session_type,
                result,
                reply,
            } => {
                let result = self.finish_create(key, generation, session_type, result);
                let _ = reply.send(result);
            }
            Completion::Released {
                key,
                generation,
                released,
            } => self.finish_release(key, generation, released),
        }
    }

    /// Unloads every session and cancels pending creations.
    pub(crate) fn unload_all(&mut self) {
        let keys: Vec<SessionKey> = self.sessions.keys().cloned().collect();
        for key in keys {
            self.unload_session(&key, None);
        }
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    pub fn add_player(&mut self, key: &SessionKey, player: PlayerId) -> Result<SpawnPoint, RegistryError> {
        self.with_session(key, |session, ctx| session.add_player(player, ctx))
    }

    pub fn remove_player(&mut self, key: &SessionKey, player: PlayerId) -> Result<SessionInfo, RegistryError> {
        self.with_session(key, |session, ctx| {
            session.remove_player(player, ctx)?;
            Ok(session.info())
        })
    }

    pub fn eliminate_player(&mut self, key: &SessionKey, player: PlayerId) -> Result<SessionInfo, RegistryError> {
        self.with_session(key, |session, ctx| {
            session.eliminate(player, ctx)?;
            Ok(session.info())
        })
    }

    pub fn add_spectator(&mut self, key: &SessionKey, player: PlayerId) -> Result<(), RegistryError> {
        self.with_session(key, |session, ctx| session.add_spectator(player, ctx))
    }

    /// Runs `f` against a live session and unloads it if `f` left it in a
    /// terminal state.
    fn with_session<T>(
        &mut self,
        key: &SessionKey,
        f: impl FnOnce(&mut Session, &mut SessionCtx<'_>) -> Result<T, SessionError>,
    ) -> Result<T, RegistryError> {
        let entry = match self.sessions.get_mut(key) {
            Some(Slot::Live { entry, .. }) if !entry.session.is_unloading() => entry,
            _ => return Err(RegistryError::UnknownSession(key.clone())),
        };
        let mut ctx = SessionCtx::new(&mut self.tasks, &*self.presentation);
        let result = f(&mut entry.session, &mut ctx);
        if entry.session.state().is_terminal() {
            self.unload_session(key, None);
        }
        Ok(result?)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of a live session. Pending creations are not visible.
    pub fn get_session(&self, key: &SessionKey) -> Option<SessionInfo> {
        match self.sessions.get(key)? {
            Slot::Live { entry, .. } => Some(entry.session.info()),
            Slot::Pending { .. } => None,
        }
    }

    /// Snapshots of every live session, in key order.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .values()
            .filter_map(|slot| match slot {
                Slot::Live { entry, .. } => Some(entry.session.info()),
                Slot::Pending { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// One clock tick: runs every due round task against its session.
    ///
    /// Tasks whose session is gone are cancelled. A session whose world
    /// vanished is force-stopped. Sessions that reach a terminal state are
    /// unloaded after all tasks have run.
    pub fn tick(&mut self) {
        let mut finished = Vec::new();

        for (id, (key, _)) in self.tasks.advance() {
            let entry = match self.sessions.get_mut(&key) {
                Some(Slot::Live { entry, .. }) if !entry.session.is_unloading() => entry,
                _ => {
                    warn!(%key, task = %id, "task outlived its session, cancelling");
                    self.tasks.cancel(id);
                    continue;
                }
            };

            let mut ctx = SessionCtx::new(&mut self.tasks, &*self.presentation);
            if !self.provider.is_available(&entry.resource) {
                warn!(%key, task = %id, "world is no longer available, stopping session");
                if let Err(err) = entry.session.force_stop(&mut ctx) {
                    warn!(%key, error = %err, "force stop rejected");
                    ctx.tasks.cancel(id);
                }
            } else if let Err(err) = entry.session.run_task(id, &mut ctx) {
                warn!(%key, task = %id, error = %err, "round task failed");
            }

            if entry.session.state().is_terminal() {
                finished.push(key);
            }
        }

        for key in finished {
            self.unload_session(&key, None);
        }
    }

    #[cfg(test)]
    fn generation_of(&self, key: &SessionKey) -> Option<u64> {
        self.sessions.get(key).map(|slot| match slot {
            Slot::Pending { generation, .. } | Slot::Live { generation, .. } => *generation,
        })
    }
}

fn send<T>(reply: Option<Reply<T>>, result: Result<T, RegistryError>) {
    if let Some(reply) = reply {
        let _ = reply.send(result);
    }
}
