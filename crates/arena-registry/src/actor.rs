//! Registry host actor: one Tokio task that owns the registry and its
//! round clock.
//!
//! Everything that touches a session runs inside this task, one step at a
//! time, so sessions need no locks. The outside world talks to it through
//! a [`RegistryHandle`].

use std::sync::Arc;

use arena_clock::{ClockConfig, RoundClock};
use arena_session::{Presentation, SessionInfo, SessionType};
use arena_types::{PlayerId, SessionKey, SpawnPoint};
use tokio::sync::{mpsc, oneshot};

use crate::registry::{Completion, Reply};
use crate::{MutatorPipeline, RegistryConfig, RegistryError, ResourceProvider, SessionRegistry};

/// Commands sent to the registry actor.
///
/// Most carry a reply channel; the caller waits on it for the result.
pub(crate) enum RegistryCommand {
    Create {
        key: SessionKey,
        session_type: Arc<SessionType>,
        force: bool,
        reply: Reply<SessionInfo>,
    },
    Start {
        key: SessionKey,
        reply: Reply<SessionInfo>,
    },
    End {
        key: SessionKey,
        force: bool,
        reply: Reply<SessionInfo>,
    },
    Unload {
        key: SessionKey,
        reply: Reply<()>,
    },
    AddPlayer {
        key: SessionKey,
        player: PlayerId,
        reply: Reply<SpawnPoint>,
    },
    RemovePlayer {
        key: SessionKey,
        player: PlayerId,
        reply: Reply<SessionInfo>,
    },
    EliminatePlayer {
        key: SessionKey,
        player: PlayerId,
        reply: Reply<SessionInfo>,
    },
    AddSpectator {
        key: SessionKey,
        player: PlayerId,
        reply: Reply<()>,
    },
    Get {
        key: SessionKey,
        reply: oneshot::Sender<Option<SessionInfo>>,
    },
    List {
        reply: oneshot::Sender<Vec<SessionInfo>>,
    },
    /// Runs one tick by hand. Used with a manual clock.
    Tick { reply: oneshot::Sender<()> },
    /// Freezes or unfreezes the round clock. Replies whether anything
    /// changed.
    PauseClock { reply: oneshot::Sender<bool> },
    ResumeClock { reply: oneshot::Sender<bool> },
    /// Unloads everything and stops the actor.
    Shutdown { reply: oneshot::Sender<()> },
}

// ---------------------------------------------------------------------------
// RegistryHandle
// ---------------------------------------------------------------------------

/// Handle to a running registry actor.
///
/// Cheap to clone; it is just an `mpsc::Sender`. Every method fails with
/// [`RegistryError::Unavailable`] once the actor has stopped.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RegistryError::Unavailable)?;
        reply_rx.await.map_err(|_| RegistryError::Unavailable)
    }

    /// Creates a session for `key` once its world is loaded.
    ///
    /// Fails with `SessionAlreadyExists` for a taken key unless `force` is
    /// set, in which case the existing session must still be Idle.
    pub async fn create_session(
        &self,
        key: impl Into<SessionKey>,
        session_type: Arc<SessionType>,
        force: bool,
    ) -> Result<SessionInfo, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::Create {
            key,
            session_type,
            force,
            reply,
        })
        .await?
    }

    pub async fn start_session(&self, key: impl Into<SessionKey>) -> Result<SessionInfo, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::Start { key, reply }).await?
    }

    /// Ends the round (Ending), or stops it outright (ForceStop) with
    /// `force`.
    pub async fn end_session(
        &self,
        key: impl Into<SessionKey>,
        force: bool,
    ) -> Result<SessionInfo, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::End { key, force, reply })
            .await?
    }

    /// Tears the session down and waits for its world to be released.
    ///
    /// Succeeds immediately when there is nothing to unload or a release is
    /// already running.
    pub async fn unload_session(&self, key: impl Into<SessionKey>) -> Result<(), RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::Unload { key, reply }).await?
    }

    pub async fn add_player(
        &self,
        key: impl Into<SessionKey>,
        player: PlayerId,
    ) -> Result<SpawnPoint, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::AddPlayer { key, player, reply })
            .await?
    }

    pub async fn remove_player(
        &self,
        key: impl Into<SessionKey>,
        player: PlayerId,
    ) -> Result<SessionInfo, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::RemovePlayer { key, player, reply })
            .await?
    }

    pub async fn eliminate_player(
        &self,
        key: impl Into<SessionKey>,
        player: PlayerId,
    ) -> Result<SessionInfo, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::EliminatePlayer { key, player, reply })
            .await?
    }

    pub async fn add_spectator(
        &self,
        key: impl Into<SessionKey>,
        player: PlayerId,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::AddSpectator { key, player, reply })
            .await?
    }

    pub async fn get_session(
        &self,
        key: impl Into<SessionKey>,
    ) -> Result<Option<SessionInfo>, RegistryError> {
        let key = key.into();
        self.request(|reply| RegistryCommand::Get { key, reply }).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, RegistryError> {
        self.request(|reply| RegistryCommand::List { reply }).await
    }

    /// Runs one round tick now, regardless of the clock.
    pub async fn tick(&self) -> Result<(), RegistryError> {
        self.request(|reply| RegistryCommand::Tick { reply }).await
    }

    /// Stops the round clock. Rounds hold where they are while commands
    /// and manual ticks keep working. Returns `false` if it was already
    /// paused.
    pub async fn pause_clock(&self) -> Result<bool, RegistryError> {
        self.request(|reply| RegistryCommand::PauseClock { reply }).await
    }

    /// Restarts the round clock one full tick from now. Returns `false` if
    /// it was not paused.
    pub async fn resume_clock(&self) -> Result<bool, RegistryError> {
        self.request(|reply| RegistryCommand::ResumeClock { reply }).await
    }

    /// Unloads every session and stops the actor. World releases still in
    /// flight finish in the background.
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        self.request(|reply| RegistryCommand::Shutdown { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct RegistryActor<P: ResourceProvider, M: MutatorPipeline> {
    registry: SessionRegistry<P, M>,
    clock: RoundClock,
    commands: mpsc::Receiver<RegistryCommand>,
    completions: mpsc::UnboundedReceiver<Completion<P::Resource>>,
}

impl<P: ResourceProvider, M: MutatorPipeline> RegistryActor<P, M> {
    async fn run(mut self) {
        tracing::info!(
            tick_rate_hz = self.clock.tick_rate_hz(),
            manual = self.clock.is_manual(),
            "session registry started"
        );

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                Some(done) = self.completions.recv() => {
                    self.registry.complete(done);
                }
                _ = self.clock.wait_for_tick() => {
                    self.registry.tick();
                    self.clock.record_tick_end();
                }
            }
        }

        tracing::info!(sessions = self.registry.len(), "session registry stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle(&mut self, cmd: RegistryCommand) -> bool {
        match cmd {
            RegistryCommand::Create {
                key,
                session_type,
                force,
                reply,
            } => self.registry.create_session(key, session_type, force, reply),
            RegistryCommand::Start { key, reply } => {
                let _ = reply.send(self.registry.start_session(&key));
            }
            RegistryCommand::End { key, force, reply } => {
                let _ = reply.send(self.registry.end_session(&key, force));
            }
            RegistryCommand::Unload { key, reply } => {
                self.registry.unload_session(&key, Some(reply));
            }
            RegistryCommand::AddPlayer { key, player, reply } => {
                let _ = reply.send(self.registry.add_player(&key, player));
            }
            RegistryCommand::RemovePlayer { key, player, reply } => {
                let _ = reply.send(self.registry.remove_player(&key, player));
            }
            RegistryCommand::EliminatePlayer { key, player, reply } => {
                let _ = reply.send(self.registry.eliminate_player(&key, player));
            }
            RegistryCommand::AddSpectator { key, player, reply } => {
                let _ = reply.send(self.registry.add_spectator(&key, player));
            }
            RegistryCommand::Get { key, reply } => {
                let _ = reply.send(self.registry.get_session(&key));
            }
            RegistryCommand::List { reply } => {
                let _ = reply.send(self.registry.list_sessions());
            }
            RegistryCommand::Tick { reply } => {
                self.registry.tick();
                let _ = reply.send(());
            }
            RegistryCommand::PauseClock { reply } => {
                let changed = !self.clock.is_paused();
                self.clock.pause();
                if changed {
                    tracing::info!(tick = self.clock.tick_count(), "round clock paused");
                }
                let _ = reply.send(changed);
            }
            RegistryCommand::ResumeClock { reply } => {
                let changed = self.clock.is_paused();
                self.clock.resume();
                if changed {
                    tracing::info!(tick = self.clock.tick_count(), "round clock resumed");
                }
                let _ = reply.send(changed);
            }
            RegistryCommand::Shutdown { reply } => {
                tracing::info!("session registry shutting down");
                self.registry.unload_all();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }
}

/// Spawns the registry actor and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_registry<P, M>(
    config: RegistryConfig,
    clock: ClockConfig,
    provider: P,
    pipeline: M,
    presentation: Arc<dyn Presentation>,
) -> RegistryHandle
where
    P: ResourceProvider,
    M: MutatorPipeline,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_size.max(1));
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    let actor = RegistryActor {
        registry: SessionRegistry::new(config, Arc::new(provider), pipeline, presentation, done_tx),
        clock: RoundClock::new(clock),
        commands: cmd_rx,
        completions: done_rx,
    };
    tokio::spawn(actor.run());

    RegistryHandle { sender: cmd_tx }
}
