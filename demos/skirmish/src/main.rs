use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use arena::prelude::*;
use arena::session::{Blast, HostileSpawn, TimeIndicator};

// ---------------------------------------------------------------------------
// In-memory worlds
// ---------------------------------------------------------------------------

/// Pretends to load a world per key. Nothing is ever written to disk.
#[derive(Clone, Default)]
struct DemoWorlds {
    loaded: Arc<Mutex<HashSet<SessionKey>>>,
}

impl ResourceProvider for DemoWorlds {
    type Resource = SessionKey;

    async fn acquire(&self, key: &SessionKey) -> Result<SessionKey, RegistryError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| RegistryError::ResourceUnavailable("world store poisoned".into()))?;
        loaded.insert(key.clone());
        tracing::info!(%key, "world loaded");
        Ok(key.clone())
    }

    async fn release(&self, world: SessionKey) -> bool {
        let released = match self.loaded.lock() {
            Ok(mut loaded) => loaded.remove(&world),
            Err(_) => false,
        };
        tracing::info!(key = %world, released, "world unloaded");
        released
    }

    fn is_available(&self, world: &SessionKey) -> bool {
        self.loaded.lock().is_ok_and(|loaded| loaded.contains(world))
    }

    fn extent(&self, _world: &SessionKey) -> u64 {
        512
    }

    fn evacuate(&self, world: &SessionKey, players: &[PlayerId]) {
        tracing::info!(key = %world, count = players.len(), "players sent to the lobby");
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Writes everything a player would see to the log.
struct LogPresentation;

impl Presentation for LogPresentation {
    fn on_session_changed(&self, info: &SessionInfo) {
        tracing::info!(
            key = %info.key,
            state = %info.state,
            roster = info.roster,
            survivors = info.survivors,
            "session changed"
        );
    }

    fn on_countdown(&self, key: &SessionKey, remaining: u64) {
        tracing::info!(%key, "starting in {remaining}");
    }

    fn on_round_start(&self, key: &SessionKey) {
        tracing::info!(%key, "fight!");
    }

    fn on_time_indicator(&self, key: &SessionKey, indicator: &TimeIndicator) {
        tracing::debug!(%key, title = %indicator.title, label = %indicator.label, "time indicator");
    }

    fn on_hostile_spawn(&self, key: &SessionKey, spawn: &HostileSpawn) {
        tracing::info!(%key, target = %spawn.target, kind = ?spawn.kind, "hostile spawned");
    }

    fn on_blast(&self, key: &SessionKey, blast: &Blast) {
        tracing::info!(%key, target = %blast.target, radius = blast.radius, "blast");
    }

    fn on_outcome(&self, key: &SessionKey, outcome: &Outcome) {
        match outcome {
            Outcome::Winner(player) => tracing::info!(%key, %player, "winner"),
            Outcome::Draw => tracing::info!(%key, "draw"),
        }
    }

    fn on_loadout(&self, key: &SessionKey, player: PlayerId, spawn: SpawnPoint, items: &[LoadoutItem]) {
        tracing::info!(%key, %player, %spawn, items = items.len(), "loadout handed out");
    }
}

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ArenaHost::init_tracing();

    let host = ArenaHost::builder()
        .tick_rate(ClockConfig::MAX_TICK_RATE_HZ)
        .presentation(Arc::new(LogPresentation))
        .spawn(DemoWorlds::default(), SpawnListPipeline::ring(6, 24.0, 64));
    let handle = host.handle().clone();

    let key = SessionKey::new("skirmish:canyon");
    let session_type = Arc::new(SessionType {
        name: "Skirmish".into(),
        countdown_length: 3,
        round_length: Some(20),
        overtime: Some(40),
        pressure: PressureMode::Cleanup,
        cleanup_grace: 10,
        end_length: Some(5),
        auto_start_count: Some(4),
        ..SessionType::default()
    });
    handle.create_session(key.clone(), session_type, false).await?;

    let players: Vec<PlayerId> = (1..=4).map(PlayerId).collect();
    for &player in &players {
        handle.add_player(key.clone(), player).await?;
    }

    // Knock players out one by one until a single survivor is left.
    for &player in &players[..players.len() - 1] {
        tokio::time::sleep(Duration::from_millis(600)).await;
        let info = handle.eliminate_player(key.clone(), player).await?;
        if let Err(err) = handle.add_spectator(key.clone(), player).await {
            tracing::debug!(%player, error = %err, "spectating refused");
        }
        if info.state >= SessionState::Ending {
            break;
        }
    }

    let mut last = None;
    while let Some(info) = handle.get_session(key.clone()).await? {
        last = Some(info);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if let Some(info) = last {
        let summary = serde_json::to_string(&info)?;
        tracing::info!(%summary, "round finished");
    }

    host.shutdown().await?;
    Ok(())
}
