//! End-to-end tests through `ArenaHost` with an in-memory world store.

use std::collections::HashSet;
use std::sync::Mutex;

use arena::prelude::*;

// =========================================================================
// In-memory worlds
// =========================================================================

#[derive(Clone, Default)]
struct MemoryWorlds {
    loaded: Arc<Mutex<HashSet<SessionKey>>>,
}

impl ResourceProvider for MemoryWorlds {
    type Resource = SessionKey;

    async fn acquire(&self, key: &SessionKey) -> Result<SessionKey, RegistryError> {
        self.loaded.lock().unwrap().insert(key.clone());
        Ok(key.clone())
    }

    async fn release(&self, world: SessionKey) -> bool {
        self.loaded.lock().unwrap().remove(&world)
    }

    fn is_available(&self, world: &SessionKey) -> bool {
        self.loaded.lock().unwrap().contains(world)
    }

    fn extent(&self, _world: &SessionKey) -> u64 {
        256
    }

    fn evacuate(&self, _world: &SessionKey, _players: &[PlayerId]) {}
}

// =========================================================================
// Helpers
// =========================================================================

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn manual_host(worlds: &MemoryWorlds, spawns: usize) -> ArenaHost {
    ArenaHost::builder()
        .tick_rate(0)
        .spawn(worlds.clone(), SpawnListPipeline::ring(spawns, 16.0, 64))
}

async fn state_of(host: &ArenaHost, key: &str) -> SessionState {
    host.handle().get_session(key).await.unwrap().unwrap().state
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_four_players_last_survivor_wins() {
    let worlds = MemoryWorlds::default();
    let host = manual_host(&worlds, 4);
    let handle = host.handle();
    let session_type = Arc::new(SessionType {
        auto_start_count: None,
        ..SessionType::default()
    });
    handle.create_session("royale:four", session_type, false).await.unwrap();
    for id in 1..=4 {
        handle.add_player("royale:four", pid(id)).await.unwrap();
    }
    assert_eq!(state_of(&host, "royale:four").await, SessionState::Idle);
    handle.start_session("royale:four").await.unwrap();

    for id in 1..=3 {
        handle.eliminate_player("royale:four", pid(id)).await.unwrap();
    }
    let info = handle.get_session("royale:four").await.unwrap().unwrap();
    assert_eq!(info.state, SessionState::Ending);
    assert_eq!(info.winner, Some(pid(4)));
    assert_eq!(info.free_spawns + info.roster, info.total_spawns);
}

#[tokio::test]
async fn test_auto_start_then_countdown_reaches_running() {
    let worlds = MemoryWorlds::default();
    let host = manual_host(&worlds, 2);
    let handle = host.handle();
    let session_type = Arc::new(SessionType {
        countdown_length: 3,
        auto_start_count: Some(2),
        ..SessionType::default()
    });
    handle.create_session("royale:duel", session_type, false).await.unwrap();

    handle.add_player("royale:duel", pid(1)).await.unwrap();
    let info = handle.get_session("royale:duel").await.unwrap().unwrap();
    assert_eq!((info.roster, info.state), (1, SessionState::Idle));

    handle.add_player("royale:duel", pid(2)).await.unwrap();
    assert_eq!(state_of(&host, "royale:duel").await, SessionState::Starting);

    for _ in 0..2 {
        handle.tick().await.unwrap();
        assert_eq!(state_of(&host, "royale:duel").await, SessionState::Starting);
    }
    handle.tick().await.unwrap();
    assert_eq!(state_of(&host, "royale:duel").await, SessionState::Running);
}

#[tokio::test]
async fn test_double_unload_reports_success() {
    let worlds = MemoryWorlds::default();
    let host = manual_host(&worlds, 2);
    let handle = host.handle();
    handle
        .create_session("royale:gone", Arc::new(SessionType::default()), false)
        .await
        .unwrap();

    handle.unload_session("royale:gone").await.unwrap();
    handle.unload_session("royale:gone").await.unwrap();
    assert!(handle.get_session("royale:gone").await.unwrap().is_none());
    assert!(worlds.loaded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_errors_convert_into_arena_error() {
    async fn join(host: &ArenaHost) -> Result<SpawnPoint, ArenaError> {
        Ok(host.handle().add_player("royale:missing", PlayerId(1)).await?)
    }

    let worlds = MemoryWorlds::default();
    let host = manual_host(&worlds, 2);
    let err = join(&host).await.unwrap_err();
    assert!(matches!(
        err,
        ArenaError::Registry(RegistryError::UnknownSession(_))
    ));
}

#[tokio::test]
async fn test_shutdown_releases_worlds() {
    let worlds = MemoryWorlds::default();
    let host = manual_host(&worlds, 2);
    let handle = host.handle().clone();
    handle
        .create_session("royale:a", Arc::new(SessionType::default()), false)
        .await
        .unwrap();

    host.shutdown().await.unwrap();
    for _ in 0..100 {
        if worlds.loaded.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(worlds.loaded.lock().unwrap().is_empty());
    assert_eq!(handle.list_sessions().await.unwrap_err(), RegistryError::Unavailable);
}

#[test]
fn test_config_from_json_fills_defaults() {
    let config: ArenaConfig = serde_json::from_str(
        r#"{ "registry": { "max_resource_extent": 4096 }, "clock": { "tick_rate_hz": 4 } }"#,
    )
    .unwrap();
    assert_eq!(config.registry.max_resource_extent, 4096);
    assert_eq!(config.registry.channel_size, RegistryConfig::default().channel_size);
    assert_eq!(config.clock.tick_rate_hz, 4);
}

#[test]
fn test_init_tracing_twice_is_harmless() {
    ArenaHost::init_tracing();
    ArenaHost::init_tracing();
}
