//! `ArenaHost` builder: wires a provider, a pipeline and a presentation
//! into a running registry actor.

use std::sync::Arc;

use arena_clock::ClockConfig;
use arena_registry::{MutatorPipeline, RegistryConfig, RegistryHandle, ResourceProvider, spawn_registry};
use arena_session::{NullPresentation, Presentation};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::ArenaError;

/// Host settings, loadable from any serde format.
///
/// ```rust
/// let config: arena::ArenaConfig =
///     serde_json::from_str(r#"{ "clock": { "tick_rate_hz": 2 } }"#).unwrap();
/// assert_eq!(config.clock.tick_rate_hz, 2);
/// assert_eq!(config.registry.max_resource_extent, 100_000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub registry: RegistryConfig,
    pub clock: ClockConfig,
}

/// Builder for an [`ArenaHost`].
///
/// # Example
///
/// ```rust,ignore
/// use arena::prelude::*;
///
/// ArenaHost::init_tracing();
/// let host = ArenaHost::builder()
///     .tick_rate(1)
///     .presentation(Arc::new(MyPresentation))
///     .spawn(MyWorlds::new(), SpawnListPipeline::ring(8, 24.0, 64));
/// host.handle().create_session("royale:canyon", session_type, false).await?;
/// ```
pub struct ArenaHostBuilder {
    config: ArenaConfig,
    presentation: Arc<dyn Presentation>,
}

impl ArenaHostBuilder {
    /// Creates a builder with default settings and no presentation.
    pub fn new() -> Self {
        Self {
            config: ArenaConfig::default(),
            presentation: Arc::new(NullPresentation),
        }
    }

    /// Replaces all settings at once.
    pub fn config(mut self, config: ArenaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.config.registry = config;
        self
    }

    pub fn clock_config(mut self, config: ClockConfig) -> Self {
        self.config.clock = config;
        self
    }

    /// Sets the round clock rate. `0` turns the clock off; rounds then
    /// only advance through [`RegistryHandle::tick`].
    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.clock.tick_rate_hz = hz;
        self
    }

    pub fn presentation(mut self, presentation: Arc<dyn Presentation>) -> Self {
        self.presentation = presentation;
        self
    }

    /// Starts the host loop. Must be called from within a Tokio runtime.
    pub fn spawn<P, M>(self, provider: P, pipeline: M) -> ArenaHost
    where
        P: ResourceProvider,
        M: MutatorPipeline,
    {
        let ArenaConfig { registry, clock } = self.config;
        tracing::info!(
            tick_rate_hz = clock.tick_rate_hz,
            max_resource_extent = registry.max_resource_extent,
            "starting arena host"
        );
        let handle = spawn_registry(registry, clock, provider, pipeline, self.presentation);
        ArenaHost { handle }
    }
}

impl Default for ArenaHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Arena host.
///
/// All session work goes through [`handle()`](Self::handle). Dropping the
/// host and every handle clone stops the loop without unloading; call
/// [`shutdown()`](Self::shutdown) to release worlds first.
pub struct ArenaHost {
    handle: RegistryHandle,
}

impl ArenaHost {
    pub fn builder() -> ArenaHostBuilder {
        ArenaHostBuilder::new()
    }

    pub fn handle(&self) -> &RegistryHandle {
        &self.handle
    }

    /// Installs a `tracing` subscriber filtered by `RUST_LOG`, defaulting to
    /// `info`. Does nothing if a global subscriber is already set.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    /// Unloads every session and stops the host loop.
    pub async fn shutdown(self) -> Result<(), ArenaError> {
        self.handle.shutdown().await?;
        Ok(())
    }
}
