//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command/event channels, and
//! exposes a builder-based API for hosts to drive one scene.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use sim_content::ContentFactory;
use sim_core::{
    ConfigLibrary, Scene, SceneConfig, SceneEnv, SessionOracle, SimConfig, SystemClock, TileMap,
    Timestamp,
};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::{Event, EventBus, LifecycleEvent};
use crate::oracle::ChannelSessionOracle;
use crate::workers::{Command, SimulationWorker, WorkerSettings};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Used for scenes given directly to the builder; content-loaded scenes
    /// read their own `config.toml`.
    pub sim: SimConfig,
    pub tick_interval: Duration,
    /// Radius of the replication area around each occupant's pawn.
    pub interest_radius: f32,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Tick on `tick_interval` without waiting for tick commands.
    pub auto_tick: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            tick_interval: Duration::from_millis(100),
            interest_radius: 16.0,
            event_buffer_size: 100,
            command_buffer_size: 32,
            auto_tick: true,
        }
    }
}

/// Where the worker's scene comes from; rebuilt on every reload.
pub(crate) enum SceneSource {
    Config {
        sim: SimConfig,
        library: ConfigLibrary,
        scene: SceneConfig,
        map: Option<Arc<TileMap>>,
    },
    Content {
        factory: ContentFactory,
        name: String,
    },
}

impl SceneSource {
    /// Builds a fresh, unstarted scene wired to the given session oracle.
    pub(crate) fn build(&self, sessions: Arc<dyn SessionOracle>) -> Result<Scene> {
        match self {
            SceneSource::Config {
                sim,
                library,
                scene,
                map,
            } => {
                let env = match map {
                    Some(map) => SceneEnv::with_map(map.clone()),
                    None => SceneEnv::empty().with_clock(Arc::new(SystemClock)),
                };
                Ok(Scene::new(
                    sim.clone(),
                    library.clone(),
                    scene,
                    env.with_sessions(sessions),
                ))
            }
            SceneSource::Content { factory, name } => {
                Ok(factory.build_scene(name, Some(sessions))?)
            }
        }
    }
}

/// Main runtime that hosts one scene.
///
/// Design: Runtime owns the worker task.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Shutdown the runtime gracefully
    ///
    /// Stops the scene, then waits for the worker task to finish.
    pub async fn shutdown(self) -> Result<Timestamp> {
        let timestamp = self.handle.shutdown().await?;
        drop(self.handle);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(timestamp)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    scene: Option<(SceneConfig, ConfigLibrary)>,
    map: Option<Arc<TileMap>>,
    content: Option<(ContentFactory, String)>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            scene: None,
            map: None,
            content: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Host a scene described in memory.
    pub fn scene(mut self, scene: SceneConfig, library: ConfigLibrary) -> Self {
        self.scene = Some((scene, library));
        self
    }

    /// Collision and pathfinding for an in-memory scene.
    pub fn map(mut self, map: TileMap) -> Self {
        self.map = Some(Arc::new(map));
        self
    }

    /// Host a scene loaded from a content directory. Takes precedence over
    /// [`RuntimeBuilder::scene`].
    pub fn content(mut self, factory: ContentFactory, scene: impl Into<String>) -> Self {
        self.content = Some((factory, scene.into()));
        self
    }

    /// Build the runtime
    ///
    /// Builds and starts the scene, then spawns the worker that owns it.
    pub async fn build(self) -> Result<Runtime> {
        let source = match (self.content, self.scene) {
            (Some((factory, name)), _) => SceneSource::Content { factory, name },
            (None, Some((scene, library))) => SceneSource::Config {
                sim: self.config.sim.clone(),
                library,
                scene,
                map: self.map,
            },
            (None, None) => return Err(RuntimeError::MissingScene),
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let oracle: Arc<dyn SessionOracle> = Arc::new(ChannelSessionOracle::new(event_bus.clone()));

        let mut scene = source.build(oracle.clone())?;
        scene.start(Timestamp::ZERO)?;
        event_bus.publish(Event::Lifecycle(LifecycleEvent::Started {
            scene: scene.name().to_owned(),
            timestamp: scene.now(),
        }));

        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        let settings = WorkerSettings {
            tick_interval: self.config.tick_interval,
            interest_radius: self.config.interest_radius,
            auto_tick: self.config.auto_tick,
        };
        let sim_worker = SimulationWorker::new(scene, source, oracle, command_rx, event_bus, settings);

        let sim_worker_handle = tokio::spawn(async move {
            sim_worker.run().await;
        });

        Ok(Runtime {
            handle,
            sim_worker_handle,
        })
    }
}
