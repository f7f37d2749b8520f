//! Simulation worker that owns the authoritative [`sim_core::Scene`].
//!
//! Receives commands from [`crate::RuntimeHandle`], advances the scene on a
//! tokio interval (or on explicit tick commands), and publishes replication
//! frames to the [`EventBus`] after every tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use sim_core::{
    ActorId, ActorSnapshot, EntityKey, InputFrame, Scene, SessionId, SessionOracle, Shape,
    SpawnOrigin, Timestamp, Transform,
};

use crate::api::{Result, RuntimeError};
use crate::events::{Event, EventBus, LifecycleEvent, ReplicationEvent, SessionEvent};
use crate::runtime::SceneSource;

/// Closure run against the live scene on the worker task.
pub type SceneQuery = Box<dyn FnOnce(&mut Scene) + Send>;

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Advance the scene. Without a timestamp the worker's clock is used.
    Tick {
        timestamp: Option<Timestamp>,
        reply: oneshot::Sender<Result<Timestamp>>,
    },
    /// Spawn a pawn for a session and bind the session to it.
    Enter {
        session: SessionId,
        config: String,
        transform: Transform,
        reply: oneshot::Sender<Result<ActorId>>,
    },
    /// Unbind a session and destroy its pawn.
    Leave {
        session: SessionId,
        reply: oneshot::Sender<Result<ActorId>>,
    },
    SubmitInput {
        session: SessionId,
        frame: InputFrame,
        reply: oneshot::Sender<Result<bool>>,
    },
    Signal {
        target: EntityKey,
        name: String,
        activator: Option<EntityKey>,
        reply: oneshot::Sender<bool>,
    },
    /// Client request from a session's pawn to a scene entity.
    Request {
        session: SessionId,
        target: EntityKey,
        name: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    Snapshot {
        actor: ActorId,
        reply: oneshot::Sender<Option<ActorSnapshot>>,
    },
    Occupants {
        reply: oneshot::Sender<Vec<(SessionId, ActorId)>>,
    },
    Query(SceneQuery),
    /// Rebuild the scene from its source and carry the live state over.
    Reload {
        reply: oneshot::Sender<Result<usize>>,
    },
    Shutdown {
        reply: oneshot::Sender<Timestamp>,
    },
}

/// Worker settings derived from [`crate::RuntimeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub tick_interval: Duration,
    pub interest_radius: f32,
    pub auto_tick: bool,
}

/// Background task that owns the scene and processes commands.
pub struct SimulationWorker {
    scene: Scene,
    source: SceneSource,
    oracle: Arc<dyn SessionOracle>,
    sessions: BTreeMap<SessionId, ActorId>,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    settings: WorkerSettings,
    origin: Instant,
}

impl SimulationWorker {
    /// Creates a new simulation worker around a started scene.
    pub fn new(
        scene: Scene,
        source: SceneSource,
        oracle: Arc<dyn SessionOracle>,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        settings: WorkerSettings,
    ) -> Self {
        info!(
            target: "runtime::worker",
            scene = %scene.name(),
            actors = scene.actors().count(),
            tick_ms = settings.tick_interval.as_millis() as u64,
            auto_tick = settings.auto_tick,
            "SimulationWorker initialized"
        );

        Self {
            scene,
            source,
            oracle,
            sessions: BTreeMap::new(),
            command_rx,
            event_bus,
            settings,
            origin: Instant::now(),
        }
    }

    /// Main worker loop.
    ///
    /// Exits when every handle is dropped or a shutdown command arrives; the
    /// scene is shut down either way.
    pub async fn run(mut self) {
        let period = self.settings.tick_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if let Some(reply) = self.handle_command(cmd) {
                        let timestamp = self.stop();
                        if reply.send(timestamp).is_err() {
                            debug!(target: "runtime::worker", "Shutdown reply channel closed (caller dropped)");
                        }
                        return;
                    }
                }
                _ = ticker.tick(), if self.settings.auto_tick => {
                    let timestamp = self.clock_now();
                    if let Err(error) = self.advance(timestamp) {
                        warn!(target: "runtime::worker", %error, "Scheduled tick failed");
                    }
                }
            }
        }

        self.stop();
    }

    /// Handles one command; returns the reply sender when it asks to shut down.
    fn handle_command(&mut self, cmd: Command) -> Option<oneshot::Sender<Timestamp>> {
        match cmd {
            Command::Tick { timestamp, reply } => {
                let timestamp = timestamp.unwrap_or_else(|| self.clock_now());
                let result = self.advance(timestamp).map(|()| timestamp);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "Tick reply channel closed (caller dropped)");
                }
            }
            Command::Enter {
                session,
                config,
                transform,
                reply,
            } => {
                let result = self.handle_enter(session, &config, transform);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "Enter reply channel closed (caller dropped)");
                }
            }
            Command::Leave { session, reply } => {
                let result = self.handle_leave(session);
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "Leave reply channel closed (caller dropped)");
                }
            }
            Command::SubmitInput {
                session,
                frame,
                reply,
            } => {
                let result = self
                    .pawn_of(session)
                    .and_then(|actor| Ok(self.scene.submit_input(actor, frame)?));
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "SubmitInput reply channel closed (caller dropped)");
                }
            }
            Command::Signal {
                target,
                name,
                activator,
                reply,
            } => {
                let delivered = self.scene.signal(target, &name, activator);
                if reply.send(delivered).is_err() {
                    debug!(target: "runtime::worker", "Signal reply channel closed (caller dropped)");
                }
            }
            Command::Request {
                session,
                target,
                name,
                reply,
            } => {
                let result = self
                    .pawn_of(session)
                    .and_then(|actor| Ok(self.scene.request(actor, target, &name)?));
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "Request reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { actor, reply } => {
                if reply.send(self.scene.snapshot(actor)).is_err() {
                    debug!(target: "runtime::worker", "Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::Occupants { reply } => {
                let occupants = self.sessions.iter().map(|(s, a)| (*s, *a)).collect();
                if reply.send(occupants).is_err() {
                    debug!(target: "runtime::worker", "Occupants reply channel closed (caller dropped)");
                }
            }
            Command::Query(query) => query(&mut self.scene),
            Command::Reload { reply } => {
                let result = self.handle_reload();
                if reply.send(result).is_err() {
                    debug!(target: "runtime::worker", "Reload reply channel closed (caller dropped)");
                }
            }
            Command::Shutdown { reply } => return Some(reply),
        }
        None
    }

    /// Milliseconds since the worker started, never behind the scene clock.
    fn clock_now(&self) -> Timestamp {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        Timestamp(elapsed).max(self.scene.now())
    }

    fn pawn_of(&self, session: SessionId) -> Result<ActorId> {
        self.sessions
            .get(&session)
            .copied()
            .ok_or(RuntimeError::UnknownSession(session))
    }

    fn advance(&mut self, timestamp: Timestamp) -> Result<()> {
        self.scene.tick(timestamp)?;
        self.publish_frames();
        Ok(())
    }

    /// Publishes one replication frame per occupant, then the tick's effects.
    fn publish_frames(&mut self) {
        let timestamp = self.scene.now();
        let occupants: Vec<(SessionId, ActorId)> =
            self.sessions.iter().map(|(s, a)| (*s, *a)).collect();

        for (session, actor) in occupants {
            let Some(snapshot) = self.scene.snapshot(actor) else {
                continue;
            };
            let interest = Shape::circle(snapshot.translation, self.settings.interest_radius);
            let replicas = self.scene.replicate(&interest);
            self.event_bus.publish(Event::Replication(ReplicationEvent::Frame {
                session,
                actor,
                timestamp,
                replicas,
            }));
        }

        let effects = self.scene.drain_effects();
        if !effects.is_empty() {
            self.event_bus
                .publish(Event::Replication(ReplicationEvent::Effects { timestamp, effects }));
        }
    }

    fn handle_enter(&mut self, session: SessionId, config: &str, transform: Transform) -> Result<ActorId> {
        if self.sessions.contains_key(&session) {
            return Err(RuntimeError::SessionOccupied(session));
        }

        let actor = self
            .scene
            .spawn_actor(config, transform, SpawnOrigin::default())?;
        if let Err(error) = self.scene.add_occupant(actor, session) {
            // Not a pawn; the body is useless without its session.
            let _ = self.scene.destroy_actor(actor, false);
            return Err(error.into());
        }
        self.sessions.insert(session, actor);

        debug!(target: "runtime::worker", %session, %actor, config, "Session entered");
        self.event_bus
            .publish(Event::Session(SessionEvent::Entered { session, actor }));
        Ok(actor)
    }

    fn handle_leave(&mut self, session: SessionId) -> Result<ActorId> {
        let actor = self
            .sessions
            .remove(&session)
            .ok_or(RuntimeError::UnknownSession(session))?;

        self.scene.remove_occupant(actor);
        self.scene.destroy_actor(actor, false)?;

        debug!(target: "runtime::worker", %session, %actor, "Session left");
        self.event_bus
            .publish(Event::Session(SessionEvent::Left { session, actor }));
        Ok(actor)
    }

    /// Swaps in a freshly built scene that mirrors the live one.
    ///
    /// Sessions whose pawns survive the transfer are bound to the mirrored
    /// pawns; the rest are dropped. Returns the number of mapped entities.
    fn handle_reload(&mut self) -> Result<usize> {
        let mut next = self.source.build(self.oracle.clone())?;
        let refs = next.transfer_from(&self.scene)?;

        let mut sessions = BTreeMap::new();
        for (&session, &actor) in &self.sessions {
            let Some(mapped) = refs.map_actor(actor) else {
                warn!(target: "runtime::worker", %session, %actor, "Pawn did not survive reload");
                continue;
            };
            next.add_occupant(mapped, session)?;
            sessions.insert(session, mapped);
        }

        let previous = std::mem::replace(&mut self.scene, next);
        self.sessions = sessions;
        drop(previous);

        let mapped = refs.len();
        info!(target: "runtime::worker", scene = %self.scene.name(), mapped, "Scene reloaded");
        self.event_bus.publish(Event::Lifecycle(LifecycleEvent::Reloaded {
            scene: self.scene.name().to_owned(),
            timestamp: self.scene.now(),
            mapped,
        }));
        Ok(mapped)
    }

    fn stop(&mut self) -> Timestamp {
        let timestamp = self.clock_now();
        self.scene.shutdown(timestamp);
        self.sessions.clear();

        info!(target: "runtime::worker", scene = %self.scene.name(), ?timestamp, "SimulationWorker stopped");
        self.event_bus.publish(Event::Lifecycle(LifecycleEvent::Stopped {
            scene: self.scene.name().to_owned(),
            timestamp: self.scene.now(),
        }));
        timestamp
    }
}
