//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! driving the scene or streaming events from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use sim_core::{ActorId, ActorSnapshot, EntityKey, InputFrame, Scene, SessionId, Timestamp, Transform};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Sends a command built around a fresh reply channel and awaits the reply.
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Advance the scene to `timestamp`, or to the worker clock when `None`.
    ///
    /// Returns the timestamp the scene was advanced to.
    pub async fn tick(&self, timestamp: Option<Timestamp>) -> Result<Timestamp> {
        self.request(|reply| Command::Tick { timestamp, reply }).await?
    }

    /// Spawn a pawn from `config` and bind `session` to it.
    pub async fn enter(
        &self,
        session: SessionId,
        config: impl Into<String>,
        transform: Transform,
    ) -> Result<ActorId> {
        let config = config.into();
        self.request(|reply| Command::Enter {
            session,
            config,
            transform,
            reply,
        })
        .await?
    }

    /// Release the session's pawn. Returns the destroyed actor.
    pub async fn leave(&self, session: SessionId) -> Result<ActorId> {
        self.request(|reply| Command::Leave { session, reply }).await?
    }

    /// Queue a client input frame on the session's pawn.
    ///
    /// Returns `false` when the frame is older than the last one processed.
    pub async fn submit_input(&self, session: SessionId, frame: InputFrame) -> Result<bool> {
        self.request(|reply| Command::SubmitInput {
            session,
            frame,
            reply,
        })
        .await?
    }

    /// Deliver a named signal to a scene entity.
    pub async fn signal(
        &self,
        target: EntityKey,
        name: impl Into<String>,
        activator: Option<EntityKey>,
    ) -> Result<bool> {
        let name = name.into();
        self.request(|reply| Command::Signal {
            target,
            name,
            activator,
            reply,
        })
        .await
    }

    /// Deliver a client request from the session's pawn to `target`.
    pub async fn request_from(
        &self,
        session: SessionId,
        target: EntityKey,
        name: impl Into<String>,
    ) -> Result<bool> {
        let name = name.into();
        self.request(|reply| Command::Request {
            session,
            target,
            name,
            reply,
        })
        .await?
    }

    /// Current snapshot of one actor. Counts as an observation.
    pub async fn snapshot(&self, actor: ActorId) -> Result<Option<ActorSnapshot>> {
        self.request(|reply| Command::Snapshot { actor, reply }).await
    }

    /// Sessions bound to pawns, ordered by session id.
    pub async fn occupants(&self) -> Result<Vec<(SessionId, ActorId)>> {
        self.request(|reply| Command::Occupants { reply }).await
    }

    /// Run `f` against the live scene on the worker task.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let guards = handle.query(|scene| scene.tagged("guard").len()).await?;
    /// ```
    pub async fn query<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Scene) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.request(|reply| {
            Command::Query(Box::new(move |scene: &mut Scene| {
                // A dropped receiver means the caller stopped waiting.
                let _ = reply.send(f(scene));
            }))
        })
        .await
    }

    /// Rebuild the scene from its source, carrying the live state over.
    ///
    /// Returns the number of entities mapped into the new scene.
    pub async fn reload(&self) -> Result<usize> {
        self.request(|reply| Command::Reload { reply }).await?
    }

    /// Stop the scene. The worker exits after replying.
    pub async fn shutdown(&self) -> Result<Timestamp> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Replication` - Per-occupant frames and fired effects
    /// - `Topic::Session` - Session entry/exit, body moves and client actions
    /// - `Topic::Lifecycle` - Scene start, reload and stop
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    ///
    /// Returns a map of topic to receiver for each requested topic.
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
