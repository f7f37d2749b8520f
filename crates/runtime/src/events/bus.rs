//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{LifecycleEvent, ReplicationEvent, SessionEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Per-tick actor replicas and fired effects
    Replication,
    /// Session entry, exit, and client-directed requests
    Session,
    /// Scene start, reload, and stop
    Lifecycle,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Replication(ReplicationEvent),
    Session(SessionEvent),
    Lifecycle(LifecycleEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Replication(_) => Topic::Replication,
            Event::Session(_) => Topic::Session,
            Event::Lifecycle(_) => Topic::Lifecycle,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Clones share the same channels.
#[derive(Clone)]
pub struct EventBus {
    replication: broadcast::Sender<Event>,
    session: broadcast::Sender<Event>,
    lifecycle: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            replication: broadcast::channel(capacity).0,
            session: broadcast::channel(capacity).0,
            lifecycle: broadcast::channel(capacity).0,
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Replication => &self.replication,
            Topic::Session => &self.session,
            Topic::Lifecycle => &self.lifecycle,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channel(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(target: "runtime::events", ?topic, "No subscribers for topic");
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channel(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
