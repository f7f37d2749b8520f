//! Event types for different topics.

use serde::{Deserialize, Serialize};
use sim_core::{ActorId, ActorReplica, ClientAction, FiredEffect, SessionId, Timestamp};

/// Replicated scene state, published after every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplicationEvent {
    /// Actors within the interest area of one occupant.
    Frame {
        session: SessionId,
        actor: ActorId,
        timestamp: Timestamp,
        replicas: Vec<ActorReplica>,
    },

    /// Effects fired during the tick.
    Effects {
        timestamp: Timestamp,
        effects: Vec<FiredEffect>,
    },
}

/// Requests addressed to client sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A session took control of a pawn.
    Entered { session: SessionId, actor: ActorId },

    /// A session released its pawn.
    Left { session: SessionId, actor: ActorId },

    /// Scene logic asked the session to continue in another scene.
    MoveBody {
        session: SessionId,
        scene: String,
        portal: Option<String>,
    },

    /// Scene logic posted a client-side command.
    ClientAction {
        session: SessionId,
        action: ClientAction,
    },
}

/// Scene lifecycle transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Started {
        scene: String,
        timestamp: Timestamp,
    },

    /// A rebuilt scene took over the live state of its predecessor.
    Reloaded {
        scene: String,
        timestamp: Timestamp,
        mapped: usize,
    },

    Stopped {
        scene: String,
        timestamp: Timestamp,
    },
}
