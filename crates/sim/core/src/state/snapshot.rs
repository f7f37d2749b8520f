//! Immutable actor snapshots and the per-tick deltas between them.
//!
//! A snapshot is produced at most once per tick and never mutated afterwards.
//! The delta records exactly the fields that differ from the previous tick's
//! snapshot, so `delta.apply(&previous) == current` always holds.

use bitflags::bitflags;

use super::{ActorFlags, ActorId, Timestamp};
use crate::geom::Vector2;

bitflags! {
    /// Tracks which fields of an [`ActorSnapshot`] changed between two ticks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ActorFields: u8 {
        const TRANSLATION = 1 << 0;
        const ROTATION    = 1 << 1;
        const DESTROYED   = 1 << 2;
        const FLAGS       = 1 << 3;
        const MOTION      = 1 << 4;
    }
}

/// Replicated movement state of a mobile actor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionSnapshot {
    pub direction: f32,
    pub speed: f32,
    pub moving: bool,
}

/// Point-in-time replicated state of one actor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub config: String,
    pub created: Timestamp,
    pub destroyed: Option<Timestamp>,
    pub translation: Vector2,
    pub rotation: f32,
    pub flags: ActorFlags,
    pub motion: Option<MotionSnapshot>,
}

/// Minimal update between two snapshots of the same actor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorDelta {
    pub id: ActorId,
    pub fields: ActorFields,
    pub translation: Option<Vector2>,
    pub rotation: Option<f32>,
    pub destroyed: Option<Option<Timestamp>>,
    pub flags: Option<ActorFlags>,
    pub motion: Option<Option<MotionSnapshot>>,
}

impl ActorDelta {
    /// Computes the delta from `before` to `after`.
    ///
    /// Returns `None` if no replicated field changed.
    pub fn between(before: &ActorSnapshot, after: &ActorSnapshot) -> Option<Self> {
        debug_assert_eq!(before.id, after.id, "Cannot diff snapshots of different actors");

        let mut delta = Self {
            id: after.id,
            fields: ActorFields::empty(),
            translation: None,
            rotation: None,
            destroyed: None,
            flags: None,
            motion: None,
        };

        if before.translation != after.translation {
            delta.fields |= ActorFields::TRANSLATION;
            delta.translation = Some(after.translation);
        }
        if before.rotation != after.rotation {
            delta.fields |= ActorFields::ROTATION;
            delta.rotation = Some(after.rotation);
        }
        if before.destroyed != after.destroyed {
            delta.fields |= ActorFields::DESTROYED;
            delta.destroyed = Some(after.destroyed);
        }
        if before.flags != after.flags {
            delta.fields |= ActorFields::FLAGS;
            delta.flags = Some(after.flags);
        }
        if before.motion != after.motion {
            delta.fields |= ActorFields::MOTION;
            delta.motion = Some(after.motion);
        }

        (!delta.fields.is_empty()).then_some(delta)
    }

    /// Reconstructs the newer snapshot from the older one.
    pub fn apply(&self, previous: &ActorSnapshot) -> ActorSnapshot {
        let mut current = previous.clone();
        if let Some(translation) = self.translation {
            current.translation = translation;
        }
        if let Some(rotation) = self.rotation {
            current.rotation = rotation;
        }
        if let Some(destroyed) = self.destroyed {
            current.destroyed = destroyed;
        }
        if let Some(flags) = self.flags {
            current.flags = flags;
        }
        if let Some(motion) = self.motion {
            current.motion = motion;
        }
        current
    }
}
