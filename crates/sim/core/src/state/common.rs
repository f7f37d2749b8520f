use std::fmt;

/// Identifier of a simulated actor, unique within its scene and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Identifier of a static scene entry (areas, markers, patrol paths).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryId(pub u32);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// Identity of any logic-bearing entity in a scene.
///
/// Keys are weak handles: holding one never keeps the entity alive, and every
/// lookup through the scene may come back empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKey {
    Actor(ActorId),
    Entry(EntryId),
}

impl EntityKey {
    pub fn actor(self) -> Option<ActorId> {
        match self {
            EntityKey::Actor(id) => Some(id),
            EntityKey::Entry(_) => None,
        }
    }

    pub fn entry(self) -> Option<EntryId> {
        match self {
            EntityKey::Entry(id) => Some(id),
            EntityKey::Actor(_) => None,
        }
    }
}

impl From<ActorId> for EntityKey {
    fn from(id: ActorId) -> Self {
        EntityKey::Actor(id)
    }
}

impl From<EntryId> for EntityKey {
    fn from(id: EntryId) -> Self {
        EntityKey::Entry(id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Actor(id) => id.fmt(f),
            EntityKey::Entry(id) => id.fmt(f),
        }
    }
}

/// Simulation time in milliseconds on the tick-aligned virtual clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(i64::MAX);

    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn millis(self) -> i64 {
        self.0
    }
}

impl std::ops::Add<i64> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: i64) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs))
    }
}

impl std::ops::Sub<i64> for Timestamp {
    type Output = Timestamp;
    fn sub(self, rhs: i64) -> Timestamp {
        Timestamp(self.0.saturating_sub(rhs))
    }
}

impl std::ops::Sub for Timestamp {
    type Output = i64;
    fn sub(self, rhs: Timestamp) -> i64 {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
