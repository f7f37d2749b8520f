//! Runtime instances of the configuration trees.
//!
//! Each configuration node is instantiated once when its owner (an actor,
//! entry, handler or ad-hoc script) is created. Instances hold only derived
//! state: resolved children, counters, cached parses and scheduled intervals.
//!
//! Logic runs against a [`LogicContext`] that borrows the whole scene
//! mutably. Handlers and behaviors are taken out of their owner while they
//! run, so nested dispatch can reach every other entity freely; an attempt to
//! re-enter a logic instance that is already running finds an empty slot and
//! is dropped.
pub mod action;
pub mod behavior;
pub mod condition;
pub mod expression;
pub mod handler;
pub mod region;
pub mod target;

use std::collections::BTreeMap;
use std::fmt;

pub use action::ActionLogic;
pub use behavior::BehaviorLogic;
pub use condition::ConditionLogic;
pub use expression::{ExpressionLogic, ParseError, parse_expression};
pub use handler::{HandlerEvent, HandlerLogic};
pub use region::RegionLogic;
pub use target::TargetLogic;

use crate::env::OracleError;
use crate::error::{ErrorSeverity, SimError};
use crate::scene::Scene;
use crate::state::{ActorId, EntityKey, Timestamp};

/// Handle of a scheduled one-shot interval on the scene's virtual clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalId(pub u64);

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interval#{}", self.0)
    }
}

/// Position of a handler in its owner's handler list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerKey {
    pub entity: EntityKey,
    pub index: usize,
}

impl HandlerKey {
    pub fn new(entity: impl Into<EntityKey>, index: usize) -> Self {
        Self {
            entity: entity.into(),
            index,
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/handler#{}", self.entity, self.index)
    }
}

/// Identifier of an ad-hoc action run through [`Scene::run_action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptId(pub u32);

/// Root of the logic tree an interval is delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicOwner {
    Handler(HandlerKey),
    Behavior(ActorId),
    Script(ScriptId),
}

impl LogicOwner {
    /// Entity whose removal invalidates the owner.
    pub fn entity(&self) -> Option<EntityKey> {
        match self {
            LogicOwner::Handler(key) => Some(key.entity),
            LogicOwner::Behavior(actor) => Some(EntityKey::Actor(*actor)),
            LogicOwner::Script(_) => None,
        }
    }
}

/// Execution context threaded through every logic call.
pub struct LogicContext<'a> {
    pub scene: &'a mut Scene,
    /// Entity owning the executing logic.
    pub source: EntityKey,
    pub owner: LogicOwner,
}

impl<'a> LogicContext<'a> {
    pub fn new(scene: &'a mut Scene, source: EntityKey, owner: LogicOwner) -> Self {
        Self {
            scene,
            source,
            owner,
        }
    }

    pub fn reborrow(&mut self) -> LogicContext<'_> {
        LogicContext {
            scene: &mut *self.scene,
            source: self.source,
            owner: self.owner,
        }
    }

    /// Same owner, different source; used when a candidate stands in as source.
    pub fn with_source(&mut self, source: EntityKey) -> LogicContext<'_> {
        LogicContext {
            scene: &mut *self.scene,
            source,
            owner: self.owner,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.scene.now()
    }
}

/// Source-to-destination identity map built during a transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefMap {
    keys: BTreeMap<EntityKey, EntityKey>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: EntityKey, destination: EntityKey) {
        self.keys.insert(source, destination);
    }

    pub fn get(&self, source: EntityKey) -> Option<EntityKey> {
        self.keys.get(&source).copied()
    }

    /// Rewrites a weak reference; unmapped references become absent.
    pub fn map(&self, source: Option<EntityKey>) -> Option<EntityKey> {
        source.and_then(|key| self.get(key))
    }

    pub fn map_actor(&self, source: ActorId) -> Option<ActorId> {
        self.get(EntityKey::Actor(source)).and_then(EntityKey::actor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, EntityKey)> + '_ {
        self.keys.iter().map(|(from, to)| (*from, *to))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Destination side of a transfer: the new host scene and the identity map.
pub struct TransferContext<'a> {
    pub scene: &'a mut Scene,
    pub refs: &'a RefMap,
    /// Owner that re-armed intervals are delivered to in the new scene.
    pub owner: LogicOwner,
}

impl TransferContext<'_> {
    /// Schedules an equivalent interval in the destination scene.
    pub fn rearm(&mut self, fire_at: Timestamp) -> IntervalId {
        self.scene.schedule(fire_at, self.owner)
    }
}

/// Operations every logic instance supports besides its family contract.
pub trait LogicNode {
    /// Delivers a due interval. Returns false when `id` is not scheduled by
    /// this subtree.
    fn fire_interval(&mut self, _ctx: &mut LogicContext<'_>, _id: IntervalId) -> bool {
        false
    }

    /// Appends every interval still pending in this subtree.
    fn collect_intervals(&self, _out: &mut Vec<IntervalId>) {}

    /// Mirrors state from the instance built from the same configuration in
    /// the retiring scene.
    fn transfer(&mut self, _source: &Self, _tx: &mut TransferContext<'_>) {}
}

impl<T: LogicNode> LogicNode for Box<T> {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        (**self).fire_interval(ctx, id)
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        (**self).collect_intervals(out)
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        (**self).transfer(source, tx)
    }
}

impl<T: LogicNode> LogicNode for Option<T> {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.as_mut().is_some_and(|node| node.fire_interval(ctx, id))
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        if let Some(node) = self {
            node.collect_intervals(out);
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        if let (Some(node), Some(source)) = (self, source) {
            node.transfer(source, tx);
        }
    }
}

impl<T: LogicNode> LogicNode for Vec<T> {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.iter_mut().any(|node| node.fire_interval(ctx, id))
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        for node in self {
            node.collect_intervals(out);
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        for (node, source) in self.iter_mut().zip(source) {
            node.transfer(source, tx);
        }
    }
}

/// Universal (`all`) or existential quantification; an empty set satisfies
/// only the universal form.
pub(crate) fn quantify<T>(all: bool, items: impl IntoIterator<Item = T>, mut predicate: impl FnMut(T) -> bool) -> bool {
    let mut items = items.into_iter();
    if all {
        items.all(|item| predicate(item))
    } else {
        items.any(|item| predicate(item))
    }
}

/// Configuration problems found while running logic.
///
/// These never abort evaluation; they are logged and the logic degrades to a
/// no-op or `false`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LogicError {
    #[error("actor {actor} has no flag named '{flag}'")]
    UnknownFlag { actor: ActorId, flag: String },

    #[error("{0} is not an actor")]
    NotAnActor(EntityKey),

    #[error("{0} has no controlling session")]
    NoSession(EntityKey),

    #[error("scene is not running")]
    SceneStopped,

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl SimError for LogicError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            LogicError::UnknownFlag { .. } | LogicError::NotAnActor(_) => ErrorSeverity::Validation,
            LogicError::NoSession(_) | LogicError::SceneStopped => ErrorSeverity::Recoverable,
            LogicError::Oracle(error) => error.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            LogicError::UnknownFlag { .. } => "LOGIC_UNKNOWN_FLAG",
            LogicError::NotAnActor(_) => "LOGIC_NOT_AN_ACTOR",
            LogicError::NoSession(_) => "LOGIC_NO_SESSION",
            LogicError::SceneStopped => "LOGIC_SCENE_STOPPED",
            LogicError::Oracle(error) => error.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sets_satisfy_only_universal_quantification() {
        assert!(quantify(true, Vec::<u32>::new(), |_| false));
        assert!(!quantify(false, Vec::<u32>::new(), |_| true));
        assert!(quantify(false, [1, 2, 3], |n| n == 2));
        assert!(!quantify(true, [1, 2, 3], |n| n == 2));
    }

    #[test]
    fn unmapped_references_become_absent() {
        let mut refs = RefMap::new();
        refs.insert(ActorId(1).into(), ActorId(10).into());
        assert_eq!(refs.map(Some(ActorId(1).into())), Some(ActorId(10).into()));
        assert_eq!(refs.map(Some(ActorId(2).into())), None);
        assert_eq!(refs.map_actor(ActorId(1)), Some(ActorId(10)));
    }
}
