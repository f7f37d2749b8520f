//! Entity identity, dynamic values and replicated actor state.
//!
//! Every logic-bearing entity (actors and scene entries) embeds a [`LogicBase`]
//! carrying its key, transform, tags and variables. Replication reads
//! [`ActorSnapshot`]s and [`ActorDelta`]s produced from live actor state.
mod common;
mod flags;
mod snapshot;
mod value;

use std::collections::{BTreeMap, BTreeSet};

pub use common::{ActorId, EntityKey, EntryId, Timestamp};
pub use flags::{ActorFlags, CollisionFlags, FlagTable};
pub use snapshot::{ActorDelta, ActorFields, ActorSnapshot, MotionSnapshot};
pub use value::Value;

use crate::geom::Transform;

/// State shared by every logic-bearing entity.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicBase {
    pub key: EntityKey,
    pub transform: Transform,
    pub tags: BTreeSet<String>,
    /// Allocated on first write; most entities never carry variables.
    variables: Option<Box<BTreeMap<String, Value>>>,
    pub active: bool,
}

impl LogicBase {
    pub fn new(key: EntityKey, transform: Transform, tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            key,
            transform,
            tags: tags.into_iter().collect(),
            variables: None,
            active: true,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Returns the named variable, or [`Value::Null`] when unset.
    pub fn variable(&self, name: &str) -> Value {
        self.variables
            .as_ref()
            .and_then(|vars| vars.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a variable and returns the value it replaced.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Value {
        self.variables
            .get_or_insert_with(Default::default)
            .insert(name.to_owned(), value)
            .unwrap_or_default()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables
            .iter()
            .flat_map(|vars| vars.iter())
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Copies transferable state from a mirrored entity in another scene.
    ///
    /// The key is kept; variables are deep-copied.
    pub fn transfer(&mut self, source: &LogicBase) {
        self.transform = source.transform;
        self.tags = source.tags.clone();
        self.variables = source.variables.clone();
        self.active = source.active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_are_lazily_allocated() {
        let mut base = LogicBase::new(ActorId(1).into(), Transform::IDENTITY, []);
        assert!(base.variables.is_none());
        assert_eq!(base.variable("hp"), Value::Null);

        assert_eq!(base.set_variable("hp", Value::from(10)), Value::Null);
        assert_eq!(base.set_variable("hp", Value::from(9)), Value::from(10));
        assert_eq!(base.variable("hp"), Value::from(9));
    }

    #[test]
    fn transfer_keeps_identity() {
        let mut source = LogicBase::new(ActorId(1).into(), Transform::IDENTITY, ["boss".to_owned()]);
        source.set_variable("phase", Value::from(2));
        let mut mirror = LogicBase::new(ActorId(40).into(), Transform::IDENTITY, []);

        mirror.transfer(&source);
        assert_eq!(mirror.key, EntityKey::Actor(ActorId(40)));
        assert!(mirror.has_tag("boss"));
        assert_eq!(mirror.variable("phase"), Value::from(2));
    }
}
