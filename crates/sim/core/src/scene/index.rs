//! Ordered shape index for actors and entries.
//!
//! The index is a flat ordered map rather than a spatial tree: scenes hold at
//! most a few hundred shapes and deterministic iteration order matters more
//! than query cost. Every query yields keys in ascending order.

use std::collections::BTreeMap;

use crate::geom::{Shape, Transform, Vector2};
use crate::state::CollisionFlags;

/// Notified around every shape mutation made through [`ShapeIndex::update`].
pub trait ShapeObserver<K> {
    fn shape_will_change(&mut self, _key: K, _old: &Shape) {}

    /// `transform` is the owner transform the new shape was placed with.
    fn shape_did_change(&mut self, key: K, shape: &Shape, transform: &Transform);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexedShape {
    pub shape: Shape,
    pub flags: CollisionFlags,
}

#[derive(Clone, Debug)]
pub struct ShapeIndex<K> {
    shapes: BTreeMap<K, IndexedShape>,
}

impl<K> Default for ShapeIndex<K> {
    fn default() -> Self {
        Self {
            shapes: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> ShapeIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: K, shape: Shape, flags: CollisionFlags) {
        self.shapes.insert(key, IndexedShape { shape, flags });
    }

    pub fn remove(&mut self, key: K) -> Option<IndexedShape> {
        self.shapes.remove(&key)
    }

    pub fn get(&self, key: K) -> Option<&IndexedShape> {
        self.shapes.get(&key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.shapes.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Replaces the shape of `key`, notifying `observer` before and after.
    ///
    /// Returns false when `key` is not indexed; the observer is not called then.
    pub fn update(
        &mut self,
        key: K,
        shape: Shape,
        transform: &Transform,
        observer: &mut dyn ShapeObserver<K>,
    ) -> bool {
        let Some(entry) = self.shapes.get_mut(&key) else {
            return false;
        };
        observer.shape_will_change(key, &entry.shape);
        entry.shape = shape;
        observer.shape_did_change(key, &shape, transform);
        true
    }

    pub fn intersecting<'a>(&'a self, shape: &'a Shape) -> impl Iterator<Item = K> + 'a {
        self.shapes
            .iter()
            .filter(move |(_, indexed)| indexed.shape.intersects(shape))
            .map(|(key, _)| *key)
    }

    /// Keys whose flags intersect `mask`, excluding `exclude`.
    pub fn intersecting_masked<'a>(
        &'a self,
        shape: &'a Shape,
        mask: CollisionFlags,
        exclude: Option<K>,
    ) -> impl Iterator<Item = K> + 'a {
        self.shapes
            .iter()
            .filter(move |(key, indexed)| {
                Some(**key) != exclude
                    && indexed.flags.intersects(mask)
                    && indexed.shape.intersects(shape)
            })
            .map(|(key, _)| *key)
    }

    /// Deepest push that moves `shape` out of the masked shapes.
    pub fn penetration(&self, shape: &Shape, mask: CollisionFlags, exclude: Option<K>) -> Option<Vector2> {
        self.shapes
            .iter()
            .filter(|(key, indexed)| Some(**key) != exclude && indexed.flags.intersects(mask))
            .filter_map(|(_, indexed)| shape.penetration(&indexed.shape))
            .max_by(|a, b| a.length().total_cmp(&b.length()))
    }
}
