use crate::geom::{Shape, Vector2};
use crate::state::CollisionFlags;

/// Static-world collision service.
///
/// Only level geometry is consulted here; actor-versus-actor tests go through
/// the scene's shape index.
pub trait CollisionOracle: Send + Sync {
    /// Returns true if `shape` overlaps any geometry whose flags intersect `mask`.
    fn collides(&self, mask: CollisionFlags, shape: &Shape) -> bool;

    /// Vector that pushes `shape` out of the deepest overlapping geometry.
    fn penetration(&self, mask: CollisionFlags, shape: &Shape) -> Option<Vector2>;
}
