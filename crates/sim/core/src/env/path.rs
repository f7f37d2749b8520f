use crate::geom::{Shape, Vector2};
use crate::state::CollisionFlags;

/// Parameters of a single path query.
#[derive(Clone, Debug, PartialEq)]
pub struct PathRequest {
    pub from: Vector2,
    pub to: Vector2,
    /// Paths longer than this are rejected.
    pub max_length: f32,
    pub mask: CollisionFlags,
    /// Extra blockers, such as the shapes of other actors.
    pub obstacles: Vec<Shape>,
}

impl PathRequest {
    pub fn new(from: Vector2, to: Vector2, max_length: f32, mask: CollisionFlags) -> Self {
        Self {
            from,
            to,
            max_length,
            mask,
            obstacles: Vec::new(),
        }
    }
}

/// Pathfinding service.
pub trait PathOracle: Send + Sync {
    /// Returns the waypoints from `request.from` to `request.to`, excluding the
    /// start and ending at the destination, or `None` if unreachable.
    fn path(&self, request: &PathRequest) -> Option<Vec<Vector2>>;
}
