//! Free-position search for spawning and warping actors.

use tracing::debug;

use super::Scene;
use crate::env::PathRequest;
use crate::geom::{Transform, Vector2};
use crate::schema::ActorConfig;
use crate::state::ActorId;

/// Grid offsets of ring `ring` around the origin, counter-clockwise from the
/// bottom-left corner.
fn ring_offsets(ring: i32) -> Vec<(i32, i32)> {
    if ring == 0 {
        return vec![(0, 0)];
    }
    let mut offsets = Vec::with_capacity(8 * ring as usize);
    offsets.extend((-ring..=ring).map(|i| (i, -ring)));
    offsets.extend((-ring + 1..=ring).map(|j| (ring, j)));
    offsets.extend((-ring..ring).rev().map(|i| (i, ring)));
    offsets.extend((-ring + 1..ring).rev().map(|j| (-ring, j)));
    offsets
}

/// Ring spacing for shapes with no extent along an axis.
const MIN_STEP: f32 = 0.1;

impl Scene {
    /// Finds the first position around `target` where `config` fits and from
    /// which the target is reachable. With `reach_from` set, the position must
    /// also be reachable from that point. Falls back to `fallback` when the
    /// search is exhausted.
    pub(super) fn place(
        &self,
        config: &ActorConfig,
        target: Transform,
        fallback: Vector2,
        exclude: Option<ActorId>,
        reach_from: Option<Vector2>,
    ) -> Vector2 {
        let bounds = config.shape.at(&Transform::IDENTITY).bounds();
        let step_x = bounds.width().max(MIN_STEP);
        let step_y = bounds.height().max(MIN_STEP);

        for ring in 0..=self.config.placement_rings as i32 {
            for (i, j) in ring_offsets(ring) {
                let candidate = target.translation + Vector2::new(i as f32 * step_x, j as f32 * step_y);
                if !self.placeable(config, candidate, target, exclude) {
                    continue;
                }
                if let Some(from) = reach_from
                    && !self.reachable(from, candidate, config)
                {
                    continue;
                }
                if ring > 0 {
                    debug!(
                        target: "sim::scene",
                        config = %config.name,
                        ring,
                        x = candidate.x,
                        y = candidate.y,
                        "Placement moved off an occupied position"
                    );
                }
                return candidate;
            }
        }
        debug!(target: "sim::scene", config = %config.name, "No free position; using fallback");
        fallback
    }

    fn placeable(&self, config: &ActorConfig, candidate: Vector2, target: Transform, exclude: Option<ActorId>) -> bool {
        let shape = config.shape.at(&Transform::new(candidate, target.rotation));
        if self.collides(config.spawn_mask, &shape, exclude) {
            return false;
        }
        self.reachable(candidate, target.translation, config)
    }

    /// Path check under the config's spawn mask. Without a path oracle every
    /// point is reachable.
    fn reachable(&self, from: Vector2, to: Vector2, config: &ActorConfig) -> bool {
        if from == to {
            return true;
        }
        match self.env.paths() {
            Ok(paths) => {
                let request = PathRequest::new(from, to, self.config.max_path_length, config.spawn_mask);
                paths.path(&request).is_some()
            }
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ring_runs_counter_clockwise_from_bottom_left() {
        assert_eq!(
            ring_offsets(1),
            vec![
                (-1, -1),
                (0, -1),
                (1, -1),
                (1, 0),
                (1, 1),
                (0, 1),
                (-1, 1),
                (-1, 0),
            ]
        );
    }

    #[test]
    fn rings_cover_their_perimeter_once() {
        for ring in 1..5 {
            let offsets = ring_offsets(ring);
            assert_eq!(offsets.len(), 8 * ring as usize);
            let mut unique = offsets.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), offsets.len());
            assert!(offsets.iter().all(|(i, j)| i.abs() == ring || j.abs() == ring));
        }
    }
}
