use std::collections::{HashMap, VecDeque};

use super::{CollisionOracle, PathOracle, PathRequest};
use crate::geom::{Rect, Shape, Vector2};
use crate::state::CollisionFlags;

/// Grid of collision flags with square tiles.
///
/// Tile `(0, 0)` spans `[0, tile_size]` on both axes. Everything outside the
/// grid is solid.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tile_size: f32,
    tiles: Vec<CollisionFlags>,
}

impl TileMap {
    /// Creates a map from row-major tiles; missing tiles are open floor.
    pub fn new(width: u32, height: u32, tile_size: f32, mut tiles: Vec<CollisionFlags>) -> Self {
        tiles.resize((width * height) as usize, CollisionFlags::empty());
        Self {
            width,
            height,
            tile_size,
            tiles,
        }
    }

    pub fn open(width: u32, height: u32) -> Self {
        Self::new(width, height, 1.0, Vec::new())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tile(&self, x: i32, y: i32) -> CollisionFlags {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return CollisionFlags::SOLID;
        }
        self.tiles[(y as u32 * self.width + x as u32) as usize]
    }

    pub fn set_tile(&mut self, x: u32, y: u32, flags: CollisionFlags) {
        if x < self.width && y < self.height {
            self.tiles[(y * self.width + x) as usize] = flags;
        }
    }

    pub fn tile_rect(&self, x: i32, y: i32) -> Rect {
        let min = Vector2::new(x as f32 * self.tile_size, y as f32 * self.tile_size);
        Rect::new(min, min + Vector2::new(self.tile_size, self.tile_size))
    }

    pub fn tile_at(&self, point: Vector2) -> (i32, i32) {
        (
            (point.x / self.tile_size).floor() as i32,
            (point.y / self.tile_size).floor() as i32,
        )
    }

    fn tile_center(&self, (x, y): (i32, i32)) -> Vector2 {
        self.tile_rect(x, y).center()
    }

    /// Tiles overlapped by `shape`'s bounds whose flags intersect `mask`.
    fn blocking_tiles(&self, mask: CollisionFlags, shape: &Shape) -> impl Iterator<Item = Shape> + '_ {
        let bounds = shape.bounds();
        let (x0, y0) = self.tile_at(bounds.min);
        let (x1, y1) = self.tile_at(bounds.max);
        let shape = *shape;
        (y0..=y1)
            .flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.tile(x, y).intersects(mask))
            .map(|(x, y)| Shape::Rect(self.tile_rect(x, y)))
            .filter(move |tile| tile.intersects(&shape))
    }

    fn passable(&self, tile: (i32, i32), request: &PathRequest) -> bool {
        if self.tile(tile.0, tile.1).intersects(request.mask) {
            return false;
        }
        // Shrink so obstacles that merely touch the tile edge do not block it.
        let cell = Shape::Rect(self.tile_rect(tile.0, tile.1).expanded(-self.tile_size * 0.1));
        !request.obstacles.iter().any(|obstacle| obstacle.intersects(&cell))
    }
}

impl CollisionOracle for TileMap {
    fn collides(&self, mask: CollisionFlags, shape: &Shape) -> bool {
        if mask.is_empty() {
            return false;
        }
        self.blocking_tiles(mask, shape).next().is_some()
    }

    fn penetration(&self, mask: CollisionFlags, shape: &Shape) -> Option<Vector2> {
        if mask.is_empty() {
            return None;
        }
        self.blocking_tiles(mask, shape)
            .filter_map(|tile| shape.penetration(&tile))
            .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
    }
}

impl PathOracle for TileMap {
    /// Breadth-first search over 4-connected tiles.
    fn path(&self, request: &PathRequest) -> Option<Vec<Vector2>> {
        let start = self.tile_at(request.from);
        let goal = self.tile_at(request.to);
        if start == goal {
            return Some(vec![request.to]);
        }
        if !self.passable(goal, request) {
            return None;
        }

        let max_steps = (request.max_length / self.tile_size).floor().max(0.0) as u32;
        let mut parents: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
        let mut frontier = VecDeque::from([(start, 0u32)]);
        parents.insert(start, start);

        while let Some((tile, depth)) = frontier.pop_front() {
            if tile == goal {
                break;
            }
            if depth >= max_steps {
                continue;
            }
            for (dx, dy) in [(1, 0), (0, 1), (-1, 0), (0, -1)] {
                let next = (tile.0 + dx, tile.1 + dy);
                if parents.contains_key(&next) || !self.passable(next, request) {
                    continue;
                }
                parents.insert(next, tile);
                frontier.push_back((next, depth + 1));
            }
        }

        if !parents.contains_key(&goal) {
            return None;
        }

        let mut waypoints = vec![request.to];
        let mut cursor = parents[&goal];
        while cursor != start {
            waypoints.push(self.tile_center(cursor));
            cursor = parents[&cursor];
        }
        waypoints.reverse();
        Some(waypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walled() -> TileMap {
        // 5x3 with a wall in column 2 except the top row.
        let mut map = TileMap::open(5, 3);
        map.set_tile(2, 0, CollisionFlags::SOLID);
        map.set_tile(2, 1, CollisionFlags::SOLID);
        map
    }

    #[test]
    fn out_of_bounds_is_solid() {
        let map = TileMap::open(2, 2);
        assert!(map.collides(CollisionFlags::SOLID, &Shape::Point(Vector2::new(-0.5, 0.5))));
        assert!(!map.collides(CollisionFlags::SOLID, &Shape::Point(Vector2::new(0.5, 0.5))));
    }

    #[test]
    fn empty_mask_never_collides() {
        let map = walled();
        let inside_wall = Shape::Point(Vector2::new(2.5, 0.5));
        assert!(map.collides(CollisionFlags::SOLID, &inside_wall));
        assert!(!map.collides(CollisionFlags::empty(), &inside_wall));
    }

    #[test]
    fn path_routes_around_walls() {
        let map = walled();
        let request = PathRequest::new(
            Vector2::new(0.5, 0.5),
            Vector2::new(4.5, 0.5),
            32.0,
            CollisionFlags::SOLID,
        );
        let path = map.path(&request).expect("reachable");
        assert_eq!(path.last(), Some(&Vector2::new(4.5, 0.5)));
        assert!(path.iter().any(|point| point.y > 2.0));
    }

    #[test]
    fn path_respects_max_length() {
        let map = walled();
        let request = PathRequest::new(
            Vector2::new(0.5, 0.5),
            Vector2::new(4.5, 0.5),
            4.0,
            CollisionFlags::SOLID,
        );
        assert!(map.path(&request).is_none());
    }

    #[test]
    fn penetration_pushes_out_of_wall() {
        let map = walled();
        let circle = Shape::circle(Vector2::new(1.8, 0.5), 0.5);
        let push = map
            .penetration(CollisionFlags::SOLID, &circle)
            .expect("overlaps the wall");
        assert!(push.x < 0.0);
    }
}
