use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::world::RoomCollision;

pub const CELL_BLOCKED: u8 = 0;
pub const CELL_WALKABLE: u8 = 1;

/// Largest grid the composer will allocate (4096 x 4096)
pub const MAX_GRID_CELLS: usize = 4096 * 4096;

/// Row-major walkability grid of one area
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<u8>,
}

impl CollisionGrid {
    /// All cells blocked
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![CELL_BLOCKED; width as usize * height as usize],
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, point: Point) -> Option<u8> {
        self.index(point.x as i64, point.y as i64)
            .map(|index| self.cells[index])
    }

    pub fn is_walkable(&self, point: Point) -> bool {
        self.get(point) == Some(CELL_WALKABLE)
    }

    /// Copy a room's cells in with its top-left at `offset`; cells falling
    /// outside the grid are dropped
    pub fn blit(&mut self, room: &RoomCollision, offset: Point) {
        let width = room.width as usize;
        for (row, cells) in room.cells.chunks_exact(width).enumerate() {
            let y = offset.y as i64 + row as i64;
            for (col, cell) in cells.iter().enumerate() {
                if let Some(index) = self.index(offset.x as i64 + col as i64, y) {
                    self.cells[index] = *cell;
                }
            }
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks_exact(self.width.max(1) as usize)
    }

    /// Nested `[row][column]` form used by the response body
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        if self.width == 0 {
            return Vec::new();
        }
        self.rows().map(<[u8]>::to_vec).collect()
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == CELL_WALKABLE).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(width: u32, height: u32, cells: Vec<u8>) -> RoomCollision {
        RoomCollision {
            origin: Point::default(),
            width,
            height,
            cells,
        }
    }

    #[test]
    fn test_new_grid_is_blocked() {
        let grid = CollisionGrid::new(3, 2);
        assert_eq!(grid.cells.len(), 6);
        assert_eq!(grid.walkable_count(), 0);
        assert_eq!(grid.get(Point::new(3, 0)), None);
    }

    #[test]
    fn test_blit_at_offset() {
        let mut grid = CollisionGrid::new(4, 2);
        grid.blit(&room(2, 1, vec![CELL_WALKABLE, CELL_WALKABLE]), Point::new(2, 1));
        assert_eq!(grid.to_rows(), vec![vec![0, 0, 0, 0], vec![0, 0, 1, 1]]);
        assert!(grid.is_walkable(Point::new(3, 1)));
    }

    #[test]
    fn test_blit_clips_outside() {
        let mut grid = CollisionGrid::new(2, 2);
        grid.blit(&room(2, 2, vec![CELL_WALKABLE; 4]), Point::new(1, 1));
        assert_eq!(grid.walkable_count(), 1);
    }
}
