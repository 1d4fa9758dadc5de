/// Occupancy grid: O(1) "which block supports this cell" lookup.
///
/// `cells[row][x]` holds the id of the block occupying that support cell,
/// or `None`. The grid never owns entities; ids resolve through the registry.
///
/// ## Row convention
///
/// `y` grows upward. A block standing at entity position `(x, y)` occupies
/// grid row `y - 1`. Relative to a mover at `(x, y)`:
///
/// ```text
///   row y      head   (carry slot when the avatar holds a block)
///   row y - 1  body   (must be empty to stand here)
///   row y - 2  foot   (the block stood on)
///   row y - 3  below  (footing one level down)
/// ```
///
/// `get`/`set` treat an out-of-range index as a broken invariant and panic.
/// Rule code uses `probe`, which answers `None` outside the grid.

use super::entity::EntityId;

pub const GRID_W: usize = 30;
pub const GRID_H: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyGrid {
    cells: [[Option<EntityId>; GRID_W]; GRID_H],
}

impl Default for OccupancyGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl OccupancyGrid {
    pub fn new() -> Self {
        OccupancyGrid { cells: [[None; GRID_W]; GRID_H] }
    }

    /// Is `(x, row)` a real cell?
    #[inline]
    pub fn in_bounds(x: i32, row: i32) -> bool {
        x >= 0 && row >= 0 && (x as usize) < GRID_W && (row as usize) < GRID_H
    }

    #[inline]
    pub fn get(&self, x: usize, row: usize) -> Option<EntityId> {
        assert!(x < GRID_W && row < GRID_H, "grid read out of bounds: ({x}, {row})");
        self.cells[row][x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, row: usize, id: Option<EntityId>) {
        assert!(x < GRID_W && row < GRID_H, "grid write out of bounds: ({x}, {row})");
        self.cells[row][x] = id;
    }

    /// Non-panicking lookup on signed coordinates. Outside the grid → `None`.
    #[inline]
    pub fn probe(&self, x: i32, row: i32) -> Option<EntityId> {
        if Self::in_bounds(x, row) {
            self.cells[row as usize][x as usize]
        } else {
            None
        }
    }

    #[inline]
    pub fn is_occupied(&self, x: i32, row: i32) -> bool {
        self.probe(x, row).is_some()
    }

    /// Can something be placed at `(x, row)`? Cells outside the grid cannot
    /// take a block, so they are never free.
    #[inline]
    pub fn is_free(&self, x: i32, row: i32) -> bool {
        Self::in_bounds(x, row) && self.cells[row as usize][x as usize].is_none()
    }

    /// Move whatever sits at `from` to `to`, leaving `from` empty.
    /// Returns the moved id.
    pub fn relocate(&mut self, from: (usize, usize), to: (usize, usize)) -> Option<EntityId> {
        let id = self.get(from.0, from.1);
        self.set(from.0, from.1, None);
        self.set(to.0, to.1, id);
        id
    }

    pub fn clear(&mut self) {
        for row in self.cells.iter_mut() {
            row.fill(None);
        }
    }

    /// Every occupied cell as `(x, row, id)`.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, EntityId)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cols)| {
            cols.iter()
                .enumerate()
                .filter_map(move |(x, c)| c.map(|id| (x, row, id)))
        })
    }
}

/// Grid row occupied by a block standing at entity height `y`.
#[inline]
pub fn block_row(y: i32) -> i32 {
    y - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear() {
        let mut g = OccupancyGrid::new();
        g.set(3, 4, Some(EntityId(7)));
        assert_eq!(g.get(3, 4), Some(EntityId(7)));
        assert_eq!(g.get(4, 3), None);
        g.clear();
        assert_eq!(g.get(3, 4), None);
        assert_eq!(g.occupied().count(), 0);
    }

    #[test]
    fn probe_outside_is_empty() {
        let mut g = OccupancyGrid::new();
        g.set(0, 0, Some(EntityId(1)));
        assert_eq!(g.probe(0, 0), Some(EntityId(1)));
        assert_eq!(g.probe(-1, 0), None);
        assert_eq!(g.probe(0, -1), None);
        assert_eq!(g.probe(GRID_W as i32, 0), None);
        assert_eq!(g.probe(0, GRID_H as i32), None);
    }

    #[test]
    fn outside_is_never_free() {
        let g = OccupancyGrid::new();
        assert!(g.is_free(0, 0));
        assert!(!g.is_free(0, GRID_H as i32));
        assert!(!g.is_free(-1, 3));
    }

    #[test]
    fn relocate_moves_reference() {
        let mut g = OccupancyGrid::new();
        g.set(2, 2, Some(EntityId(9)));
        assert_eq!(g.relocate((2, 2), (3, 5)), Some(EntityId(9)));
        assert_eq!(g.get(2, 2), None);
        assert_eq!(g.get(3, 5), Some(EntityId(9)));
        let cells: Vec<_> = g.occupied().collect();
        assert_eq!(cells, vec![(3, 5, EntityId(9))]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn get_out_of_bounds_panics() {
        let g = OccupancyGrid::new();
        g.get(GRID_W, 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn set_out_of_bounds_panics() {
        let mut g = OccupancyGrid::new();
        g.set(0, GRID_H, None);
    }

    #[test]
    fn block_row_is_one_below() {
        assert_eq!(block_row(1), 0);
        assert_eq!(block_row(19), 18);
    }
}
