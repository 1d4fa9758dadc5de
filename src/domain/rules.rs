/// Movement and carry rules: truth-table driven.
///
/// Pure functions over the occupancy grid. They decide "what is legal" and
/// where things end up, without performing the move.
///
/// Rows are relative to a mover at `(x, y)` looking at column `c = x + d`
/// (see `grid.rs` for the row convention):
///
///   head  = row y      body  = row y-1
///   foot  = row y-2    below = row y-3
///
/// ## Facing Transition
/// ┌──────────────────────────┬──────────────────────┐
/// │ Current facing            │ Input d ∈ {-1, +1}   │
/// ├──────────────────────────┼──────────────────────┤
/// │ Forward (0)               │ facing = d           │
/// │ facing == -d              │ facing = Forward     │
/// │ facing == d               │ unchanged            │
/// └──────────────────────────┴──────────────────────┘
/// Reversing always passes through Forward. A step is only taken on an
/// input whose transition left the facing unchanged.
///
/// ## Avatar Step (destination column c)
/// ┌─────────┬──────────────────────────────────┬─────────────┬──────────────────┐
/// │ Pattern │ Condition at column c             │ Destination │ Extra if carrying│
/// ├─────────┼──────────────────────────────────┼─────────────┼──────────────────┤
/// │ Descend │ body empty, foot empty, below set │ (c, y-1)    │ none             │
/// │ Ascend  │ body set, head empty              │ (c, y+1)    │ row y+1 free     │
/// │ Level   │ foot set, body empty              │ (c, y)      │ head free        │
/// │ —       │ otherwise                         │ blocked     │                  │
/// └─────────┴──────────────────────────────────┴─────────────┴──────────────────┘
/// Columns or destinations outside the world are blocked.
///
/// ## AI Step (heading h, ahead = x + h, behind = x - h)
/// ┌──────────────────────────────────────┬──────────────┐
/// │ Condition                             │ Result       │
/// ├──────────────────────────────────────┼──────────────┤
/// │ Level pattern holds ahead             │ step ahead   │
/// │ else foot set behind                  │ flip heading │
/// │ otherwise                             │ stay         │
/// └──────────────────────────────────────┴──────────────┘

use super::entity::{Facing, Heading, MoveDir};
use super::grid::OccupancyGrid;

/// Upper bound of entity coordinates (exclusive).
pub const WORLD_W: i32 = super::grid::GRID_W as i32;
pub const WORLD_H: i32 = super::grid::GRID_H as i32;

#[inline]
pub fn in_world(x: i32, y: i32) -> bool {
    (0..WORLD_W).contains(&x) && (0..WORLD_H).contains(&y)
}

// ── Facing ──

/// Apply one horizontal input to the facing. See truth table above.
pub fn turn(facing: Facing, dir: MoveDir) -> Facing {
    let d = dir.dx();
    if facing == Facing::Forward || facing.dx() == -d {
        Facing::from_dx(facing.dx() + d)
    } else {
        facing
    }
}

// ── Avatar step ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepKind {
    Descend,
    Ascend,
    Level,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Step {
    pub kind: StepKind,
    pub to: (i32, i32),
}

impl Step {
    pub fn delta(&self, from: (i32, i32)) -> (i32, i32) {
        (self.to.0 - from.0, self.to.1 - from.1)
    }
}

/// Level pattern at column `c` for a mover at height `y`:
/// something to stand on, nothing in the way.
#[inline]
pub fn has_footing(grid: &OccupancyGrid, c: i32, y: i32) -> bool {
    grid.is_occupied(c, y - 2) && !grid.is_occupied(c, y - 1)
}

/// Resolve one horizontal avatar step. `None` = blocked.
pub fn resolve_step(grid: &OccupancyGrid, x: i32, y: i32, dir: MoveDir, carrying: bool) -> Option<Step> {
    let c = x + dir.dx();
    if !(0..WORLD_W).contains(&c) {
        return None;
    }

    let head = grid.is_occupied(c, y);
    let body = grid.is_occupied(c, y - 1);
    let foot = grid.is_occupied(c, y - 2);
    let below = grid.is_occupied(c, y - 3);

    let step = if !body && !foot && below {
        Step { kind: StepKind::Descend, to: (c, y - 1) }
    } else if body && !head {
        if carrying && !grid.is_free(c, y + 1) {
            return None;
        }
        Step { kind: StepKind::Ascend, to: (c, y + 1) }
    } else if foot && !body {
        if carrying && !grid.is_free(c, y) {
            return None;
        }
        Step { kind: StepKind::Level, to: (c, y) }
    } else {
        return None;
    };

    if in_world(step.to.0, step.to.1) { Some(step) } else { None }
}

// ── AI ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AiMove {
    Step { to: (i32, i32) },
    Turn(Heading),
    Stay,
}

/// Decide one AI move. See truth table above.
pub fn ai_move(grid: &OccupancyGrid, x: i32, y: i32, heading: Heading) -> AiMove {
    let ahead = x + heading.dx();
    let behind = x - heading.dx();
    if (0..WORLD_W).contains(&ahead) && has_footing(grid, ahead, y) {
        AiMove::Step { to: (ahead, y) }
    } else if (0..WORLD_W).contains(&behind) && grid.is_occupied(behind, y - 2) {
        AiMove::Turn(heading.flipped())
    } else {
        AiMove::Stay
    }
}

// ── Carry ──

/// Grid cell `(x, row)` a pickup looks at: the block beside the avatar's
/// body when facing sideways, the block underfoot when facing forward.
pub fn pickup_cell(x: i32, y: i32, facing: Facing) -> (i32, i32) {
    match facing {
        Facing::Forward => (x, y - 2),
        side => (x + side.dx(), y - 1),
    }
}

/// Carry slot of an avatar at `(x, y)`: grid cell directly above its body.
pub fn carry_slot(x: i32, y: i32) -> (i32, i32) {
    (x, y)
}

/// Grid cell a drop places the block into. Forward-facing drops are illegal.
pub fn drop_cell(x: i32, y: i32, facing: Facing) -> Option<(i32, i32)> {
    match facing {
        Facing::Forward => None,
        side => Some((x + side.dx(), y)),
    }
}

/// Final resting row of a block released at `(x, row)`, and the number of
/// one-row fall steps to get there. Falls while the cell below is inside the
/// grid and empty; row 0 is the floor.
pub fn settle_row(grid: &OccupancyGrid, x: i32, row: i32) -> (i32, usize) {
    let mut r = row;
    let mut steps = 0;
    while r > 0 && grid.is_free(x, r - 1) {
        r -= 1;
        steps += 1;
    }
    (r, steps)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
