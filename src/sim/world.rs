/// WorldState: everything a running level consists of.
///
/// ## Ownership
///
///   - `registry` owns every entity.
///   - `grid` holds block ids only, never entities.
///   - `session` holds the avatar controller's state.
///
/// All block moves go through `move_block()`, which updates the grid cell
/// and the entity position together, so the two can only disagree through
/// a bug. `check_occupancy()` detects exactly that.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::entity::{AvatarPose, EntityId, EntityKind};
use crate::domain::grid::{block_row, OccupancyGrid};
use crate::domain::registry::EntityRegistry;
use crate::error::InvariantViolation;
use super::event::GameEvent;
use super::session::Session;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Nothing loaded yet, or a load is being applied.
    Loading,
    Active,
    /// Avatar reached a door; the next level is being loaded.
    Advancing,
    /// Lives ran out; the current level is being reloaded.
    Restarting,
    /// Avatar reached a door with no next level. Only a restart or a
    /// load leaves this phase.
    Complete,
}

pub struct WorldState {
    // ── Entities ──
    pub registry: EntityRegistry,
    pub grid: OccupancyGrid,

    // ── Controller ──
    pub session: Session,

    // ── Meta ──
    pub phase: Phase,
    pub rng: StdRng,
}

// ── Construction ──

impl WorldState {
    pub fn new(seed: u64) -> Self {
        WorldState {
            registry: EntityRegistry::new(),
            grid: OccupancyGrid::new(),
            session: Session::new(),
            phase: Phase::Loading,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

// ── Queries ──

impl WorldState {
    pub fn avatar_id(&self) -> Option<EntityId> {
        self.registry.avatar_id()
    }

    pub fn avatar_pos(&self) -> Option<(i32, i32)> {
        self.registry.avatar().map(|a| a.pos())
    }

    /// Block sitting in the avatar's carry slot, if it is carrying one.
    pub fn carried_block(&self) -> Option<EntityId> {
        if !self.session.carrying {
            return None;
        }
        let (x, y) = self.avatar_pos()?;
        self.grid.probe(x, y)
    }

    /// Registry and grid agree: each live block has exactly its own support
    /// cell, and every occupied cell names a live block standing on it.
    pub fn check_occupancy(&self) -> Result<(), InvariantViolation> {
        for b in self.registry.iter_kind(EntityKind::MovableBlock) {
            if self.grid.probe(b.x, block_row(b.y)) != Some(b.id) {
                return Err(InvariantViolation::UnreferencedBlock { id: b.id, x: b.x, y: b.y });
            }
        }
        for (x, row, id) in self.grid.occupied() {
            let ok = self.registry.get(id).map_or(false, |e| {
                e.is_block() && e.x == x as i32 && block_row(e.y) == row as i32
            });
            if !ok {
                return Err(InvariantViolation::DanglingCell { x, row, id });
            }
        }
        Ok(())
    }
}

// ── Mutation ──

impl WorldState {
    /// Move a non-block entity and report it.
    pub fn move_entity(&mut self, id: EntityId, to: (i32, i32), events: &mut Vec<GameEvent>) {
        if let Some(e) = self.registry.get_mut(id) {
            e.x = to.0;
            e.y = to.1;
            events.push(GameEvent::PositionChanged { id, x: to.0, y: to.1 });
        }
    }

    /// Move a block's grid reference and entity position together.
    /// `to` is the new entity position; its support row must be in the grid.
    pub fn move_block(&mut self, id: EntityId, to: (i32, i32), events: &mut Vec<GameEvent>) {
        let Some(b) = self.registry.get_mut(id) else { return };
        let from = (b.x as usize, block_row(b.y) as usize);
        b.x = to.0;
        b.y = to.1;
        self.grid.relocate(from, (to.0 as usize, block_row(to.1) as usize));
        events.push(GameEvent::PositionChanged { id, x: to.0, y: to.1 });
    }

    /// Remove an entity (phase one of removal; see `EntityRegistry`).
    /// A block also gives up its grid cell.
    pub fn kill(&mut self, id: EntityId, events: &mut Vec<GameEvent>) {
        let Some(e) = self.registry.get(id) else { return };
        if e.is_block() {
            let (x, row) = (e.x, block_row(e.y));
            if self.grid.probe(x, row) == Some(id) {
                self.grid.set(x as usize, row as usize, None);
            }
        }
        self.registry.mark_dead(id);
        events.push(GameEvent::EntityRemoved { id });
    }

    /// Emit a visual change if the avatar pose differs from `before`.
    pub fn refresh_pose(&mut self, before: AvatarPose, events: &mut Vec<GameEvent>) {
        let pose = self.session.pose();
        if pose == before {
            return;
        }
        if let Some(id) = self.avatar_id() {
            let visual = pose.sprite_name().to_string();
            if let Some(a) = self.registry.get_mut(id) {
                a.visual = visual.clone();
            }
            events.push(GameEvent::VisualChanged { id, visual });
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Facing;

    fn world_with_block() -> (WorldState, EntityId) {
        let mut w = WorldState::new(7);
        w.registry.spawn(EntityKind::Avatar, 2, 2, "MJ_left");
        let id = w.registry.spawn(EntityKind::MovableBlock, 4, 1, "MBLOCK").id;
        w.grid.set(4, 0, Some(id));
        (w, id)
    }

    #[test]
    fn consistent_world_passes_check() {
        let (w, _) = world_with_block();
        assert_eq!(w.check_occupancy(), Ok(()));
    }

    #[test]
    fn move_block_keeps_grid_in_sync() {
        let (mut w, id) = world_with_block();
        let mut events = vec![];
        w.move_block(id, (6, 3), &mut events);
        assert_eq!(w.grid.get(4, 0), None);
        assert_eq!(w.grid.get(6, 2), Some(id));
        assert_eq!(w.check_occupancy(), Ok(()));
        assert_eq!(events, vec![GameEvent::PositionChanged { id, x: 6, y: 3 }]);
    }

    #[test]
    fn stale_cell_is_reported() {
        let (mut w, id) = world_with_block();
        w.registry.mark_dead(id);
        assert_eq!(
            w.check_occupancy(),
            Err(InvariantViolation::DanglingCell { x: 4, row: 0, id })
        );
    }

    #[test]
    fn missing_cell_is_reported() {
        let (mut w, id) = world_with_block();
        w.grid.clear();
        assert_eq!(
            w.check_occupancy(),
            Err(InvariantViolation::UnreferencedBlock { id, x: 4, y: 1 })
        );
    }

    #[test]
    fn kill_block_frees_its_cell() {
        let (mut w, id) = world_with_block();
        let mut events = vec![];
        w.kill(id, &mut events);
        w.registry.sweep();
        assert_eq!(w.grid.get(4, 0), None);
        assert_eq!(w.check_occupancy(), Ok(()));
        assert_eq!(events, vec![GameEvent::EntityRemoved { id }]);
    }

    #[test]
    fn pose_change_updates_avatar_visual() {
        let (mut w, _) = world_with_block();
        let before = w.session.pose();
        let mut events = vec![];
        w.refresh_pose(before, &mut events);
        assert!(events.is_empty());

        w.session.facing = Facing::Left;
        w.refresh_pose(before, &mut events);
        let id = w.avatar_id().unwrap();
        assert_eq!(events, vec![GameEvent::VisualChanged { id, visual: "MJ_move_left".into() }]);
        assert_eq!(w.registry.avatar().map(|a| a.visual.as_str()), Some("MJ_move_left"));
    }

    #[test]
    fn carried_block_follows_carry_flag() {
        let mut w = WorldState::new(1);
        w.registry.spawn(EntityKind::Avatar, 3, 2, "MJ_left");
        let b = w.registry.spawn(EntityKind::MovableBlock, 3, 3, "MBLOCK").id;
        w.grid.set(3, 2, Some(b));
        assert_eq!(w.carried_block(), None);
        w.session.carrying = true;
        assert_eq!(w.carried_block(), Some(b));
    }
}
