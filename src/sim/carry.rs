/// Carry and drop: pickup, lateral drop, cascading fall, crush.
///
/// The carried block stays a normal block: it keeps its grid cell (the
/// carry slot, directly above the avatar) and moves with the avatar.

use log::debug;

use crate::domain::entity::{EntityId, EntityKind, Facing};
use crate::domain::rules;
use super::event::{AudioCue, GameEvent};
use super::world::WorldState;

/// Result of a successful drop.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DropOutcome {
    /// Final entity position of the block.
    pub landed: (i32, i32),
    /// Rows fallen after leaving the avatar's hands.
    pub fall: usize,
    pub crushed: Vec<EntityId>,
}

// ══════════════════════════════════════════════════════════════
// Pickup
// ══════════════════════════════════════════════════════════════

/// Lift the block beside the avatar (facing Left/Right) or under its feet
/// (facing Forward, the avatar sinks into the freed cell).
/// Returns false and changes nothing when there is nothing to lift.
pub fn pickup(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if world.session.carrying {
        return false;
    }
    let Some(id) = world.avatar_id() else { return false };
    let Some((x, y)) = world.avatar_pos() else { return false };
    let facing = world.session.facing;

    let (cx, crow) = rules::pickup_cell(x, y, facing);
    let Some(block) = world.grid.probe(cx, crow) else { return false };
    if !world.registry.get(block).map_or(false, |b| b.is_carryable()) {
        return false;
    }

    let new_y = if facing == Facing::Forward { y - 1 } else { y };
    let (sx, srow) = rules::carry_slot(x, new_y);
    // forward: the slot is the avatar's own body row, free by construction
    if facing != Facing::Forward && !world.grid.is_free(sx, srow) {
        return false;
    }

    let before = world.session.pose();
    world.move_block(block, (sx, srow + 1), events);
    if new_y != y {
        world.move_entity(id, (x, new_y), events);
    }
    world.session.carrying = true;
    world.refresh_pose(before, events);
    debug!("picked up {:?} from ({}, row {})", block, cx, crow);
    debug_assert_eq!(world.check_occupancy(), Ok(()));
    true
}

// ══════════════════════════════════════════════════════════════
// Drop
// ══════════════════════════════════════════════════════════════

/// Put the carried block down beside the avatar, let it fall, and crush
/// any enemy where it lands. `None` when the drop is not possible.
pub fn drop_block(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Option<DropOutcome> {
    if !world.session.carrying {
        return None;
    }
    let (x, y) = world.avatar_pos()?;
    let (dx, mut row) = rules::drop_cell(x, y, world.session.facing)?;
    if !world.grid.is_free(dx, row) {
        return None;
    }
    let block = world.carried_block()?;

    let before = world.session.pose();
    world.move_block(block, (dx, row + 1), events);

    // cascade, one row per step
    let mut fall = 0;
    while row > 0 && world.grid.is_free(dx, row - 1) {
        row -= 1;
        fall += 1;
        world.move_block(block, (dx, row + 1), events);
    }
    let landed = (dx, row + 1);

    let crushed = crush_at(world, landed, events);
    world.session.carrying = false;
    world.refresh_pose(before, events);

    debug!("dropped {:?} at {:?} after {} rows, crushed {}", block, landed, fall, crushed.len());
    debug_assert_eq!(world.check_occupancy(), Ok(()));
    Some(DropOutcome { landed, fall, crushed })
}

/// Remove every enemy standing exactly on `pos`.
fn crush_at(world: &mut WorldState, pos: (i32, i32), events: &mut Vec<GameEvent>) -> Vec<EntityId> {
    let victims: Vec<EntityId> = world
        .registry
        .at(EntityKind::Enemy, pos.0, pos.1)
        .map(|e| e.id)
        .collect();
    for &id in &victims {
        world.kill(id, events);
        events.push(GameEvent::Cue(AudioCue::Crush));
        debug!("crushed {:?} at {:?}", id, pos);
    }
    if !victims.is_empty() {
        world.registry.sweep();
    }
    victims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::testing::world_from;

    fn scenario_a() -> WorldState {
        world_from(&[
            "     M",
            "     B",
            "     #",
            "     #",
            "######",
        ])
    }

    #[test]
    fn forward_pickup_lifts_block_underfoot() {
        let mut w = scenario_a();
        let block = w.grid.get(5, 3).unwrap();
        let mut ev = vec![];

        assert!(pickup(&mut w, &mut ev));
        assert!(w.session.carrying);
        assert_eq!(w.avatar_pos(), Some((5, 4)));
        assert_eq!(w.grid.get(5, 3), None);
        assert_eq!(w.grid.get(5, 4), Some(block));
        assert_eq!(w.registry.get(block).unwrap().pos(), (5, 5));
        assert_eq!(w.check_occupancy(), Ok(()));
        assert!(ev.iter().any(|e| matches!(e, GameEvent::VisualChanged { .. })));

        let snapshot = w.grid.clone();
        let mut ev = vec![];
        assert!(!pickup(&mut w, &mut ev));
        assert_eq!(w.grid, snapshot);
        assert!(ev.is_empty());
    }

    #[test]
    fn side_pickup_lifts_neighbour() {
        let mut w = world_from(&[
            " MB ",
            "####",
        ]);
        w.session.facing = Facing::Right;
        let block = w.grid.get(2, 1).unwrap();
        let mut ev = vec![];
        assert!(pickup(&mut w, &mut ev));
        assert_eq!(w.grid.get(2, 1), None);
        assert_eq!(w.grid.get(1, 2), Some(block));
        assert_eq!(w.avatar_pos(), Some((1, 2)));
        assert_eq!(w.carried_block(), Some(block));
    }

    #[test]
    fn anchored_blocks_stay_put() {
        let mut w = world_from(&[
            " M# ",
            "####",
        ]);
        w.session.facing = Facing::Right;
        let mut ev = vec![];
        assert!(!pickup(&mut w, &mut ev));
        assert!(!w.session.carrying);
    }

    #[test]
    fn pickup_needs_free_carry_slot() {
        let mut w = world_from(&[
            " # ",
            " MB",
            "###",
        ]);
        w.session.facing = Facing::Right;
        let mut ev = vec![];
        assert!(!pickup(&mut w, &mut ev));
        assert!(w.grid.get(2, 1).is_some());
    }

    fn scenario_b() -> WorldState {
        let mut w = world_from(&[
            "   B",
            "   M",
            "   #",
            "   #",
            " EE#",
            "####",
        ]);
        w.session.carrying = true;
        w.session.facing = Facing::Left;
        w
    }

    #[test]
    fn drop_cascades_to_support_and_clears_carry() {
        let mut w = scenario_b();
        let block = w.carried_block().unwrap();
        let mut ev = vec![];

        let out = drop_block(&mut w, &mut ev).unwrap();
        assert_eq!(out.landed, (2, 2));
        assert_eq!(out.fall, 4);
        assert!(out.fall <= 5);
        assert!(!w.session.carrying);
        assert_eq!(w.grid.get(3, 5), None);
        assert_eq!(w.grid.get(2, 1), Some(block));
        assert_eq!(w.check_occupancy(), Ok(()));
    }

    #[test]
    fn drop_crushes_only_the_enemy_underneath() {
        let mut w = scenario_b();
        let mut ev = vec![];
        let out = drop_block(&mut w, &mut ev).unwrap();

        assert_eq!(out.crushed.len(), 1);
        let left: Vec<_> = w.registry.iter_kind(EntityKind::Enemy).map(|e| e.pos()).collect();
        assert_eq!(left, vec![(1, 2)]);
        assert!(ev.contains(&GameEvent::Cue(AudioCue::Crush)));
        assert!(ev.contains(&GameEvent::EntityRemoved { id: out.crushed[0] }));
    }

    #[test]
    fn drop_facing_forward_is_a_no_op() {
        let mut w = scenario_b();
        w.session.facing = Facing::Forward;
        let mut ev = vec![];
        assert_eq!(drop_block(&mut w, &mut ev), None);
        assert!(w.session.carrying);
        assert!(ev.is_empty());
    }

    #[test]
    fn drop_into_occupied_cell_is_a_no_op() {
        let mut w = world_from(&[
            "  BB",
            "   M",
            "####",
        ]);
        w.session.carrying = true;
        w.session.facing = Facing::Left;
        let mut ev = vec![];
        assert_eq!(drop_block(&mut w, &mut ev), None);
        assert!(w.session.carrying);
    }

    #[test]
    fn drop_without_block_is_a_no_op() {
        let mut w = world_from(&[
            " M ",
            "###",
        ]);
        w.session.facing = Facing::Left;
        let mut ev = vec![];
        assert_eq!(drop_block(&mut w, &mut ev), None);
    }

    #[test]
    fn pickup_then_drop_restores_invariant() {
        let mut w = scenario_a();
        let mut ev = vec![];
        assert!(pickup(&mut w, &mut ev));
        w.session.facing = Facing::Left;
        let out = drop_block(&mut w, &mut ev).unwrap();
        assert_eq!(out.landed, (4, 2));
        assert_eq!(w.check_occupancy(), Ok(()));
    }
}
