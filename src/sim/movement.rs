/// Movement: avatar steps and the AI pass.
///
/// Legality comes from `domain::rules`; this module applies the outcome to
/// the world (positions, carried block, debounce flag, pose events).

use log::debug;

use crate::domain::entity::{EntityId, EntityKind, MoveDir};
use crate::domain::rules::{self, AiMove};
use super::event::GameEvent;
use super::world::WorldState;

// ══════════════════════════════════════════════════════════════
// Avatar
// ══════════════════════════════════════════════════════════════

/// One horizontal input. Turns the avatar first; only steps when the input
/// left the facing unchanged. Returns true if the avatar moved.
pub fn move_avatar(world: &mut WorldState, dir: MoveDir, events: &mut Vec<GameEvent>) -> bool {
    let Some(id) = world.avatar_id() else { return false };
    let before = world.session.pose();

    world.session.prev_facing = world.session.facing;
    world.session.facing = rules::turn(world.session.facing, dir);
    world.refresh_pose(before, events);

    if world.session.prev_facing != world.session.facing {
        return false;
    }

    let Some(from) = world.avatar_pos() else { return false };
    let carried = world.carried_block();
    let Some(step) = rules::resolve_step(&world.grid, from.0, from.1, dir, carried.is_some()) else {
        return false;
    };

    let (dx, dy) = step.delta(from);
    if let Some(block) = carried {
        // block entity sits one above the carry slot
        world.move_block(block, (from.0 + dx, from.1 + 1 + dy), events);
    }
    world.move_entity(id, step.to, events);
    world.session.debounce_armed = true;
    debug!("avatar {:?} {:?} -> {:?}", step.kind, from, step.to);
    true
}

// ══════════════════════════════════════════════════════════════
// AI
// ══════════════════════════════════════════════════════════════

pub fn move_friendlies(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    move_kind(world, EntityKind::FriendlyCharacter, events);
}

/// Enemy pass. Every enemy step re-arms the collision debounce.
pub fn move_enemies(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if move_kind(world, EntityKind::Enemy, events) > 0 {
        world.session.debounce_armed = true;
    }
}

/// Run one AI decision for each live entity of `kind`. Returns steps taken.
fn move_kind(world: &mut WorldState, kind: EntityKind, events: &mut Vec<GameEvent>) -> usize {
    let mut steps = 0;
    for id in world.registry.ids_of(kind) {
        if ai_step(world, id, events) {
            steps += 1;
        }
    }
    steps
}

fn ai_step(world: &mut WorldState, id: EntityId, events: &mut Vec<GameEvent>) -> bool {
    let Some(e) = world.registry.get(id) else { return false };
    match rules::ai_move(&world.grid, e.x, e.y, e.heading) {
        AiMove::Step { to } => {
            world.move_entity(id, to, events);
            true
        }
        AiMove::Turn(heading) => {
            if let Some(e) = world.registry.get_mut(id) {
                e.heading = heading;
            }
            false
        }
        AiMove::Stay => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{Facing, Heading};
    use crate::sim::world::testing::world_from;

    #[test]
    fn first_press_only_turns() {
        let mut w = world_from(&[
            " M  ",
            "####",
        ]);
        let mut ev = vec![];
        assert!(!move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.session.facing, Facing::Right);
        assert_eq!(w.avatar_pos(), Some((1, 2)));
        assert!(matches!(ev.as_slice(), [GameEvent::VisualChanged { .. }]));

        assert!(move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.avatar_pos(), Some((2, 2)));
    }

    #[test]
    fn reversing_takes_two_presses_then_steps() {
        let mut w = world_from(&[
            " M  ",
            "####",
        ]);
        w.session.facing = Facing::Right;
        let mut ev = vec![];
        assert!(!move_avatar(&mut w, MoveDir::Left, &mut ev));
        assert_eq!(w.session.facing, Facing::Forward);
        assert!(!move_avatar(&mut w, MoveDir::Left, &mut ev));
        assert_eq!(w.session.facing, Facing::Left);
        assert!(move_avatar(&mut w, MoveDir::Left, &mut ev));
        assert_eq!(w.avatar_pos(), Some((0, 2)));
    }

    #[test]
    fn climb_and_descend() {
        let mut w = world_from(&[
            "      ",
            " M#   ",
            "######",
        ]);
        w.session.facing = Facing::Right;
        let mut ev = vec![];
        assert!(move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.avatar_pos(), Some((2, 3)));
        assert!(move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.avatar_pos(), Some((3, 2)));
    }

    #[test]
    fn blocked_step_is_a_no_op() {
        let mut w = world_from(&[
            "  #",
            " M#",
            "###",
        ]);
        w.session.facing = Facing::Right;
        let mut ev = vec![];
        assert!(!move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.avatar_pos(), Some((1, 2)));
        assert!(ev.is_empty());
    }

    #[test]
    fn carried_block_moves_with_avatar() {
        let mut w = world_from(&[
            " B   ",
            " M   ",
            "#####",
        ]);
        // block at entity (1, 3) sits in the carry slot, grid row 2
        w.session.carrying = true;
        w.session.facing = Facing::Right;
        let block = w.carried_block().unwrap();
        let mut ev = vec![];
        assert!(move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.avatar_pos(), Some((2, 2)));
        assert_eq!(w.registry.get(block).unwrap().pos(), (2, 3));
        assert_eq!(w.grid.get(2, 2), Some(block));
        assert_eq!(w.grid.get(1, 2), None);
        assert_eq!(w.check_occupancy(), Ok(()));
    }

    #[test]
    fn carrying_blocks_ascend_under_low_ceiling() {
        let mut w = world_from(&[
            "  #  ",
            " B   ",
            " M#  ",
            "#####",
        ]);
        w.session.carrying = true;
        w.session.facing = Facing::Right;
        let mut ev = vec![];
        assert!(!move_avatar(&mut w, MoveDir::Right, &mut ev));
        assert_eq!(w.avatar_pos(), Some((1, 2)));
    }

    #[test]
    fn avatar_step_rearms_debounce() {
        let mut w = world_from(&[
            " M ",
            "###",
        ]);
        w.session.facing = Facing::Left;
        w.session.debounce_armed = false;
        let mut ev = vec![];
        assert!(move_avatar(&mut w, MoveDir::Left, &mut ev));
        assert!(w.session.debounce_armed);
    }

    #[test]
    fn enemy_walks_and_flips_at_ledge() {
        let mut w = world_from(&[
            "  E ",
            "### ",
        ]);
        let id = w.registry.ids_of(EntityKind::Enemy)[0];
        w.registry.get_mut(id).unwrap().heading = Heading::Right;
        w.session.debounce_armed = false;
        let mut ev = vec![];

        move_enemies(&mut w, &mut ev);
        assert_eq!(w.registry.get(id).unwrap().heading, Heading::Left);
        assert_eq!(w.registry.get(id).unwrap().pos(), (2, 2));
        assert!(!w.session.debounce_armed);

        move_enemies(&mut w, &mut ev);
        assert_eq!(w.registry.get(id).unwrap().pos(), (1, 2));
        assert!(w.session.debounce_armed);
    }

    #[test]
    fn friendly_step_leaves_debounce_alone() {
        let mut w = world_from(&[
            " F ",
            "###",
        ]);
        w.session.debounce_armed = false;
        let mut ev = vec![];
        move_friendlies(&mut w, &mut ev);
        assert_eq!(w.registry.iter_kind(EntityKind::FriendlyCharacter).next().unwrap().pos(), (0, 2));
        assert!(!w.session.debounce_armed);
    }
}
