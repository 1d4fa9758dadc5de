/// Entities: avatar, friendly characters, enemies, blocks, decoration, doors.
///
/// Every entity lives in the registry and is addressed by its `EntityId`.
/// Nothing else holds an entity by value; the occupancy grid and the session
/// only keep ids, which resolve to `None` once an entity is gone.

use serde::{Deserialize, Serialize};

/// Stable identity, assigned by the registry and never reused within a level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Avatar,
    FriendlyCharacter,
    Enemy,
    MovableBlock,
    Decoration,
    Door,
}

impl EntityKind {
    /// Kinds driven by the per-tick AI pass.
    pub fn is_ai(self) -> bool {
        matches!(self, EntityKind::FriendlyCharacter | EntityKind::Enemy)
    }
}

/// Horizontal heading of an AI mover.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Heading {
    Left,
    Right,
}

impl Heading {
    pub fn dx(self) -> i32 {
        match self {
            Heading::Left => -1,
            Heading::Right => 1,
        }
    }

    pub fn flipped(self) -> Heading {
        match self {
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
        }
    }
}

/// Horizontal input direction for the avatar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
}

impl MoveDir {
    pub fn dx(self) -> i32 {
        match self {
            MoveDir::Left => -1,
            MoveDir::Right => 1,
        }
    }
}

/// Avatar facing. `Forward` faces the player (towards the screen).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Facing {
    Left,
    #[default]
    Forward,
    Right,
}

impl Facing {
    pub fn dx(self) -> i32 {
        match self {
            Facing::Left => -1,
            Facing::Forward => 0,
            Facing::Right => 1,
        }
    }

    /// Inverse of `dx`; any value outside -1..=1 clamps to the nearest side.
    pub fn from_dx(dx: i32) -> Facing {
        match dx {
            i32::MIN..=-1 => Facing::Left,
            0 => Facing::Forward,
            _ => Facing::Right,
        }
    }
}

/// What the renderer should show for the avatar.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AvatarPose {
    pub facing: Facing,
    pub carrying: bool,
}

impl AvatarPose {
    /// Sprite name in the classic sprite set.
    pub fn sprite_name(self) -> &'static str {
        match (self.facing, self.carrying) {
            (Facing::Left, false) => "MJ_move_left",
            (Facing::Left, true) => "MJ_move_left_up",
            (Facing::Right, false) => "MJ_move",
            (Facing::Right, true) => "MJ_move_right_up",
            (Facing::Forward, false) => "MJ_left",
            (Facing::Forward, true) => "MJ_left_up",
        }
    }
}

/// An item held by a friendly character until the avatar collects it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Collectible {
    pub token: String,
    /// Still held by the character (false once handed to the avatar).
    pub carried: bool,
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: i32,
    pub y: i32,
    /// Opaque to the core; handed to the renderer as-is.
    pub visual: String,
    pub heading: Heading,
    /// Blocks only: part of the terrain, cannot be carried.
    pub anchored: bool,
    pub collectible: Option<Collectible>,
    pub alive: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, x: i32, y: i32, visual: impl Into<String>) -> Self {
        Entity {
            id,
            kind,
            x,
            y,
            visual: visual.into(),
            heading: Heading::Left,
            anchored: false,
            collectible: None,
            alive: true,
        }
    }

    pub fn pos(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn is_block(&self) -> bool {
        self.kind == EntityKind::MovableBlock
    }

    pub fn is_carryable(&self) -> bool {
        self.kind == EntityKind::MovableBlock && !self.anchored
    }

    /// Does this friendly character still hold an item for the avatar?
    pub fn has_collectible(&self) -> bool {
        self.collectible.as_ref().map_or(false, |c| c.carried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_dx_round_trips_through_from_dx() {
        for f in [Facing::Left, Facing::Forward, Facing::Right] {
            assert_eq!(Facing::from_dx(f.dx()), f);
        }
        assert_eq!(Facing::from_dx(-2), Facing::Left);
        assert_eq!(Facing::from_dx(5), Facing::Right);
    }

    #[test]
    fn heading_flip() {
        assert_eq!(Heading::Left.flipped(), Heading::Right);
        assert_eq!(Heading::Right.flipped().dx(), -1);
    }

    #[test]
    fn pose_sprite_names() {
        let pose = AvatarPose { facing: Facing::Right, carrying: true };
        assert_eq!(pose.sprite_name(), "MJ_move_right_up");
        let pose = AvatarPose { facing: Facing::Forward, carrying: false };
        assert_eq!(pose.sprite_name(), "MJ_left");
    }

    #[test]
    fn only_loose_blocks_are_carryable() {
        let mut b = Entity::new(EntityId(1), EntityKind::MovableBlock, 0, 1, "MBLOCK");
        assert!(b.is_carryable());
        b.anchored = true;
        assert!(b.is_block());
        assert!(!b.is_carryable());
        let e = Entity::new(EntityId(2), EntityKind::Enemy, 0, 2, "enemy");
        assert!(!e.is_carryable());
    }

    #[test]
    fn collectible_flag() {
        let mut f = Entity::new(EntityId(3), EntityKind::FriendlyCharacter, 2, 2, "friend");
        assert!(!f.has_collectible());
        f.collectible = Some(Collectible { token: "ring".into(), carried: true });
        assert!(f.has_collectible());
        f.collectible.as_mut().unwrap().carried = false;
        assert!(!f.has_collectible());
    }
}
