/// Per-level session state owned by the engine.
///
/// Everything the avatar's controller remembers between calls lives here,
/// with one explicit `reset` used when a level is (re)loaded.

use crate::domain::entity::{AvatarPose, Facing};

#[derive(Clone, Debug)]
pub struct Session {
    pub facing: Facing,
    pub prev_facing: Facing,
    /// The avatar holds a block in its carry slot.
    pub carrying: bool,
    pub lives: i32,
    /// Lives the loader granted for this level.
    pub starting_lives: i32,
    pub item_count: usize,
    /// Collected tokens in pickup order.
    pub collected: Vec<String>,
    /// Collectibles still held by friendly characters.
    pub items_remaining: usize,
    /// One-shot guard: an enemy overlap only costs a life while armed.
    pub debounce_armed: bool,
    pub current_level: String,
    pub next_level: String,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            facing: Facing::Forward,
            prev_facing: Facing::Forward,
            carrying: false,
            lives: 0,
            starting_lives: 0,
            item_count: 0,
            collected: Vec::new(),
            items_remaining: 0,
            debounce_armed: true,
            current_level: String::new(),
            next_level: String::new(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the per-level fields before a load. Level ids, lives and the
    /// debounce flag are left to the caller.
    pub fn reset(&mut self) {
        self.facing = Facing::Forward;
        self.prev_facing = Facing::Forward;
        self.carrying = false;
        self.item_count = 0;
        self.collected.clear();
        self.items_remaining = 0;
    }

    pub fn pose(&self) -> AvatarPose {
        AvatarPose { facing: self.facing, carrying: self.carrying }
    }

    /// A level has been loaded into this session.
    pub fn is_active(&self) -> bool {
        !self.current_level.is_empty()
    }

    /// Record a collected token. Returns its HUD slot.
    pub fn collect(&mut self, token: &str) -> usize {
        self.collected.push(token.to_string());
        self.item_count += 1;
        self.items_remaining = self.items_remaining.saturating_sub(1);
        self.collected.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_level_ids_and_lives() {
        let mut s = Session::new();
        s.current_level = "a".into();
        s.next_level = "b".into();
        s.lives = 2;
        s.facing = Facing::Left;
        s.prev_facing = Facing::Left;
        s.carrying = true;
        s.items_remaining = 1;
        s.collect("ring");
        s.debounce_armed = false;

        s.reset();
        assert_eq!(s.facing, Facing::Forward);
        assert_eq!(s.prev_facing, Facing::Forward);
        assert!(!s.carrying);
        assert_eq!(s.item_count, 0);
        assert!(s.collected.is_empty());
        assert_eq!(s.current_level, "a");
        assert_eq!(s.lives, 2);
        assert!(!s.debounce_armed);
    }

    #[test]
    fn collect_tracks_order_and_remaining() {
        let mut s = Session::new();
        s.items_remaining = 2;
        assert_eq!(s.collect("ring"), 0);
        assert_eq!(s.collect("coin"), 1);
        assert_eq!(s.collected, vec!["ring".to_string(), "coin".to_string()]);
        assert_eq!(s.item_count, 2);
        assert_eq!(s.items_remaining, 0);
    }

    #[test]
    fn inactive_until_a_level_is_named() {
        let mut s = Session::new();
        assert!(!s.is_active());
        s.current_level = "level1".into();
        assert!(s.is_active());
    }
}
