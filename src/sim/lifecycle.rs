/// Level lifecycle and the engine facade.
///
/// ## Phases
///
///   Loading ──▶ Active ──▶ Advancing  (avatar on a door)
///                    ├───▶ Restarting (lives exhausted)
///                    └───▶ Complete   (door on the last level)
///   Advancing / Restarting ──▶ Loading ──▶ Active
///
/// ## Reset
///
/// A reset loads and validates the new level *before* touching anything,
/// so a missing or broken level leaves the running one intact. Only then
/// are the registry, grid, session and HUD cleared and rebuilt.
///
/// `Engine` owns the world and the loader, forwards the player operations
/// to `movement` / `carry` / `collision`, and queues their events until the
/// driver calls `take_events()`.

use std::collections::HashSet;

use log::{debug, info, warn};
use rand::Rng;

use crate::domain::entity::{Collectible, EntityKind, Heading, MoveDir};
use crate::domain::grid::{block_row, OccupancyGrid, GRID_H, GRID_W};
use crate::domain::rules;
use crate::error::{EngineError, InvariantViolation, LoadError, SaveError};
use super::carry::{self, DropOutcome};
use super::collision::{self, Contact};
use super::event::GameEvent;
use super::movement;
use super::save;
use super::world::{Phase, WorldState};

pub const ADVANCE_NOTICE: &str = "Next Level loading...";
pub const RESTART_NOTICE: &str = "Your lives are gone. Restarting level";
pub const COMPLETE_NOTICE: &str = "All levels cleared!";

// ══════════════════════════════════════════════════════════════
// Collaborator interfaces
// ══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LevelRequest {
    Named(String),
    /// Let the loader ask the player which level or saved game to open.
    Prompt,
}

/// Where loader output came from. Both origins read entity heights the
/// same way: a block at `(x, y)` stands on grid row `y - 1`.
///
/// A file opened through the prompt uses this convention as well, and its
/// blocks are registered in the occupancy grid like any other load. A
/// prompt-only row offset (row `y`) would only matter to a loader that
/// skips the grid; such a loader could not support movement or drops, so
/// there is one convention and saved games round-trip through it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LevelOrigin {
    #[default]
    Layout,
    /// A snapshot written by `Engine::save`: collected items and the carry
    /// flag are restored from it.
    SavedGame,
}

#[derive(Clone, PartialEq, Debug)]
pub struct EntitySpec {
    pub kind: EntityKind,
    pub visual: String,
    pub x: i32,
    pub y: i32,
    pub anchored: bool,
    pub collectible: Option<Collectible>,
}

impl EntitySpec {
    pub fn new(kind: EntityKind, x: i32, y: i32, visual: impl Into<String>) -> Self {
        EntitySpec { kind, visual: visual.into(), x, y, anchored: false, collectible: None }
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct LevelData {
    pub entities: Vec<EntitySpec>,
    pub lives: i32,
    pub current: String,
    pub next: String,
    pub origin: LevelOrigin,
    /// Saved games only: the avatar was holding the block in its carry slot.
    pub carrying: bool,
}

impl LevelData {
    /// Reject data the engine cannot hold: a missing or second avatar,
    /// positions outside the world, two blocks on one support cell.
    pub fn validate(&self) -> Result<(), LoadError> {
        let avatars = self.entities.iter().filter(|e| e.kind == EntityKind::Avatar).count();
        if avatars != 1 {
            return Err(LoadError::Invalid(format!("expected one avatar, found {avatars}")));
        }

        let mut cells = HashSet::new();
        for e in &self.entities {
            if e.kind == EntityKind::MovableBlock {
                let row = block_row(e.y);
                if !OccupancyGrid::in_bounds(e.x, row) {
                    return Err(LoadError::Invalid(format!(
                        "block at ({}, {}) is outside the {GRID_W}x{GRID_H} grid", e.x, e.y
                    )));
                }
                if !cells.insert((e.x, row)) {
                    return Err(LoadError::Invalid(format!("two blocks at ({}, {})", e.x, e.y)));
                }
            } else if !rules::in_world(e.x, e.y) {
                return Err(LoadError::Invalid(format!(
                    "{:?} at ({}, {}) is outside the world", e.kind, e.x, e.y
                )));
            }
        }
        Ok(())
    }
}

pub trait LevelLoader {
    fn load(&mut self, request: &LevelRequest) -> Result<LevelData, LoadError>;
}

pub trait LevelSaver {
    fn save(&mut self, name: &str, data: &LevelData) -> Result<(), SaveError>;
    /// A save under `name` is already stored.
    fn exists(&self, name: &str) -> bool;
}

// ══════════════════════════════════════════════════════════════
// Engine
// ══════════════════════════════════════════════════════════════

pub struct Engine<L: LevelLoader> {
    world: WorldState,
    loader: L,
    events: Vec<GameEvent>,
}

impl<L: LevelLoader> Engine<L> {
    pub fn new(loader: L, seed: u64) -> Self {
        Engine { world: WorldState::new(seed), loader, events: Vec::new() }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Drain queued events in emission order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn check_occupancy(&self) -> Result<(), InvariantViolation> {
        self.world.check_occupancy()
    }

    // ── Player operations ──

    pub fn move_avatar(&mut self, dir: MoveDir) -> bool {
        movement::move_avatar(&mut self.world, dir, &mut self.events)
    }

    pub fn pickup(&mut self) -> bool {
        carry::pickup(&mut self.world, &mut self.events)
    }

    pub fn drop_block(&mut self) -> Option<DropOutcome> {
        carry::drop_block(&mut self.world, &mut self.events)
    }

    // ── Per-tick passes ──

    pub fn move_friendlies(&mut self) {
        movement::move_friendlies(&mut self.world, &mut self.events);
    }

    pub fn move_enemies(&mut self) {
        movement::move_enemies(&mut self.world, &mut self.events);
    }

    /// Resolve avatar contacts. Running out of lives restarts the level.
    pub fn check_collisions(&mut self) -> Result<Contact, EngineError> {
        let contact = collision::check_collisions(&mut self.world, &mut self.events);
        if contact.exhausted {
            let queued = self.events.len();
            self.events.push(GameEvent::Notice(RESTART_NOTICE.to_string()));
            if let Err(e) = self.restart_current() {
                self.events.truncate(queued);
                return Err(e);
            }
            self.world.session.debounce_armed = false;
        }
        Ok(contact)
    }

    /// Advance when the avatar stands on a door. Returns true if a new
    /// level was loaded.
    pub fn check_door(&mut self) -> Result<bool, EngineError> {
        let Some((x, y)) = self.world.avatar_pos() else { return Ok(false) };
        if self.world.registry.at(EntityKind::Door, x, y).next().is_none() {
            return Ok(false);
        }

        let next = self.world.session.next_level.clone();
        if next.is_empty() {
            info!("last door reached on '{}'", self.world.session.current_level);
            self.world.phase = Phase::Complete;
            self.events.push(GameEvent::Notice(COMPLETE_NOTICE.to_string()));
            return Ok(false);
        }
        let lives = self.world.session.lives;
        let queued = self.events.len();
        info!("door reached on '{}', advancing to '{}'", self.world.session.current_level, next);
        self.world.phase = Phase::Advancing;
        self.world.session.lives = 0;
        self.events.push(GameEvent::Notice(ADVANCE_NOTICE.to_string()));

        if let Err(e) = self.reset(&next) {
            self.events.truncate(queued);
            self.world.session.lives = lives;
            self.world.phase = Phase::Active;
            return Err(e);
        }
        Ok(true)
    }

    // ── Lifecycle ──

    /// Replace the running level with `level`. On error nothing changes.
    pub fn reset(&mut self, level: &str) -> Result<(), EngineError> {
        if level.is_empty() {
            warn!("reset rejected: empty level id");
            return Err(EngineError::EmptyLevelId);
        }
        self.load(&LevelRequest::Named(level.to_string()), level)
    }

    pub fn restart_current(&mut self) -> Result<(), EngineError> {
        let current = self.world.session.current_level.clone();
        let phase = self.world.phase;
        self.world.phase = Phase::Restarting;
        info!("restarting '{}'", current);
        self.reset(&current).map_err(|e| {
            self.world.phase = phase;
            e
        })
    }

    /// Open whatever level or saved game the loader's prompt picks.
    pub fn open_prompted(&mut self) -> Result<(), EngineError> {
        self.load(&LevelRequest::Prompt, "")
    }

    /// Snapshot the running level and hand it to `saver` under `name`.
    /// An existing save is only replaced when `overwrite` is set.
    pub fn save(&self, name: &str, overwrite: bool, saver: &mut impl LevelSaver) -> Result<(), EngineError> {
        if name.is_empty() {
            return Err(EngineError::EmptySaveName);
        }
        if !self.world.session.is_active() {
            return Err(EngineError::NoActiveSession);
        }
        if !overwrite && saver.exists(name) {
            return Err(EngineError::SaveExists(name.to_string()));
        }
        let data = save::capture(&self.world);
        saver.save(name, &data)?;
        info!("saved '{}' as '{}'", data.current, name);
        Ok(())
    }

    fn load(&mut self, request: &LevelRequest, fallback_id: &str) -> Result<(), EngineError> {
        let data = self
            .loader
            .load(request)
            .and_then(|d| d.validate().map(|_| d))
            .map_err(|e| {
                warn!("load {:?} failed: {}", request, e);
                EngineError::Load(e)
            })?;
        self.apply(data, fallback_id);
        Ok(())
    }

    // ── Rebuild ──

    fn apply(&mut self, data: LevelData, fallback_id: &str) {
        let world = &mut self.world;
        let events = &mut self.events;
        world.phase = Phase::Loading;

        for id in world.registry.clear() {
            events.push(GameEvent::EntityRemoved { id });
        }
        world.grid.clear();
        world.session.reset();
        events.push(GameEvent::HudCleared);

        let level = if data.current.is_empty() { fallback_id.to_string() } else { data.current };
        world.session.current_level = level.clone();
        world.session.next_level = data.next;
        world.session.lives = data.lives;
        world.session.starting_lives = data.lives;

        for spec in data.entities {
            let heading = if spec.kind.is_ai() {
                if world.rng.gen_bool(0.5) { Heading::Left } else { Heading::Right }
            } else {
                Heading::Left
            };
            let e = world.registry.spawn(spec.kind, spec.x, spec.y, spec.visual);
            e.heading = heading;
            e.anchored = spec.anchored;
            e.collectible = spec.collectible;
            let id = e.id;
            let (kind, x, y, visual) = (e.kind, e.x, e.y, e.visual.clone());

            if kind == EntityKind::MovableBlock {
                world.grid.set(x as usize, block_row(y) as usize, Some(id));
            }
            events.push(GameEvent::EntityAdded { id, kind, visual, x, y });
        }

        // items: still held by a character, or already handed over
        let mut given = Vec::new();
        let mut held = 0;
        for f in world.registry.iter_kind(EntityKind::FriendlyCharacter) {
            match &f.collectible {
                Some(c) if c.carried => held += 1,
                Some(c) => given.push(c.token.clone()),
                None => {}
            }
        }
        events.push(GameEvent::LivesShown { count: world.session.lives.max(0) as usize });
        for token in given {
            let slot = world.session.collect(&token);
            events.push(GameEvent::ItemShown { slot, token });
        }
        world.session.items_remaining = held;

        if data.origin == LevelOrigin::SavedGame {
            let before = world.session.pose();
            let slot_block = world
                .avatar_pos()
                .and_then(|(x, y)| world.grid.probe(x, y))
                .and_then(|id| world.registry.get(id));
            world.session.carrying = data.carrying && slot_block.map_or(false, |b| b.is_carryable());
            world.refresh_pose(before, events);
        }

        world.phase = Phase::Active;
        events.push(GameEvent::LevelLoaded { level: level.clone() });
        info!(
            "loaded '{}' ({} entities, {} lives, next '{}')",
            level,
            world.registry.len(),
            world.session.lives,
            world.session.next_level
        );
        debug_assert_eq!(world.check_occupancy(), Ok(()));
        debug!("origin {:?}", data.origin);
    }
}

// ══════════════════════════════════════════════════════════════
// Test support
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;
    use crate::sim::level::parse_map;

    /// In-memory loader that counts requests.
    #[derive(Default)]
    pub struct MemoryLoader {
        pub levels: HashMap<String, LevelData>,
        pub prompt: Option<LevelData>,
        pub requests: Vec<LevelRequest>,
    }

    impl MemoryLoader {
        pub fn with(mut self, id: &str, next: &str, lives: i32, rows: &[&str]) -> Self {
            let entities = parse_map(rows).expect("test map");
            let data = LevelData {
                entities,
                lives,
                current: id.to_string(),
                next: next.to_string(),
                origin: LevelOrigin::Layout,
                carrying: false,
            };
            self.levels.insert(id.to_string(), data);
            self
        }
    }

    impl LevelLoader for MemoryLoader {
        fn load(&mut self, request: &LevelRequest) -> Result<LevelData, LoadError> {
            self.requests.push(request.clone());
            match request {
                LevelRequest::Named(id) => {
                    self.levels.get(id).cloned().ok_or_else(|| LoadError::NotFound(id.clone()))
                }
                LevelRequest::Prompt => self.prompt.clone().ok_or(LoadError::Cancelled),
            }
        }
    }

    /// Saver that keeps the last snapshot.
    #[derive(Default)]
    pub struct MemorySaver {
        pub saved: Vec<(String, LevelData)>,
    }

    impl LevelSaver for MemorySaver {
        fn save(&mut self, name: &str, data: &LevelData) -> Result<(), SaveError> {
            self.saved.push((name.to_string(), data.clone()));
            Ok(())
        }

        fn exists(&self, name: &str) -> bool {
            self.saved.iter().any(|(n, _)| n == name)
        }
    }
}
