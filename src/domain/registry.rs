/// Entity registry: the single owner of every entity in a level.
///
/// Entities sit in one insertion-ordered `Vec`; `by_id` maps ids to slots.
/// Removal is two-phase so a scan over one kind can remove members of that
/// kind without invalidating itself:
///   1. `mark_dead(id)` during the scan (entity stops resolving at once),
///   2. `sweep()` afterwards compacts the storage and rebuilds the index.
///
/// Ids are never reused for the lifetime of a registry, so an id held by a
/// stale grid cell or a renderer can only ever resolve to `None`.

use std::collections::HashMap;

use super::entity::{Entity, EntityId, EntityKind};

#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    by_id: HashMap<EntityId, usize>,
    next_id: u32,
    avatar: Option<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity and return it for further setup.
    /// Spawning an `Avatar` makes it the registry's avatar.
    pub fn spawn(&mut self, kind: EntityKind, x: i32, y: i32, visual: impl Into<String>) -> &mut Entity {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        if kind == EntityKind::Avatar {
            self.avatar = Some(id);
        }
        let slot = self.entities.len();
        self.entities.push(Entity::new(id, kind, x, y, visual));
        self.by_id.insert(id, slot);
        &mut self.entities[slot]
    }

    /// Live entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.by_id
            .get(&id)
            .map(|&i| &self.entities[i])
            .filter(|e| e.alive)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.by_id.get(&id) {
            Some(&i) if self.entities[i].alive => Some(&mut self.entities[i]),
            _ => None,
        }
    }

    pub fn avatar_id(&self) -> Option<EntityId> {
        self.avatar.filter(|&id| self.get(id).is_some())
    }

    pub fn avatar(&self) -> Option<&Entity> {
        self.avatar.and_then(|id| self.get(id))
    }

    /// Live entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.alive)
    }

    pub fn iter_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Snapshot of live ids of one kind, safe to hold across mutation.
    pub fn ids_of(&self, kind: EntityKind) -> Vec<EntityId> {
        self.iter_kind(kind).map(|e| e.id).collect()
    }

    /// Live entities of `kind` standing exactly on `(x, y)`.
    pub fn at(&self, kind: EntityKind, x: i32, y: i32) -> impl Iterator<Item = &Entity> {
        self.iter_kind(kind).filter(move |e| e.x == x && e.y == y)
    }

    /// Phase one of removal. Returns false if the id was not live.
    pub fn mark_dead(&mut self, id: EntityId) -> bool {
        match self.get_mut(id) {
            Some(e) => {
                e.alive = false;
                true
            }
            None => false,
        }
    }

    /// Phase two of removal: drop every dead entity and re-index.
    /// Returns how many entities were dropped.
    pub fn sweep(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| e.alive);
        if self.entities.len() != before {
            self.reindex();
        }
        if self.avatar.map_or(false, |id| !self.by_id.contains_key(&id)) {
            self.avatar = None;
        }
        before - self.entities.len()
    }

    /// Remove everything. Returns the ids that were live, in order.
    pub fn clear(&mut self) -> Vec<EntityId> {
        let ids = self.iter().map(|e| e.id).collect();
        self.entities.clear();
        self.by_id.clear();
        self.avatar = None;
        ids
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reindex(&mut self) {
        self.by_id = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
    }
}
