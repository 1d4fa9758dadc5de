/// Collision resolution between the avatar and other characters.
///
/// Exact-position contact only. Friendly characters hand over their item;
/// enemies cost a life, once per debounce window.

use log::{debug, info};

use crate::domain::entity::EntityKind;
use super::event::{AudioCue, GameEvent};
use super::world::WorldState;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Contact {
    pub collected: usize,
    pub lives_lost: usize,
    /// Lives reached zero; the level must restart.
    pub exhausted: bool,
}

pub fn check_collisions(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Contact {
    let mut contact = Contact::default();
    let Some((x, y)) = world.avatar_pos() else { return contact };

    // ── Friendly characters ──
    for id in world.registry.ids_of(EntityKind::FriendlyCharacter) {
        let Some(f) = world.registry.get_mut(id) else { continue };
        if f.pos() != (x, y) {
            continue;
        }
        let Some(item) = f.collectible.as_mut().filter(|c| c.carried) else { continue };
        item.carried = false;
        let token = item.token.clone();

        let slot = world.session.collect(&token);
        events.push(GameEvent::Cue(AudioCue::ItemCollected));
        events.push(GameEvent::ItemShown { slot, token: token.clone() });
        contact.collected += 1;
        debug!("collected '{}' from {:?}", token, id);
    }

    // ── Enemies ──
    for id in world.registry.ids_of(EntityKind::Enemy) {
        let hit = world.registry.get(id).map_or(false, |e| e.pos() == (x, y));
        if !hit || !world.session.debounce_armed {
            continue;
        }
        world.session.lives -= 1;
        world.session.debounce_armed = false;
        contact.lives_lost += 1;
        events.push(GameEvent::LifeLost { indicator: world.session.lives.max(0) as usize });
        debug!("hit by {:?}, {} lives left", id, world.session.lives);

        if world.session.lives <= 0 {
            info!("out of lives on '{}'", world.session.current_level);
            contact.exhausted = true;
            break;
        }
    }

    contact
}
