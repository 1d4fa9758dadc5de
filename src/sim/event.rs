/// Events emitted by the engine, in order.
/// The renderer, sound engine and HUD consume these; the core never calls
/// them directly.

use crate::domain::entity::{EntityId, EntityKind};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AudioCue {
    Crush,
    ItemCollected,
}

impl AudioCue {
    /// Cue name as understood by the audio collaborator.
    pub fn name(self) -> &'static str {
        match self {
            AudioCue::Crush => "crush",
            AudioCue::ItemCollected => "item-collected",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum GameEvent {
    EntityAdded { id: EntityId, kind: EntityKind, visual: String, x: i32, y: i32 },
    EntityRemoved { id: EntityId },
    PositionChanged { id: EntityId, x: i32, y: i32 },
    /// New visual token for an entity.
    VisualChanged { id: EntityId, visual: String },
    Cue(AudioCue),
    /// A collected token appears in HUD slot `slot`.
    ItemShown { slot: usize, token: String },
    /// Clear life indicator `indicator` (equal to the lives left).
    LifeLost { indicator: usize },
    LivesShown { count: usize },
    /// Drop every item and life indicator from the HUD.
    HudCleared,
    Notice(String),
    LevelLoaded { level: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_names() {
        assert_eq!(AudioCue::Crush.name(), "crush");
        assert_eq!(AudioCue::ItemCollected.name(), "item-collected");
    }
}
