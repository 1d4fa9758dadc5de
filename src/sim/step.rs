/// The tick pipeline and player action dispatch.
///
/// Tick order:
///   1. AI movement (friendlies → enemies), every `ai_move_rate` ticks
///   2. Collisions (may restart the level)
///   3. Door check (may advance the level)
///
/// A player action runs the action itself, then steps 2 and 3, so a step
/// onto an enemy or a door takes effect without waiting for the next tick.

use crate::domain::entity::MoveDir;
use crate::error::EngineError;
use super::collision::Contact;
use super::lifecycle::{Engine, LevelLoader};
use super::world::Phase;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerAction {
    Move(MoveDir),
    Pickup,
    Drop,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TickReport {
    /// The AI pass ran this tick.
    pub ai_moved: bool,
    pub contact: Contact,
    /// A door loaded the next level.
    pub advanced: bool,
}

/// Drives `Engine` at a fixed rate.
#[derive(Clone, Debug)]
pub struct Ticker {
    ai_move_rate: u32,
    count: u64,
}

impl Ticker {
    pub fn new(ai_move_rate: u32) -> Self {
        Ticker { ai_move_rate: ai_move_rate.max(1), count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn tick<L: LevelLoader>(&mut self, engine: &mut Engine<L>) -> Result<TickReport, EngineError> {
        let mut report = TickReport::default();
        if engine.world().phase != Phase::Active {
            return Ok(report);
        }
        self.count += 1;

        if self.count % u64::from(self.ai_move_rate) == 0 {
            engine.move_friendlies();
            engine.move_enemies();
            report.ai_moved = true;
        }
        settle(engine, &mut report)?;
        Ok(report)
    }
}

/// Apply one player action. Returns whether the action did anything,
/// plus what the follow-up checks found.
pub fn apply<L: LevelLoader>(
    engine: &mut Engine<L>,
    action: PlayerAction,
) -> Result<(bool, TickReport), EngineError> {
    let mut report = TickReport::default();
    if engine.world().phase != Phase::Active {
        return Ok((false, report));
    }
    let acted = match action {
        PlayerAction::Move(dir) => engine.move_avatar(dir),
        PlayerAction::Pickup => engine.pickup(),
        PlayerAction::Drop => engine.drop_block().is_some(),
    };
    if acted {
        settle(engine, &mut report)?;
    }
    Ok((acted, report))
}

fn settle<L: LevelLoader>(engine: &mut Engine<L>, report: &mut TickReport) -> Result<(), EngineError> {
    report.contact = engine.check_collisions()?;
    if report.contact.exhausted {
        return Ok(());
    }
    report.advanced = engine.check_door()?;
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
