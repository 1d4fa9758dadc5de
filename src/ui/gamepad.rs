/// Gamepad input using gilrs.
///
/// Button mapping comes from the `[gamepad]` section of config.toml.
/// Default mapping:
///   D-pad / Left Stick ←→  →  Move
///   D-pad / Left Stick ↑   →  Pick up   (also Y / X)
///   D-pad / Left Stick ↓   →  Drop      (also A / B)
///   Start                  →  Restart level
///   Select                 →  Quit
///
/// Every command is edge-triggered: one press, one command.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use blocklift::config::GamepadConfig;
use blocklift::domain::entity::MoveDir;
use blocklift::sim::step::PlayerAction;

use super::input::Command;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Action-to-button mapping.
#[derive(Clone, Debug, PartialEq)]
struct ActionMap {
    pickup: Vec<Btn>,
    drop: Vec<Btn>,
    restart: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            pickup: vec![Btn::Y, Btn::X],
            drop: vec![Btn::A, Btn::B],
            restart: vec![Btn::Start],
            quit: vec![Btn::Select],
        }
    }
}

impl ActionMap {
    /// Unknown names are skipped; an action left with no buttons keeps
    /// its default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            pickup: parse_list(&cfg.pickup, d.pickup),
            drop: parse_list(&cfg.drop, d.drop),
            restart: parse_list(&cfg.restart, d.restart),
            quit: parse_list(&cfg.quit, d.quit),
        }
    }

    fn command_for(&self, btn: Btn) -> Option<Command> {
        if self.quit.contains(&btn) {
            Some(Command::Quit)
        } else if self.restart.contains(&btn) {
            Some(Command::Restart)
        } else if self.pickup.contains(&btn) {
            Some(Command::Act(PlayerAction::Pickup))
        } else if self.drop.contains(&btn) {
            Some(Command::Act(PlayerAction::Drop))
        } else {
            None
        }
    }
}

/// Direction pad as reported by either the d-pad or the left stick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pad {
    Up,
    Down,
    Left,
    Right,
}

fn pad_command(pad: Pad) -> Command {
    match pad {
        Pad::Up => Command::Act(PlayerAction::Pickup),
        Pad::Down => Command::Act(PlayerAction::Drop),
        Pad::Left => Command::Act(PlayerAction::Move(MoveDir::Left)),
        Pad::Right => Command::Act(PlayerAction::Move(MoveDir::Right)),
    }
}

/// Which stick direction, if any, is past the deadzone. Horizontal wins.
fn stick_direction(x: f32, y: f32) -> Option<Pad> {
    if x < -STICK_DEADZONE {
        Some(Pad::Left)
    } else if x > STICK_DEADZONE {
        Some(Pad::Right)
    } else if y > STICK_DEADZONE {
        Some(Pad::Up)
    } else if y < -STICK_DEADZONE {
        Some(Pad::Down)
    } else {
        None
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    action_map: ActionMap,
    stick_x: f32,
    stick_y: f32,
    /// Stick direction as of the last poll; a command fires on change.
    stick_dir: Option<Pad>,
    pub connected: bool,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            action_map: ActionMap::from_config(cfg),
            stick_x: 0.0,
            stick_y: 0.0,
            stick_dir: None,
            connected,
        }
    }

    /// Drain pending gamepad events into commands.
    pub fn poll(&mut self) -> Vec<Command> {
        #[allow(unused_mut)]
        let mut commands = Vec::new();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs(&mut commands);

        commands
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self, commands: &mut Vec<Command>) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    let pad = match btn {
                        Button::DPadUp => Some(Pad::Up),
                        Button::DPadDown => Some(Pad::Down),
                        Button::DPadLeft => Some(Pad::Left),
                        Button::DPadRight => Some(Pad::Right),
                        _ => None,
                    };
                    if let Some(pad) = pad {
                        commands.push(pad_command(pad));
                    } else if let Some(cmd) = Btn::from_gilrs(btn).and_then(|b| self.action_map.command_for(b)) {
                        commands.push(cmd);
                    }
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    self.connected = false;
                    self.stick_x = 0.0;
                    self.stick_y = 0.0;
                }
                _ => {}
            }
        }

        let dir = stick_direction(self.stick_x, self.stick_y);
        if dir != self.stick_dir {
            if let Some(d) = dir {
                commands.push(pad_command(d));
            }
            self.stick_dir = dir;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(pickup: &[&str], quit: &[&str]) -> GamepadConfig {
        GamepadConfig {
            pickup: pickup.iter().map(|s| s.to_string()).collect(),
            drop: vec!["A".into()],
            restart: vec!["Start".into()],
            quit: quit.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn configured_buttons_map_to_commands() {
        let map = ActionMap::from_config(&cfg(&["L1"], &["select"]));
        assert_eq!(map.command_for(Btn::L1), Some(Command::Act(PlayerAction::Pickup)));
        assert_eq!(map.command_for(Btn::Select), Some(Command::Quit));
        assert_eq!(map.command_for(Btn::A), Some(Command::Act(PlayerAction::Drop)));
        assert_eq!(map.command_for(Btn::Y), None);
    }

    #[test]
    fn unknown_names_keep_defaults() {
        let map = ActionMap::from_config(&cfg(&["Turbo"], &[]));
        assert_eq!(map.pickup, ActionMap::default().pickup);
        assert_eq!(map.quit, vec![Btn::Select]);
    }

    #[test]
    fn stick_deadzone() {
        assert_eq!(stick_direction(0.1, -0.2), None);
        assert_eq!(stick_direction(-0.9, 0.9), Some(Pad::Left));
        assert_eq!(stick_direction(0.0, 0.5), Some(Pad::Up));
        assert_eq!(pad_command(Pad::Down), Command::Act(PlayerAction::Drop));
    }
}
