/// Keyboard input: terminal key events → game commands.
///
/// Every movement is a discrete action, so nothing here tracks held keys:
/// each Press (and each auto-Repeat while a key stays down) becomes one
/// command. Release events are ignored.
///
///   ←/A  →/D      move (turn first, then step)
///   ↑/W           pick up
///   ↓/S           drop
///   F2            restart level
///   F5            save (asks for a name)
///   F9            open a saved game
///   Esc, Ctrl+C   quit
///
/// While a prompt is open it takes every key: typing edits the save name,
/// Enter answers, Esc cancels, and the overwrite question wants y or n.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use blocklift::domain::entity::MoveDir;
use blocklift::sim::step::PlayerAction;

const MAX_NAME_LEN: usize = 24;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Act(PlayerAction),
    Restart,
    /// Open the save prompt.
    Save,
    /// Answer from the save prompt.
    SaveAs { name: String, overwrite: bool },
    Load,
    Quit,
}

/// Modal one-line question shown under the playfield.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Prompt {
    /// Save name being typed.
    SaveName(String),
    /// A save with this name exists; replace it?
    Overwrite(String),
}

impl Prompt {
    pub fn text(&self) -> String {
        match self {
            Prompt::SaveName(buf) => format!("Save as: {buf}_   Enter save  Esc cancel"),
            Prompt::Overwrite(name) => format!("Save '{name}' exists! Overwrite? (y/n)"),
        }
    }
}

enum PromptStep {
    Open,
    Closed(Option<Command>),
}

fn prompt_key(prompt: &mut Prompt, key: &KeyEvent) -> PromptStep {
    if key.kind == KeyEventKind::Release {
        return PromptStep::Open;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
    {
        return PromptStep::Closed(Some(Command::Quit));
    }

    match prompt {
        Prompt::SaveName(buf) => match key.code {
            KeyCode::Char(c) if is_name_char(c) && buf.chars().count() < MAX_NAME_LEN => {
                buf.push(c);
                PromptStep::Open
            }
            KeyCode::Backspace => {
                buf.pop();
                PromptStep::Open
            }
            KeyCode::Enter if !buf.is_empty() => {
                PromptStep::Closed(Some(Command::SaveAs { name: buf.clone(), overwrite: false }))
            }
            KeyCode::Esc => PromptStep::Closed(None),
            _ => PromptStep::Open,
        },
        Prompt::Overwrite(name) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                PromptStep::Closed(Some(Command::SaveAs { name: name.clone(), overwrite: true }))
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => PromptStep::Closed(None),
            _ => PromptStep::Open,
        },
    }
}

/// Save names become file names.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

pub struct InputState {
    commands: Vec<Command>,
    prompt: Option<Prompt>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { commands: Vec::with_capacity(8), prompt: None }
    }

    /// Drain all pending terminal events without blocking and return the
    /// commands they map to, in arrival order.
    pub fn drain_events(&mut self) -> Vec<Command> {
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.handle_key(&key);
            }
        }
        self.take_commands()
    }

    pub fn handle_key(&mut self, key: &KeyEvent) {
        let cmd = match self.prompt.as_mut() {
            Some(prompt) => match prompt_key(prompt, key) {
                PromptStep::Open => None,
                PromptStep::Closed(cmd) => {
                    self.prompt = None;
                    cmd
                }
            },
            None => map_key(key),
        };
        if let Some(cmd) = cmd {
            self.commands.push(cmd);
        }
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn open_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some(prompt);
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }
}

/// Translate one key event. Releases map to nothing.
pub fn map_key(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
    {
        return Some(Command::Quit);
    }

    let cmd = match key.code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => {
            Command::Act(PlayerAction::Move(MoveDir::Left))
        }
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => {
            Command::Act(PlayerAction::Move(MoveDir::Right))
        }
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Act(PlayerAction::Pickup),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Act(PlayerAction::Drop),
        KeyCode::F(2) => Command::Restart,
        KeyCode::F(5) => Command::Save,
        KeyCode::F(9) => Command::Load,
        KeyCode::Esc => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}
