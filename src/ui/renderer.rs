/// Presentation layer: event-fed scene plus a diff-based terminal renderer.
///
/// The renderer never reads the engine. `Scene::apply()` folds each
/// `GameEvent` into a local picture of the level (sprites and HUD), and
/// `Renderer::render()` draws that picture:
///   1. Build the next frame into the `front` buffer
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Emit terminal commands only for changed cells, batched with `queue!`
///   4. Swap front/back

use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use blocklift::domain::entity::{EntityId, EntityKind};
use blocklift::domain::rules::{WORLD_H, WORLD_W};
use blocklift::sim::event::GameEvent;

const NOTICE_TIME: Duration = Duration::from_millis(1500);

const FIELD_W: usize = WORLD_W as usize;
const FIELD_H: usize = WORLD_H as usize;

// ══════════════════════════════════════════════════════════════
// Scene: what the events say is on screen
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub kind: EntityKind,
    pub visual: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Default)]
pub struct Scene {
    pub sprites: HashMap<EntityId, Sprite>,
    /// One flag per life indicator; `false` once cleared.
    pub hearts: Vec<bool>,
    /// Collected tokens by HUD slot.
    pub items: BTreeMap<usize, String>,
    pub level: String,
    /// Open input prompt; shown in place of the notice.
    pub prompt: Option<String>,
    notice: Option<(String, Instant)>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &GameEvent) {
        match event {
            GameEvent::EntityAdded { id, kind, visual, x, y } => {
                self.sprites.insert(*id, Sprite { kind: *kind, visual: visual.clone(), x: *x, y: *y });
            }
            GameEvent::EntityRemoved { id } => {
                self.sprites.remove(id);
            }
            GameEvent::PositionChanged { id, x, y } => {
                if let Some(s) = self.sprites.get_mut(id) {
                    s.x = *x;
                    s.y = *y;
                }
            }
            GameEvent::VisualChanged { id, visual } => {
                if let Some(s) = self.sprites.get_mut(id) {
                    s.visual = visual.clone();
                }
            }
            GameEvent::ItemShown { slot, token } => {
                self.items.insert(*slot, token.clone());
            }
            GameEvent::LifeLost { indicator } => {
                if let Some(h) = self.hearts.get_mut(*indicator) {
                    *h = false;
                }
            }
            GameEvent::LivesShown { count } => {
                self.hearts = vec![true; *count];
            }
            GameEvent::HudCleared => {
                self.hearts.clear();
                self.items.clear();
            }
            GameEvent::Notice(text) => {
                self.notice = Some((text.clone(), Instant::now() + NOTICE_TIME));
            }
            GameEvent::LevelLoaded { level } => {
                self.level = level.clone();
            }
            GameEvent::Cue(_) => {}
        }
    }

    /// Current notice, until it expires.
    pub fn notice(&self) -> Option<&str> {
        match &self.notice {
            Some((text, until)) if Instant::now() < *until => Some(text),
            _ => None,
        }
    }

    /// Local notice not coming from the engine (save results and such).
    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now() + NOTICE_TIME));
    }

    /// Sprites back to front: terrain first, the avatar last.
    fn draw_order(&self) -> Vec<&Sprite> {
        let mut v: Vec<&Sprite> = self.sprites.values().collect();
        v.sort_by_key(|s| (layer(s.kind), s.y, s.x));
        v
    }
}

fn layer(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Decoration => 0,
        EntityKind::Door => 1,
        EntityKind::MovableBlock => 2,
        EntityKind::FriendlyCharacter => 3,
        EntityKind::Enemy => 4,
        EntityKind::Avatar => 5,
    }
}

/// Two-column glyph and colour for a visual name.
fn glyph(visual: &str) -> (&'static str, Color) {
    match visual {
        "BLOCK" => ("██", Color::DarkGrey),
        "MBLOCK" => ("▓▓", Color::Rgb { r: 210, g: 140, b: 60 }),
        "MJ_left" => ("@@", Color::Cyan),
        "MJ_left_up" => ("@^", Color::Cyan),
        "MJ_move_left" => ("<@", Color::Cyan),
        "MJ_move_left_up" => ("<^", Color::Cyan),
        "MJ_move" => ("@>", Color::Cyan),
        "MJ_move_right_up" => ("^>", Color::Cyan),
        "friend" => ("ƒƒ", Color::Green),
        "enemy" => ("><", Color::Red),
        "door" => ("[]", Color::Yellow),
        "decor" => ("..", Color::DarkGreen),
        _ => ("??", Color::Magenta),
    }
}

/// Terminal row of the cell an entity at height `y` occupies.
fn screen_row(y: i32) -> Option<usize> {
    if (1..=WORLD_H).contains(&y) {
        Some(MAP_ROW + (WORLD_H - y) as usize)
    } else {
        None
    }
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell, so every position gets redrawn.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }
}

// ── Renderer ──

/// Each game cell is two terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const NOTICE_ROW: usize = MAP_ROW + FIELD_H + 1;
const HELP_ROW: usize = NOTICE_ROW + 1;

const HELP: &str = "←→ move  ↑ pick up  ↓ drop  F2 restart  F5 save  F9 load  Esc quit";

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, scene: &Scene) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();
        self.compose(scene);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, scene: &Scene) {
        // ── HUD ──
        let hearts: String = scene.hearts.iter().map(|&h| if h { '♥' } else { '♡' }).collect();
        let items: Vec<&str> = scene.items.values().map(String::as_str).collect();
        let hud = format!(" {:<10} {:<8} items: {}", scene.level, hearts, items.join(" "));
        self.front.put_str(0, HUD_ROW, &hud, Color::White, Cell::BASE_BG);

        // ── Playfield frame ──
        let field_bg = Color::Rgb { r: 12, g: 12, b: 20 };
        for row in 0..FIELD_H {
            for col in 0..FIELD_W * CELL_W {
                self.front.set(col, MAP_ROW + row, Cell { ch: ' ', fg: Color::White, bg: field_bg });
            }
        }

        for s in scene.draw_order() {
            let Some(row) = screen_row(s.y) else { continue };
            if !(0..WORLD_W).contains(&s.x) {
                continue;
            }
            let (text, fg) = glyph(&s.visual);
            self.front.put_str(s.x as usize * CELL_W, row, text, fg, field_bg);
        }

        if let Some(text) = &scene.prompt {
            self.front.put_str(1, NOTICE_ROW, text, Color::White, Cell::BASE_BG);
        } else if let Some(text) = scene.notice() {
            self.front.put_str(1, NOTICE_ROW, text, Color::Yellow, Cell::BASE_BG);
        }
        self.front.put_str(1, HELP_ROW, HELP, Color::DarkGrey, Cell::BASE_BG);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let (mut last_x, mut last_y) = (0usize, 0usize);

        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}
