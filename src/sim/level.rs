/// TOML level store: the loader and saver used by the terminal game.
///
/// ## Sources (priority order):
///   1. `<levels_dir>/<id>.toml`
///   2. Built-in embedded levels
///
/// Saved games live in their own directory and are only reached through
/// `LevelRequest::Prompt`, which asks the store's prompt callback for a
/// file.
///
/// ## File format:
///   ```toml
///   name  = "Level 1 - First Lift"
///   lives = 3
///   next  = "level2"
///   map = [
///     "            ",
///     "  M   B   D ",
///     "############",
///   ]
///
///   [[friend]]          # one per 'F', in reading order
///   gift  = "ring"
///   given = false
///
///   [[entity]]          # extra entities with explicit visuals
///   kind   = "decoration"
///   visual = "lamp"
///   x = 4
///   y = 3
///   ```
///
/// The last map line is entity height `y = 1` (its blocks stand on grid
/// row 0); each line above is one higher. Saved games carry `saved = true`,
/// `current`, `carrying` and list everything as `[[entity]]` tables.
///
/// ## Map legend:
///   '#' = Anchored block        'B' = Movable block
///   'M' = Avatar                'F' = Friendly character
///   'E' = Enemy                 'D' = Door
///   '*' = Decoration            ' ' / '.' = Empty

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domain::entity::{Collectible, EntityKind};
use crate::domain::grid::{GRID_H, GRID_W};
use crate::error::{LoadError, SaveError};
use super::lifecycle::{EntitySpec, LevelData, LevelLoader, LevelOrigin, LevelRequest, LevelSaver};
use super::save;

pub const DEFAULT_LIVES: i32 = 3;

// ══════════════════════════════════════════════════════════════
// File schema
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug)]
pub struct LevelFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_lives")]
    pub lives: i32,
    #[serde(default)]
    pub next: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default)]
    pub saved: bool,
    #[serde(default)]
    pub carrying: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub friend: Vec<FriendDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity: Vec<EntityDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FriendDef {
    pub gift: String,
    #[serde(default)]
    pub given: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EntityDef {
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<String>,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub anchored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectible: Option<Collectible>,
}

fn default_lives() -> i32 { DEFAULT_LIVES }

/// Sprite token used when a file does not name one.
pub fn default_visual(kind: EntityKind, anchored: bool) -> &'static str {
    match kind {
        EntityKind::Avatar => "MJ_left",
        EntityKind::FriendlyCharacter => "friend",
        EntityKind::Enemy => "enemy",
        EntityKind::MovableBlock if anchored => "BLOCK",
        EntityKind::MovableBlock => "MBLOCK",
        EntityKind::Decoration => "decor",
        EntityKind::Door => "door",
    }
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

/// Turn map rows into entity specs, top line first.
pub fn parse_map<S: AsRef<str>>(rows: &[S]) -> Result<Vec<EntitySpec>, String> {
    if rows.len() >= GRID_H {
        return Err(format!("map has {} lines, at most {} fit", rows.len(), GRID_H - 1));
    }
    let n = rows.len() as i32;
    let mut specs = Vec::new();
    for (i, line) in rows.iter().enumerate() {
        let y = n - i as i32;
        for (x, ch) in line.as_ref().chars().enumerate() {
            if x >= GRID_W {
                return Err(format!("map line {} is wider than {} columns", i + 1, GRID_W));
            }
            let x = x as i32;
            let (kind, anchored) = match ch {
                ' ' | '.' => continue,
                '#' => (EntityKind::MovableBlock, true),
                'B' => (EntityKind::MovableBlock, false),
                'M' => (EntityKind::Avatar, false),
                'F' => (EntityKind::FriendlyCharacter, false),
                'E' => (EntityKind::Enemy, false),
                'D' => (EntityKind::Door, false),
                '*' => (EntityKind::Decoration, false),
                other => return Err(format!("unknown map character '{other}' at ({x}, {y})")),
            };
            let mut spec = EntitySpec::new(kind, x, y, default_visual(kind, anchored));
            spec.anchored = anchored;
            specs.push(spec);
        }
    }
    Ok(specs)
}

impl LevelFile {
    /// Convert to loader output. `id` names the level when the file does not.
    pub fn into_level_data(self, id: &str) -> Result<LevelData, String> {
        let mut entities = parse_map(&self.map)?;

        let mut gifts = self.friend.into_iter();
        for spec in entities.iter_mut().filter(|e| e.kind == EntityKind::FriendlyCharacter) {
            if let Some(g) = gifts.next() {
                spec.collectible = Some(Collectible { token: g.gift, carried: !g.given });
            }
        }
        if gifts.next().is_some() {
            warn!("level '{}' has more [[friend]] entries than 'F' characters", id);
        }

        entities.extend(self.entity.into_iter().map(|d| EntitySpec {
            kind: d.kind,
            visual: d.visual.unwrap_or_else(|| default_visual(d.kind, d.anchored).to_string()),
            x: d.x,
            y: d.y,
            anchored: d.anchored,
            collectible: d.collectible,
        }));

        Ok(LevelData {
            entities,
            lives: self.lives,
            current: self.current.unwrap_or_else(|| id.to_string()),
            next: self.next,
            origin: if self.saved { LevelOrigin::SavedGame } else { LevelOrigin::Layout },
            carrying: self.saved && self.carrying,
        })
    }

    /// Lossless file form of loader output: every entity as `[[entity]]`.
    pub fn from_level_data(data: &LevelData) -> Self {
        LevelFile {
            name: None,
            lives: data.lives,
            next: data.next.clone(),
            current: Some(data.current.clone()),
            saved: data.origin == LevelOrigin::SavedGame,
            carrying: data.carrying,
            map: vec![],
            friend: vec![],
            entity: data
                .entities
                .iter()
                .map(|e| EntityDef {
                    kind: e.kind,
                    visual: Some(e.visual.clone()),
                    x: e.x,
                    y: e.y,
                    anchored: e.anchored,
                    collectible: e.collectible.clone(),
                })
                .collect(),
        }
    }
}

fn parse_file(text: &str, path: &Path, id: &str) -> Result<LevelData, LoadError> {
    let file: LevelFile = toml::from_str(text)
        .map_err(|e| LoadError::Parse { path: path.to_path_buf(), message: e.to_string() })?;
    file.into_level_data(id)
        .map_err(|message| LoadError::Parse { path: path.to_path_buf(), message })
}

// ══════════════════════════════════════════════════════════════
// Store
// ══════════════════════════════════════════════════════════════

type Prompt = Box<dyn FnMut() -> Option<PathBuf>>;

pub struct TomlLevelStore {
    levels_dir: PathBuf,
    saves_dir: PathBuf,
    prompt: Option<Prompt>,
}

impl TomlLevelStore {
    pub fn new(levels_dir: impl Into<PathBuf>, saves_dir: impl Into<PathBuf>) -> Self {
        TomlLevelStore { levels_dir: levels_dir.into(), saves_dir: saves_dir.into(), prompt: None }
    }

    /// Callback answering `LevelRequest::Prompt` with a file, or `None`
    /// when the player cancels.
    pub fn with_prompt(mut self, prompt: impl FnMut() -> Option<PathBuf> + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn saves_dir(&self) -> &Path {
        &self.saves_dir
    }

    fn load_named(&self, id: &str) -> Result<LevelData, LoadError> {
        let path = self.levels_dir.join(format!("{id}.toml"));
        if path.is_file() {
            debug!("loading level '{}' from {}", id, path.display());
            return load_path(&path);
        }
        match embedded_level(id) {
            Some(file) => {
                debug!("loading embedded level '{}'", id);
                file.into_level_data(id)
                    .map_err(|message| LoadError::Parse { path: PathBuf::from("<embedded>"), message })
            }
            None => Err(LoadError::NotFound(id.to_string())),
        }
    }
}

/// Read one level or save file. The file stem names the level unless the
/// file says otherwise.
pub fn load_path(path: &Path) -> Result<LevelData, LoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let id = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    parse_file(&text, path, &id)
}

impl LevelLoader for TomlLevelStore {
    fn load(&mut self, request: &LevelRequest) -> Result<LevelData, LoadError> {
        match request {
            LevelRequest::Named(id) => self.load_named(id),
            LevelRequest::Prompt => {
                let picked = match self.prompt.as_mut() {
                    Some(prompt) => prompt(),
                    None => save::list_saves(&self.saves_dir).into_iter().next(),
                };
                match picked {
                    Some(path) => load_path(&path),
                    None => Err(LoadError::Cancelled),
                }
            }
        }
    }
}

impl LevelSaver for TomlLevelStore {
    fn save(&mut self, name: &str, data: &LevelData) -> Result<(), SaveError> {
        let text = toml::to_string(&LevelFile::from_level_data(data))?;
        std::fs::create_dir_all(&self.saves_dir)
            .map_err(|source| SaveError::Io { path: self.saves_dir.clone(), source })?;
        let path = save::save_path(&self.saves_dir, name);
        std::fs::write(&path, text).map_err(|source| SaveError::Io { path: path.clone(), source })?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        save::save_path(&self.saves_dir, name).is_file()
    }
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

struct EmbeddedLevel {
    id: &'static str,
    name: &'static str,
    lives: i32,
    next: &'static str,
    gifts: &'static [&'static str],
    map: &'static [&'static str],
}

const EMBEDDED: &[EmbeddedLevel] = &[
    EmbeddedLevel {
        id: "level1",
        name: "Level 1 - First Lift",
        lives: 3,
        next: "level2",
        gifts: &["ring"],
        map: &[
            "                         D    ",
            "                      ####### ",
            "  M      B    F    E  ####### ",
            "##############################",
        ],
    },
    EmbeddedLevel {
        id: "level2",
        name: "Level 2 - Stairway",
        lives: 3,
        next: "level3",
        gifts: &["coin"],
        map: &[
            "                          D   ",
            "                 B     ###### ",
            "   M       F   ####  E ###### ",
            "##############################",
        ],
    },
    EmbeddedLevel {
        id: "level3",
        name: "Level 3 - Crusher",
        lives: 2,
        next: "",
        gifts: &["gem"],
        map: &[
            "                           D  ",
            "   M   B                 #### ",
            "  ######                ##### ",
            "  ######   E    F   E   ##### ",
            "##############################",
        ],
    },
];

impl EmbeddedLevel {
    fn to_file(&self) -> LevelFile {
        LevelFile {
            name: Some(self.name.to_string()),
            lives: self.lives,
            next: self.next.to_string(),
            current: None,
            saved: false,
            carrying: false,
            map: self.map.iter().map(|s| s.to_string()).collect(),
            friend: self
                .gifts
                .iter()
                .map(|g| FriendDef { gift: g.to_string(), given: false })
                .collect(),
            entity: vec![],
        }
    }
}

/// Built-in level in file form.
pub fn embedded_level(id: &str) -> Option<LevelFile> {
    EMBEDDED.iter().find(|l| l.id == id).map(EmbeddedLevel::to_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::lifecycle::Engine;

    #[test]
    fn map_rows_become_specs() {
        let specs = parse_map(&["M B", "#  "]).unwrap();
        let summary: Vec<_> = specs.iter().map(|s| (s.kind, s.x, s.y, s.anchored)).collect();
        assert_eq!(
            summary,
            vec![
                (EntityKind::Avatar, 0, 2, false),
                (EntityKind::MovableBlock, 2, 2, false),
                (EntityKind::MovableBlock, 0, 1, true),
            ]
        );
        assert_eq!(specs[1].visual, "MBLOCK");
    }

    #[test]
    fn map_rejects_unknown_chars_and_oversize() {
        assert!(parse_map(&["M?"]).is_err());
        assert!(parse_map(&["#".repeat(GRID_W + 1)]).is_err());
        let tall: Vec<String> = vec![String::new(); GRID_H];
        assert!(parse_map(&tall).is_err());
    }

    #[test]
    fn friends_get_gifts_in_reading_order() {
        let text = "map = [\"F  F\", \"####\"]\n\
                    [[friend]]\ngift = \"a\"\n\
                    [[friend]]\ngift = \"b\"\ngiven = true\n";
        let data = parse_file(text, Path::new("t.toml"), "t").unwrap();
        let gifts: Vec<_> = data.entities.iter().filter_map(|e| e.collectible.clone()).collect();
        assert_eq!(
            gifts,
            vec![
                Collectible { token: "a".into(), carried: true },
                Collectible { token: "b".into(), carried: false },
            ]
        );
        assert_eq!(data.lives, DEFAULT_LIVES);
        assert_eq!(data.current, "t");
        assert_eq!(data.origin, LevelOrigin::Layout);
    }

    #[test]
    fn embedded_levels_are_valid() {
        for level in EMBEDDED {
            let data = level.to_file().into_level_data(level.id).unwrap();
            data.validate().unwrap_or_else(|e| panic!("{}: {e}", level.id));
            assert_eq!(data.current, level.id);
            assert!(data.entities.iter().any(|e| e.kind == EntityKind::Avatar), "{}", level.id);
        }
    }

    #[test]
    fn embedded_chain_is_closed() {
        for level in EMBEDDED {
            assert!(level.next.is_empty() || embedded_level(level.next).is_some(), "{}", level.id);
        }
        assert!(EMBEDDED.iter().any(|l| l.next.is_empty()));
    }

    #[test]
    fn directory_overrides_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("level1.toml"), "lives = 7\nmap = [\"M\", \"#\"]\n").unwrap();
        let mut store = TomlLevelStore::new(dir.path(), dir.path().join("saves"));
        let data = store.load(&LevelRequest::Named("level1".into())).unwrap();
        assert_eq!(data.lives, 7);
        let data = store.load(&LevelRequest::Named("level2".into())).unwrap();
        assert_eq!(data.next, "level3");
    }

    #[test]
    fn unknown_level_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TomlLevelStore::new(dir.path(), dir.path());
        let err = store.load(&LevelRequest::Named("nowhere".into())).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn broken_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.toml"), "map = [1, 2").unwrap();
        let mut store = TomlLevelStore::new(dir.path(), dir.path());
        let err = store.load(&LevelRequest::Named("bad".into())).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn save_and_prompt_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let saves = dir.path().join("saves");
        let mut engine = Engine::new(TomlLevelStore::new(dir.path(), &saves), 11);
        engine.reset("level1").unwrap();
        engine.move_avatar(crate::domain::entity::MoveDir::Right);
        engine.move_avatar(crate::domain::entity::MoveDir::Right);

        let mut saver = TomlLevelStore::new(dir.path(), &saves);
        assert!(!saver.exists("slot"));
        engine.save("slot", false, &mut saver).unwrap();
        assert!(saves.join("slot.toml").is_file());
        assert!(saver.exists("slot"));
        assert!(matches!(
            engine.save("slot", false, &mut saver),
            Err(crate::error::EngineError::SaveExists(_))
        ));

        let expected = crate::sim::save::capture(engine.world());
        let mut loader = TomlLevelStore::new(dir.path(), &saves);
        let back = loader.load(&LevelRequest::Prompt).unwrap();
        assert_eq!(back, expected);
    }

    #[test]
    fn prompt_callback_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TomlLevelStore::new(dir.path(), dir.path()).with_prompt(|| None);
        assert!(matches!(store.load(&LevelRequest::Prompt), Err(LoadError::Cancelled)));
    }
}
