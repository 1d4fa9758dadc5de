/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub start_level: String,
    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
    pub log_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    /// Ticks between AI passes.
    pub ai_move_rate: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub pickup: Vec<String>,
    pub drop: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_ai_move")]
    ai_move_rate: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pickup")]
    pickup: Vec<String>,
    #[serde(default = "default_drop")]
    drop: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_start_level")]
    start_level: String,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 100 }
fn default_ai_move() -> u32 { 4 }      // 0.4s between AI steps at 100ms ticks

fn default_pickup() -> Vec<String> { vec!["Y".into(), "X".into()] }
fn default_drop() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }
fn default_start_level() -> String { "level1".into() }
fn default_log_file() -> String { "blocklift.log".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            ai_move_rate: default_ai_move(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            pickup: default_pickup(),
            drop: default_drop(),
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            start_level: default_start_level(),
            seed: None,
            log_file: default_log_file(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document directly; used for defaults and tests.
    pub fn from_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_dir(&toml_cfg.general.levels_dir, search_dirs);

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
                ai_move_rate: toml_cfg.speed.ai_move_rate.max(1),
            },
            gamepad: GamepadConfig {
                pickup: toml_cfg.gamepad.pickup,
                drop: toml_cfg.gamepad.drop,
                restart: toml_cfg.gamepad.restart,
                quit: toml_cfg.gamepad.quit,
            },
            levels_dir,
            start_level: toml_cfg.general.start_level,
            seed: toml_cfg.general.seed,
            log_file: PathBuf::from(toml_cfg.general.log_file),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[])
    }
}

/// Absolute paths are used as-is; relative ones are looked up in the
/// candidate dirs, falling back to the CWD.
fn resolve_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    if Path::new(dir).is_absolute() {
        return PathBuf::from(dir);
    }
    search_dirs
        .iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| PathBuf::from(dir))
}

/// Candidate directories to search: exe dir + CWD + XDG data (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/blocklift)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/blocklift");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_str("").unwrap();
        assert_eq!(cfg.speed.tick_rate_ms, 100);
        assert_eq!(cfg.speed.ai_move_rate, 4);
        assert_eq!(cfg.start_level, "level1");
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
        assert_eq!(cfg.log_file, PathBuf::from("blocklift.log"));
        assert_eq!(cfg.gamepad.restart, vec!["Start".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_str(
            "[speed]\nai_move_rate = 2\n[general]\nseed = 99\nstart_level = \"level3\"\n",
        )
        .unwrap();
        assert_eq!(cfg.speed.ai_move_rate, 2);
        assert_eq!(cfg.speed.tick_rate_ms, 100);
        assert_eq!(cfg.seed, Some(99));
        assert_eq!(cfg.start_level, "level3");
        assert_eq!(cfg.gamepad.pickup, vec!["Y".to_string(), "X".to_string()]);
    }

    #[test]
    fn zero_rates_are_clamped() {
        let cfg = GameConfig::from_str("[speed]\ntick_rate_ms = 0\nai_move_rate = 0\n").unwrap();
        assert_eq!(cfg.speed.tick_rate_ms, 1);
        assert_eq!(cfg.speed.ai_move_rate, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::from_str("[speed\n").is_err());
    }

    #[test]
    fn absolute_levels_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let text = format!("[general]\nlevels_dir = {:?}\n", dir.path().display().to_string());
        let cfg = GameConfig::from_str(&text).unwrap();
        assert_eq!(cfg.levels_dir, dir.path());
    }
}
