/// Saved games: snapshot capture and the save directory.
///
/// A snapshot has the same shape as loader output, so a saved game opens
/// through the ordinary loader path and is told apart only by its
/// `LevelOrigin::SavedGame` tag. Files are written by the TOML level store
/// (`sim::level`) as `<name>.toml` in `save_dir()`.

use std::path::{Path, PathBuf};

use crate::domain::entity::EntityKind;
use super::lifecycle::{EntitySpec, LevelData, LevelOrigin};
use super::world::WorldState;

pub const SAVE_EXT: &str = "toml";
pub const QUICKSAVE: &str = "quicksave";

// ══════════════════════════════════════════════════════════════
// Capture
// ══════════════════════════════════════════════════════════════

/// Everything needed to rebuild the running level, in registry order.
pub fn capture(w: &WorldState) -> LevelData {
    let entities = w
        .registry
        .iter()
        .map(|e| EntitySpec {
            kind: e.kind,
            visual: e.visual.clone(),
            x: e.x,
            y: e.y,
            anchored: e.kind == EntityKind::MovableBlock && e.anchored,
            collectible: e.collectible.clone(),
        })
        .collect();

    LevelData {
        entities,
        lives: w.session.lives,
        current: w.session.current_level.clone(),
        next: w.session.next_level.clone(),
        origin: LevelOrigin::SavedGame,
        carrying: w.session.carrying,
    }
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Where saved games go: `saves/` next to the executable when that is
/// writable, else `~/.local/share/blocklift/saves`, else `./saves`.
pub fn save_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let dir = parent.join("saves");
            if std::fs::create_dir_all(&dir).is_ok() && is_writable(&dir) {
                return dir;
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/blocklift/saves");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    PathBuf::from("saves")
}

fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(".write_test_blocklift");
    if std::fs::write(&probe, "").is_ok() {
        let _ = std::fs::remove_file(&probe);
        true
    } else {
        false
    }
}

pub fn save_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{SAVE_EXT}"))
}

/// Saved games in `dir`, newest first.
pub fn list_saves(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else { return vec![] };
    let mut found: Vec<(std::time::SystemTime, PathBuf)> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |x| x == SAVE_EXT))
        .map(|p| {
            let modified = std::fs::metadata(&p)
                .and_then(|m| m.modified())
                .unwrap_or(std::time::UNIX_EPOCH);
            (modified, p)
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    found.into_iter().map(|(_, p)| p).collect()
}
