/// Error types for the engine and its level collaborators.
///
/// Blocked moves, pickups and drops are not errors; they come back as
/// `false` / `None` from the operation itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::entity::EntityId;

/// Failure reported by an engine operation. State is unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("level id is empty")]
    EmptyLevelId,
    #[error("save name is empty")]
    EmptySaveName,
    #[error("no level is active")]
    NoActiveSession,
    #[error("a save named '{0}' already exists")]
    SaveExists(String),
    #[error("could not load level: {0}")]
    Load(#[from] LoadError),
    #[error("could not save level: {0}")]
    Save(#[from] SaveError),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("level '{0}' not found")]
    NotFound(String),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid level data: {0}")]
    Invalid(String),
    #[error("load cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing level: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Registry and grid disagree. Always a bug in the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("block {id:?} at ({x}, {y}) has no grid cell at its support row")]
    UnreferencedBlock { id: EntityId, x: i32, y: i32 },
    #[error("grid cell ({x}, {row}) references {id:?}, which is not a live block there")]
    DanglingCell { x: usize, row: usize, id: EntityId },
}
