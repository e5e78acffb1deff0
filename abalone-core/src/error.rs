//! Error types for host-facing operations
//!
//! Broken engine invariants (cancel without history, apply from an empty
//! cell) are not represented here: they panic.

use std::path::PathBuf;

use crate::board::Cube;

/// A cell label that does not name a board cell
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a board cell: {0:?}")]
pub struct ParseCellError(pub String);

/// Invalid custom board setup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("cell {0:?} is off the board")]
    OffBoard(Cube),

    #[error("cell {0:?} is occupied twice")]
    Duplicate(Cube),
}

/// A host-built move rejected by the engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("not a legal move")]
    NotLegal,
}

/// Cell picks that cannot form a move
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no pieces selected")]
    Empty,

    #[error("{0} does not hold one of your pieces")]
    NotOwnPiece(String),

    #[error("selected pieces must be adjacent and in one line")]
    NotInLine,

    #[error("at most 3 pieces can move together")]
    TooMany,

    #[error("the selected pieces cannot move to {0}")]
    Unreachable(String),
}

/// Engine configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("depth schedule is empty")]
    EmptySchedule,

    #[error("depth schedule must start at ply 0, found {0}")]
    ScheduleStart(u32),

    #[error("depth schedule plies must increase (ply {0} after {1})")]
    ScheduleOrder(u32, u32),

    #[error("depth schedule must not get shallower (depth {0} after {1})")]
    ScheduleDepth(u32, u32),

    #[error("search depth must be at least 1")]
    ZeroDepth,

    #[error("node budget must be positive")]
    ZeroBudget,

    #[error("yield interval must be positive")]
    ZeroYieldInterval,

    #[error("evaluation weight {0} is negative")]
    NegativeWeight(&'static str),

    #[error("evaluation weights can reach {0}, must stay below the win score")]
    WeightsTooLarge(i64),
}
