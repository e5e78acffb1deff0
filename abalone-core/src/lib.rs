//! Abalone Core - Game engine and AI
//!
//! This crate provides the core game logic for Abalone:
//! - Board geometry (61-cell hex board, cube coordinates, dense cell ids)
//! - Legal move generation (line pushes and broadside shifts)
//! - Apply/cancel with a move history
//! - Position evaluation
//! - Resumable iterative-deepening alpha-beta search
//! - Move building from a human's cell picks

pub mod board;
pub mod config;
pub mod error;
pub mod eval;
pub mod game;
pub mod movegen;
pub mod search;
pub mod selection;

// Re-exports for convenient access
pub use board::{
    Board, BoardSnapshot, CellId, Cube, Direction, Side, CELL_COUNT, MIN_PIECES, START_PIECES,
};
pub use config::{DepthStage, EngineConfig, SearchConfig};
pub use error::{ConfigError, MoveError, ParseCellError, SelectionError, SetupError};
pub use eval::{evaluate, EvalWeights, WIN_SCORE};
pub use game::{ActionKind, Game, HistoryEntry, LastAction};
pub use movegen::{legal_moves, Move, Step};
pub use search::{SearchOutcome, SearchProgress, SearchStatus, SearchTask, Searcher};
pub use selection::Selection;
