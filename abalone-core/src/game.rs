//! Game session: the authoritative board, apply/cancel and move history
//!
//! Every state change goes through [`Game::apply`] and [`Game::cancel`].
//! Search brackets each apply with a cancel instead of copying the board, so
//! an apply followed by a cancel must restore every cell exactly.

use crate::board::{Board, BoardSnapshot, CellId, Direction, Side, MIN_PIECES};
use crate::error::MoveError;
use crate::movegen::{legal_moves, Move};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Whether the last state change applied or cancelled a move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Apply,
    Cancel,
}

/// What changed most recently; renderers animate from this
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastAction {
    pub kind: ActionKind,
    pub mv: Move,
}

/// A move on the history stack with the side it ejected, if any
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    pub captured: Option<Side>,
}

// ============================================================================
// GAME
// ============================================================================

/// Board plus history. Not `Clone`: there is one live board per game.
#[derive(Debug)]
pub struct Game {
    board: Board,
    history: Vec<HistoryEntry>,
    last_action: Option<LastAction>,
}

impl Game {
    /// Game from the standard opening
    pub fn new() -> Self {
        Self::from_board(Board::standard())
    }

    /// Game from a custom position
    pub fn from_board(board: Board) -> Self {
        Self {
            board,
            history: Vec::new(),
            last_action: None,
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn occupant(&self, cell: CellId) -> Option<Side> {
        self.board.occupant(cell)
    }

    pub fn neighbor(&self, cell: CellId, direction: Direction) -> Option<CellId> {
        self.board.neighbor(cell, direction)
    }

    pub fn remaining_count(&self, side: Side) -> usize {
        self.board.remaining(side)
    }

    /// The side whose opponent has fewer than [`MIN_PIECES`] left
    pub fn winner(&self) -> Option<Side> {
        if self.board.remaining(Side::Black) < MIN_PIECES {
            Some(Side::White)
        } else if self.board.remaining(Side::White) < MIN_PIECES {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// Number of moves currently on the history stack
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn last_action(&self) -> Option<&LastAction> {
        self.last_action.as_ref()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    pub fn legal_moves(&self, side: Side) -> Vec<Move> {
        legal_moves(&self.board, side)
    }

    /// Match a host-built move against the generator.
    ///
    /// Step order is ignored; the generator's own move is returned so that
    /// it can be applied in its canonical order.
    pub fn find_legal(&self, side: Side, candidate: &Move) -> Result<Move, MoveError> {
        self.legal_moves(side)
            .into_iter()
            .find(|mv| mv.same_steps(candidate))
            .ok_or(MoveError::NotLegal)
    }

    // ========================================================================
    // STATE TRANSITIONS
    // ========================================================================

    /// Apply a generated move.
    ///
    /// Panics if a step moves a piece out of an empty cell: the move did not
    /// come from the generator for this position.
    pub fn apply(&mut self, mv: Move) {
        let mut captured = None;
        for step in mv.steps() {
            let Some(side) = self.board.occupant(step.from) else {
                panic!("apply {}: no piece on {}", mv, step.from);
            };
            self.board.set_occupant(step.from, None);
            match step.to {
                Some(to) => self.board.set_occupant(to, Some(side)),
                None => captured = Some(side),
            }
        }

        self.history.push(HistoryEntry { mv, captured });
        self.last_action = Some(LastAction {
            kind: ActionKind::Apply,
            mv,
        });
    }

    /// Undo the most recent move.
    ///
    /// Panics if there is nothing to undo.
    pub fn cancel(&mut self) -> Move {
        let Some(entry) = self.history.pop() else {
            panic!("cancel with empty history");
        };

        for step in entry.mv.steps().iter().rev() {
            let side = match step.to {
                Some(to) => {
                    let Some(side) = self.board.occupant(to) else {
                        panic!("cancel {}: no piece on {}", entry.mv, to);
                    };
                    self.board.set_occupant(to, None);
                    side
                }
                None => match entry.captured {
                    Some(side) => side,
                    None => panic!("cancel {}: ejected side was not recorded", entry.mv),
                },
            };
            self.board.set_occupant(step.from, Some(side));
        }

        self.last_action = Some(LastAction {
            kind: ActionKind::Cancel,
            mv: entry.mv,
        });
        entry.mv
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Cube, START_PIECES};
    use crate::movegen::Step;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn cell(label: &str) -> CellId {
        label.parse().unwrap()
    }

    fn game_with(black: &[&str], white: &[&str]) -> Game {
        let mut pieces = Vec::new();
        pieces.extend(black.iter().map(|l| (cell(l).cube(), Side::Black)));
        pieces.extend(white.iter().map(|l| (cell(l).cube(), Side::White)));
        Game::from_board(Board::from_pieces(&pieces).unwrap())
    }

    #[test]
    fn test_game_creation() {
        let game = Game::new();
        assert_eq!(game.remaining_count(Side::Black), START_PIECES);
        assert_eq!(game.remaining_count(Side::White), START_PIECES);
        assert_eq!(game.winner(), None);
        assert_eq!(game.ply(), 0);
        assert!(game.last_action().is_none());
    }

    #[test]
    fn test_apply_cancel_every_opening_move() {
        let mut game = Game::new();
        let before = game.snapshot();
        for side in Side::BOTH {
            for mv in game.legal_moves(side) {
                game.apply(mv);
                assert_ne!(game.snapshot(), before);
                assert_eq!(game.cancel(), mv);
                assert_eq!(game.snapshot(), before);
            }
        }
        assert_eq!(game.ply(), 0);
    }

    #[test]
    fn test_random_playouts_restore() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let mut game = Game::new();
            let mut snapshots = vec![game.snapshot()];
            let mut side = Side::Black;

            for _ in 0..60 {
                if game.winner().is_some() {
                    break;
                }
                let moves = game.legal_moves(side);
                let Some(&mv) = moves.choose(&mut rng) else {
                    break;
                };

                let total = game.remaining_count(Side::Black) + game.remaining_count(Side::White);
                game.apply(mv);
                let after = game.remaining_count(Side::Black) + game.remaining_count(Side::White);
                let expected_loss = usize::from(mv.is_capture());
                assert_eq!(total - after, expected_loss);

                snapshots.push(game.snapshot());
                side = side.opponent();
            }

            // Unwind everything, checking each intermediate position
            snapshots.pop();
            while game.ply() > 0 {
                game.cancel();
                assert_eq!(Some(&game.snapshot()), snapshots.last());
                snapshots.pop();
            }
        }
    }

    #[test]
    fn test_every_move_sound_at_random_positions() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        for _ in 0..8 {
            let mut game = Game::new();
            let mut side = Side::Black;

            for _ in 0..80 {
                if game.winner().is_some() {
                    break;
                }
                let before = game.snapshot();
                let total = game.remaining_count(Side::Black) + game.remaining_count(Side::White);

                for mover in Side::BOTH {
                    let moves = game.legal_moves(mover);
                    for (i, &mv) in moves.iter().enumerate() {
                        // Rear piece is applied last and always belongs to the mover
                        let rear = mv.steps()[mv.len() - 1].from;
                        assert_eq!(game.occupant(rear), Some(mover), "{}", mv);
                        assert!(
                            moves[i + 1..].iter().all(|other| !other.same_steps(&mv)),
                            "duplicate move {}",
                            mv
                        );

                        game.apply(mv);
                        let after =
                            game.remaining_count(Side::Black) + game.remaining_count(Side::White);
                        assert_eq!(total - after, usize::from(mv.is_capture()));
                        assert_eq!(game.cancel(), mv);
                        assert_eq!(game.snapshot(), before, "{}", mv);
                    }
                }

                let moves = game.legal_moves(side);
                let Some(&mv) = moves.choose(&mut rng) else {
                    break;
                };
                game.apply(mv);
                side = side.opponent();
            }
        }
    }

    #[test]
    fn test_two_piece_slide_applies() {
        let mut game = game_with(&["A1", "A2"], &[]);
        let mv = game
            .find_legal(
                Side::Black,
                &Move::new(&[
                    Step::new(cell("A1"), Some(cell("A2"))),
                    Step::new(cell("A2"), Some(cell("A3"))),
                ]),
            )
            .unwrap();
        game.apply(mv);
        assert_eq!(game.occupant(cell("A1")), None);
        assert_eq!(game.occupant(cell("A2")), Some(Side::Black));
        assert_eq!(game.occupant(cell("A3")), Some(Side::Black));
        assert_eq!(
            game.last_action(),
            Some(&LastAction {
                kind: ActionKind::Apply,
                mv
            })
        );
    }

    #[test]
    fn test_capture_and_restore() {
        let mut game = game_with(&["C3", "B3"], &["A3"]);
        let capture = game.legal_moves(Side::Black)[0];
        assert!(capture.is_capture());

        game.apply(capture);
        assert_eq!(game.remaining_count(Side::White), 0);
        assert_eq!(game.history()[0].captured, Some(Side::White));
        assert_eq!(game.occupant(cell("A3")), Some(Side::Black));

        game.cancel();
        assert_eq!(game.occupant(cell("A3")), Some(Side::White));
        assert_eq!(game.occupant(cell("B3")), Some(Side::Black));
        assert_eq!(game.occupant(cell("C3")), Some(Side::Black));
        assert_eq!(game.last_action().map(|a| a.kind), Some(ActionKind::Cancel));
    }

    #[test]
    fn test_winner() {
        // Black reduced to 8 pieces
        let mut pieces: Vec<(Cube, Side)> = Vec::new();
        let black_cells = ["A1", "A2", "A3", "A4", "A5", "B1", "B2", "B3"];
        let white_cells = ["I5", "I6", "I7", "I8", "I9", "H4", "H5", "H6", "H7"];
        pieces.extend(black_cells.iter().map(|l| (cell(l).cube(), Side::Black)));
        pieces.extend(white_cells.iter().map(|l| (cell(l).cube(), Side::White)));
        let game = Game::from_board(Board::from_pieces(&pieces).unwrap());
        assert_eq!(game.remaining_count(Side::Black), 8);
        assert_eq!(game.winner(), Some(Side::White));

        // Reverse colors
        let flipped: Vec<_> = pieces.iter().map(|&(c, s)| (c, s.opponent())).collect();
        let game = Game::from_board(Board::from_pieces(&flipped).unwrap());
        assert_eq!(game.winner(), Some(Side::Black));
    }

    #[test]
    fn test_find_legal_ignores_order() {
        let game = game_with(&["E4", "E5"], &[]);
        let reversed = Move::new(&[
            Step::new(cell("E5"), Some(cell("D5"))),
            Step::new(cell("E4"), Some(cell("D4"))),
        ]);
        let found = game.find_legal(Side::Black, &reversed).unwrap();
        assert!(found.same_steps(&reversed));

        let bogus = Move::new(&[Step::new(cell("E5"), Some(cell("C5")))]);
        assert_eq!(game.find_legal(Side::Black, &bogus), Err(MoveError::NotLegal));
    }

    #[test]
    #[should_panic(expected = "cancel with empty history")]
    fn test_cancel_without_history_panics() {
        Game::new().cancel();
    }

    #[test]
    #[should_panic(expected = "no piece on")]
    fn test_apply_from_empty_cell_panics() {
        let mut game = Game::new();
        game.apply(Move::new(&[Step::new(cell("E5"), Some(cell("E6")))]));
    }
}
