//! Legal move generation
//!
//! Two families, generated independently and concatenated:
//! - line moves: 2 or 3 own pieces pushing along their line, possibly
//!   shoving 1 or 2 opposing pieces into an empty cell or off the board
//! - shift moves: 1 to 3 adjacent collinear pieces stepping sideways into
//!   empty cells
//!
//! The generator is the only authority on legality. Line moves come first,
//! ranked by pattern so that captures are searched before quiet slides.

use std::fmt;

use crate::board::{Board, CellId, Direction, Side};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Most pieces a single move can displace (3 pushers + 2 pushed)
pub const MAX_STEPS: usize = 5;

/// Recognized line walks, most aggressive first.
/// `*` own piece, `#` opposing piece, `e` empty cell, `r` board edge.
const LINE_PATTERNS: [&[u8]; 7] = [
    b"**#r", b"***##r", b"***##e", b"***#e", b"**#e", b"***e", b"**e",
];

/// Pieces a line walk may pass before it can no longer match a pattern
const MAX_LINE_PIECES: usize = 5;

// ============================================================================
// MOVE
// ============================================================================

/// One piece displacement; `to == None` ejects the piece from the board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Step {
    pub from: CellId,
    pub to: Option<CellId>,
}

impl Step {
    pub fn new(from: CellId, to: Option<CellId>) -> Self {
        Self { from, to }
    }
}

/// Ordered piece displacements, applied front piece first.
///
/// Stored inline so moves are `Copy`; unused slots stay at their default so
/// derived equality only compares the live steps.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    steps: [Step; MAX_STEPS],
    len: u8,
}

impl Move {
    /// Build a move from its steps in application order
    ///
    /// Panics if `steps` is empty or longer than [`MAX_STEPS`].
    pub fn new(steps: &[Step]) -> Self {
        assert!(
            !steps.is_empty() && steps.len() <= MAX_STEPS,
            "a move has 1 to {} steps, got {}",
            MAX_STEPS,
            steps.len()
        );
        let mut mv = Self::empty();
        for &step in steps {
            mv.push(step);
        }
        mv
    }

    fn empty() -> Self {
        Self {
            steps: [Step::default(); MAX_STEPS],
            len: 0,
        }
    }

    fn push(&mut self, step: Step) {
        self.steps[self.len as usize] = step;
        self.len += 1;
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Does this move eject a piece?
    pub fn is_capture(&self) -> bool {
        self.steps().iter().any(|s| s.to.is_none())
    }

    /// Same displacements regardless of step order
    pub fn same_steps(&self, other: &Move) -> bool {
        self.len == other.len && self.steps().iter().all(|s| other.steps().contains(s))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match step.to {
                Some(to) => write!(f, "{}-{}", step.from, to)?,
                None => write!(f, "{}-off", step.from)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self)
    }
}

// ============================================================================
// GENERATION
// ============================================================================

/// Every legal move for `side`: line moves by pattern rank, then shift moves
pub fn legal_moves(board: &Board, side: Side) -> Vec<Move> {
    let mut moves = line_moves(board, side);
    shift_moves(board, side, &mut moves);
    moves
}

/// In-line pushes grouped by matched pattern
pub fn line_moves(board: &Board, side: Side) -> Vec<Move> {
    let mut ranked: [Vec<Move>; LINE_PATTERNS.len()] = Default::default();

    for direction in Direction::ALL {
        for start in board.cells_of(side) {
            if let Some((rank, mv)) = walk_line(board, side, start, direction) {
                ranked[rank].push(mv);
            }
        }
    }

    ranked.into_iter().flatten().collect()
}

/// Walk from `start` along `direction` and match the walk against the
/// recognized patterns. Returns the pattern rank and the push chain.
fn walk_line(
    board: &Board,
    side: Side,
    start: CellId,
    direction: Direction,
) -> Option<(usize, Move)> {
    let mut pattern = [0u8; MAX_LINE_PIECES + 1];
    let mut pieces = [CellId::default(); MAX_LINE_PIECES];
    let mut count = 0;
    let mut current = Some(start);

    // None: walked off the edge
    let terminus = loop {
        let Some(cell) = current else {
            pattern[count] = b'r';
            break None;
        };
        let symbol = match board.occupant(cell) {
            None => {
                pattern[count] = b'e';
                break Some(cell);
            }
            Some(s) if s == side => b'*',
            Some(_) => b'#',
        };
        if count == MAX_LINE_PIECES {
            return None;
        }
        pattern[count] = symbol;
        pieces[count] = cell;
        count += 1;
        current = board.neighbor(cell, direction);
    };

    let rank = LINE_PATTERNS
        .iter()
        .position(|p| *p == &pattern[..=count])?;

    // Front piece first so no cell is overwritten before it is vacated
    let mut mv = Move::empty();
    mv.push(Step::new(pieces[count - 1], terminus));
    for i in (0..count - 1).rev() {
        mv.push(Step::new(pieces[i], Some(pieces[i + 1])));
    }
    Some((rank, mv))
}

/// Broadside moves for chains of 3, then 2, then single pieces
fn shift_moves(board: &Board, side: Side, moves: &mut Vec<Move>) {
    for length in [3, 2] {
        for start in board.cells_of(side) {
            for axis in Direction::AXES {
                let Some(group) = collect_group(board, side, start, axis, length) else {
                    continue;
                };
                for direction in Direction::ALL {
                    if direction.axis() == axis.axis() {
                        continue;
                    }
                    if let Some(mv) = shift_group(board, &group[..length], direction) {
                        moves.push(mv);
                    }
                }
            }
        }
    }

    // A lone piece may step into any empty neighbor
    for cell in board.cells_of(side) {
        for direction in Direction::ALL {
            if let Some(next) = board.neighbor(cell, direction) {
                if board.occupant(next).is_none() {
                    moves.push(Move::new(&[Step::new(cell, Some(next))]));
                }
            }
        }
    }
}

/// `length` consecutive own cells starting at `start` along `axis`
fn collect_group(
    board: &Board,
    side: Side,
    start: CellId,
    axis: Direction,
    length: usize,
) -> Option<[CellId; 3]> {
    let mut group = [start; 3];
    for i in 1..length {
        let next = board.neighbor(group[i - 1], axis)?;
        if board.occupant(next) != Some(side) {
            return None;
        }
        group[i] = next;
    }
    Some(group)
}

/// Every cell of `group` steps one cell in `direction`, all landing on empty
/// board cells, or no move at all
fn shift_group(board: &Board, group: &[CellId], direction: Direction) -> Option<Move> {
    let mut mv = Move::empty();
    for &cell in group {
        let next = board.neighbor(cell, direction)?;
        if board.occupant(next).is_some() {
            return None;
        }
        mv.push(Step::new(cell, Some(next)));
    }
    Some(mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cube;

    fn cell(label: &str) -> CellId {
        label.parse().unwrap()
    }

    fn board_with(black: &[&str], white: &[&str]) -> Board {
        let mut pieces = Vec::new();
        pieces.extend(black.iter().map(|l| (cell(l).cube(), Side::Black)));
        pieces.extend(white.iter().map(|l| (cell(l).cube(), Side::White)));
        Board::from_pieces(&pieces).unwrap()
    }

    fn find(moves: &[Move], steps: &[(&str, Option<&str>)]) -> Option<Move> {
        let wanted = Move::new(
            &steps
                .iter()
                .map(|&(from, to)| Step::new(cell(from), to.map(cell)))
                .collect::<Vec<_>>(),
        );
        moves.iter().copied().find(|m| *m == wanted)
    }

    #[test]
    fn test_opening_move_count() {
        let board = Board::standard();
        for side in Side::BOTH {
            let moves = legal_moves(&board, side);
            assert_eq!(moves.len(), 44);
            assert_eq!(line_moves(&board, side).len(), 20);
        }
    }

    #[test]
    fn test_no_duplicates() {
        let board = Board::standard();
        let moves = legal_moves(&board, Side::Black);
        for (i, a) in moves.iter().enumerate() {
            for b in &moves[i + 1..] {
                assert!(!a.same_steps(b), "duplicate move {}", a);
            }
        }
    }

    #[test]
    fn test_moves_are_sound() {
        let board = Board::standard();
        for side in Side::BOTH {
            for mv in legal_moves(&board, side) {
                let first = board.occupant(mv.steps()[0].from);
                assert!(first.is_some());
                for step in mv.steps() {
                    assert!(board.occupant(step.from).is_some());
                }
                // Pieces of the mover all come from its own side
                let own = mv
                    .steps()
                    .iter()
                    .filter(|s| board.occupant(s.from) == Some(side))
                    .count();
                assert!(own >= 1);
                // Landing cells are empty or vacated by the same move
                for step in mv.steps() {
                    if let Some(to) = step.to {
                        let vacated = mv.steps().iter().any(|s| s.from == to);
                        assert!(board.occupant(to).is_none() || vacated, "{}", mv);
                    }
                }
            }
        }
    }

    #[test]
    fn test_two_piece_slide_from_edge() {
        // A1 sits on the edge, A2 next to it, A3 empty behind them
        let board = board_with(&["A1", "A2"], &[]);
        let moves = legal_moves(&board, Side::Black);
        assert!(find(&moves, &[("A2", Some("A3")), ("A1", Some("A2"))]).is_some());
    }

    #[test]
    fn test_capture_ranks_first() {
        // Two Black pieces push a White piece off the A-row edge
        let board = board_with(&["C3", "B3"], &["A3"]);
        let moves = legal_moves(&board, Side::Black);
        let capture = find(&moves, &[("A3", None), ("B3", Some("A3")), ("C3", Some("B3"))]);
        assert_eq!(capture, Some(moves[0]));
        assert!(moves[0].is_capture());
        assert_eq!(moves.iter().filter(|m| m.is_capture()).count(), 1);
    }

    #[test]
    fn test_three_push_one_off_edge_uses_two_pushers() {
        // ***#r is not a pattern: the push is produced by the trailing pair
        let board = board_with(&["D3", "C3", "B3"], &["A3"]);
        let moves = legal_moves(&board, Side::Black);
        assert!(find(&moves, &[("A3", None), ("B3", Some("A3")), ("C3", Some("B3"))]).is_some());
        assert!(find(
            &moves,
            &[("A3", None), ("B3", Some("A3")), ("C3", Some("B3")), ("D3", Some("C3"))]
        )
        .is_none());
    }

    #[test]
    fn test_three_push_two_into_empty() {
        let board = board_with(&["E5", "D4", "C3"], &["F6", "G7"]);
        let moves = legal_moves(&board, Side::Black);
        let push = find(
            &moves,
            &[
                ("G7", Some("H8")),
                ("F6", Some("G7")),
                ("E5", Some("F6")),
                ("D4", Some("E5")),
                ("C3", Some("D4")),
            ],
        );
        assert!(push.is_some());
        assert_eq!(push.unwrap().len(), MAX_STEPS);
    }

    #[test]
    fn test_blocked_pushes() {
        // Equal numbers cannot push
        let board = board_with(&["E5", "D4"], &["F6", "G7"]);
        let moves = line_moves(&board, Side::Black);
        assert!(moves.iter().all(|m| m.steps()[0].from != cell("G7")));

        // A push needs empty space or the edge behind the last opposing piece
        let board = board_with(&["E5", "D4", "G7"], &["F6"]);
        let moves = line_moves(&board, Side::Black);
        assert!(moves.iter().all(|m| m.steps().iter().all(|s| s.from != cell("F6"))));

        // Four in a row are too many to move along their line
        let board = board_with(&["B2", "C3", "D4", "E5"], &[]);
        let moves = line_moves(&board, Side::Black);
        assert!(moves.iter().all(|m| m.len() <= 3));
    }

    #[test]
    fn test_broadside_shift() {
        // Three in a row along row E can all step into row D
        let board = board_with(&["E4", "E5", "E6"], &[]);
        let shift = [("E4", Some("D4")), ("E5", Some("D5")), ("E6", Some("D6"))];
        let moves = legal_moves(&board, Side::Black);
        assert!(find(&moves, &shift).is_some());

        // Blocking one landing cell rejects the whole three-piece shift
        let board = board_with(&["E4", "E5", "E6"], &["D5"]);
        let moves = legal_moves(&board, Side::Black);
        assert!(find(&moves, &shift).is_none());
        assert!(moves
            .iter()
            .all(|m| m.steps().iter().all(|s| s.to != Some(cell("D5")))));
    }

    #[test]
    fn test_single_piece_moves() {
        let board = board_with(&["E5"], &[]);
        let moves = legal_moves(&board, Side::Black);
        assert_eq!(moves.len(), 6);
        assert!(moves.iter().all(|m| m.len() == 1));

        let corner = Board::from_pieces(&[(Cube::new(4, -4), Side::White)]).unwrap();
        assert_eq!(legal_moves(&corner, Side::White).len(), 3);
    }

    #[test]
    fn test_display() {
        let mv = Move::new(&[
            Step::new(cell("A3"), None),
            Step::new(cell("B3"), Some(cell("A3"))),
        ]);
        assert_eq!(mv.to_string(), "A3-off B3-A3");
    }
}
