//! Building moves from a human's cell picks
//!
//! A player first picks up to three of their own pieces that sit next to
//! each other in one line, then names a target cell. The target either
//! shifts the whole group one step (the direction must be unambiguous) or,
//! for two or three pieces, pushes the line into the target, possibly
//! shoving a shorter opposing line ahead of it. The result is always checked
//! against the move generator.

use std::cmp::Reverse;

use crate::board::{Board, CellId, Cube, Direction, Side};
use crate::error::SelectionError;
use crate::game::Game;
use crate::movegen::{Move, Step};

/// Largest group that moves together
pub const MAX_SELECTION: usize = 3;

/// Result of adding one cell to a selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pick {
    Added,
    Duplicate,
    /// The cell did not fit, so the selection starts over with it
    Restarted,
}

/// Pieces currently picked by one side
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    side: Side,
    cells: Vec<CellId>,
}

impl Selection {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            cells: Vec::with_capacity(MAX_SELECTION),
        }
    }

    /// Strict selection for typed input: every cell must extend the group
    pub fn from_cells(board: &Board, side: Side, cells: &[CellId]) -> Result<Self, SelectionError> {
        if cells.is_empty() {
            return Err(SelectionError::Empty);
        }

        let mut selection = Self::new(side);
        for &cell in cells {
            if board.occupant(cell) != Some(side) {
                return Err(SelectionError::NotOwnPiece(cell.to_string()));
            }
            if selection.cells.contains(&cell) {
                continue;
            }
            if selection.cells.len() == MAX_SELECTION {
                return Err(SelectionError::TooMany);
            }
            if selection.pick(cell) == Pick::Restarted {
                return Err(SelectionError::NotInLine);
            }
        }
        Ok(selection)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Interactive pick: anything other than an own piece clears the
    /// selection, and a piece that does not extend the group starts a new one.
    pub fn click(&mut self, board: &Board, cell: Option<CellId>) {
        match cell {
            Some(cell) if board.occupant(cell) == Some(self.side) => {
                self.pick(cell);
            }
            _ => self.clear(),
        }
    }

    fn pick(&mut self, cell: CellId) -> Pick {
        if self.cells.contains(&cell) {
            return Pick::Duplicate;
        }

        let fits = match self.cells.len() {
            0 => true,
            MAX_SELECTION => false,
            len => {
                let mut group = self.cells.clone();
                group.push(cell);
                // Spread over the three coordinates: one step or two steps along one line
                let expected = if len == 1 { [0, 1, 1] } else { [0, 2, 2] };
                spreads(&group) == expected
            }
        };

        if fits {
            self.cells.push(cell);
            Pick::Added
        } else {
            self.cells.clear();
            self.cells.push(cell);
            Pick::Restarted
        }
    }

    /// Turn the selection plus a target cell into a legal move
    pub fn build_move(&self, game: &Game, target: CellId) -> Result<Move, SelectionError> {
        if self.cells.is_empty() {
            return Err(SelectionError::Empty);
        }

        let board = game.board();
        let unreachable = || SelectionError::Unreachable(target.to_string());
        let candidate = self
            .shift_move(board, target)
            .or_else(|| self.line_move(board, target))
            .ok_or_else(unreachable)?;

        game.find_legal(self.side, &candidate).map_err(|_| unreachable())
    }

    /// Every picked piece steps once in the single direction that reaches
    /// the empty target
    fn shift_move(&self, board: &Board, target: CellId) -> Option<Move> {
        if board.occupant(target).is_some() {
            return None;
        }

        let mut reaching = self.cells.iter().flat_map(|&cell| {
            Direction::ALL
                .into_iter()
                .filter(move |&dir| board.neighbor(cell, dir) == Some(target))
        });
        let direction = reaching.next()?;
        if reaching.next().is_some() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.cells.len());
        for &cell in &self.cells {
            let to = board.neighbor(cell, direction)?;
            if board.occupant(to).is_some() {
                return None;
            }
            steps.push(Step::new(cell, Some(to)));
        }
        Some(Move::new(&steps))
    }

    /// The line advances into the target, pushing opposing pieces if it
    /// outnumbers them
    fn line_move(&self, board: &Board, target: CellId) -> Option<Move> {
        if self.cells.len() < 2 || board.occupant(target) == Some(self.side) {
            return None;
        }

        let target_cube = target.cube();
        let mut line = self.cells.clone();
        line.push(target);
        let collinear = [0, 1, 2].into_iter().any(|axis| {
            line.iter()
                .all(|cell| coordinate(cell.cube(), axis) == coordinate(target_cube, axis))
        });
        if !collinear {
            return None;
        }

        let direction = self.cells.iter().find_map(|&cell| {
            Direction::ALL
                .into_iter()
                .find(|&dir| board.neighbor(cell, dir) == Some(target))
        })?;

        // Back of the line first
        let mut group = self.cells.clone();
        group.sort_by_key(|&cell| {
            let cube = cell.cube();
            Reverse(
                (cube.a - target_cube.a).abs()
                    + (cube.b - target_cube.b).abs()
                    + (cube.c - target_cube.c).abs(),
            )
        });

        let mut steps: Vec<Step> = group
            .iter()
            .map(|&cell| Step::new(cell, board.neighbor(cell, direction)))
            .collect();

        if board.occupant(target) == Some(self.side.opponent()) {
            let max_steps = 2 * group.len() - 1;
            let mut cell = target;
            loop {
                let next = board.neighbor(cell, direction);
                steps.push(Step::new(cell, next));
                if steps.len() > max_steps {
                    return None;
                }
                let Some(next) = next else {
                    break;
                };
                match board.occupant(next) {
                    None => break,
                    Some(side) if side == self.side => return None,
                    Some(_) => cell = next,
                }
            }
        }

        // Front first, so no piece lands on an occupied cell
        steps.reverse();
        Some(Move::new(&steps))
    }
}

fn coordinate(cube: Cube, axis: usize) -> i8 {
    match axis {
        0 => cube.a,
        1 => cube.b,
        _ => cube.c,
    }
}

/// Sorted max-minus-min spread of each cube coordinate over `cells`
fn spreads(cells: &[CellId]) -> [i8; 3] {
    let mut result = [0i8; 3];
    for (axis, spread) in result.iter_mut().enumerate() {
        let values = cells.iter().map(|cell| coordinate(cell.cube(), axis));
        let max = values.clone().max().unwrap_or(0);
        let min = values.min().unwrap_or(0);
        *spread = max - min;
    }
    result.sort_unstable();
    result
}

// ============================================================================
// TESTS
// ============================================================================
