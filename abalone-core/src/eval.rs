//! Position evaluation
//!
//! Scores are integers from one side's perspective (positive favors it).
//! A decided game saturates at [`WIN_SCORE`]; otherwise each side gets a
//! total from material, position, cover and edge threats, and the score is
//! the difference of the two totals.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::board::{
    Board, CellId, Direction, Side, Topology, BOARD_RADIUS, MIN_PIECES, START_PIECES,
};
use crate::error::ConfigError;

/// Win value; no combination of non-terminal terms reaches it
pub const WIN_SCORE: i32 = 1_000_000;

/// Heuristic weights for position evaluation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Multiplier for the squared piece count
    pub material: i32,
    /// Per piece, per ring closer to the center
    pub center: i32,
    /// Per piece, per row advanced toward the opposing edge
    pub advance: i32,
    /// Same-side piece directly behind, per direction
    pub cover_near: i32,
    /// Same-side piece two cells behind, per direction
    pub cover_far: i32,
    /// Per edge run where this side can push a piece off
    pub threat: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            material: 100,
            center: 8,
            advance: 2,
            cover_near: 3,
            cover_far: 1,
            threat: 150,
        }
    }
}

impl EvalWeights {
    /// Upper bound on the magnitude of one side's non-terminal total
    pub fn max_side_total(&self) -> i64 {
        let pieces = START_PIECES as i64;
        let radius = BOARD_RADIUS as i64;
        let runs = edge_runs().len() as i64;

        self.material as i64 * pieces * pieces
            + pieces * radius * (self.center as i64 + self.advance as i64)
            + pieces * 6 * (self.cover_near as i64 + self.cover_far as i64)
            + runs * self.threat as i64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("material", self.material),
            ("center", self.center),
            ("advance", self.advance),
            ("cover_near", self.cover_near),
            ("cover_far", self.cover_far),
            ("threat", self.threat),
        ];
        if let Some(&(name, _)) = named.iter().find(|(_, w)| *w < 0) {
            return Err(ConfigError::NegativeWeight(name));
        }

        let span = 2 * self.max_side_total();
        if span >= WIN_SCORE as i64 {
            return Err(ConfigError::WeightsTooLarge(span));
        }
        Ok(())
    }
}

/// Evaluate `board` from `perspective`'s point of view
pub fn evaluate(board: &Board, perspective: Side, weights: &EvalWeights) -> i32 {
    if let Some(score) = terminal_score(board, perspective) {
        return score;
    }

    let totals = side_totals(board, weights);
    totals[perspective.index()] - totals[perspective.opponent().index()]
}

/// Saturated score once a side is below [`MIN_PIECES`]
pub fn terminal_score(board: &Board, perspective: Side) -> Option<i32> {
    let mine_lost = board.remaining(perspective) < MIN_PIECES;
    let theirs_lost = board.remaining(perspective.opponent()) < MIN_PIECES;

    match (mine_lost, theirs_lost) {
        (false, false) => None,
        (true, false) => Some(-WIN_SCORE),
        (false, true) => Some(WIN_SCORE),
        (true, true) => Some(0),
    }
}

/// Non-terminal totals per side, indexed by [`Side::index`]
pub fn side_totals(board: &Board, weights: &EvalWeights) -> [i32; 2] {
    let topology = board.topology();
    let mut totals = [0i32; 2];

    for side in Side::BOTH {
        let count = board.remaining(side) as i32;
        let mut total = weights.material * count * count;

        for cell in board.cells_of(side) {
            let cube = topology.cube(cell);
            total += weights.center * (BOARD_RADIUS - cube.distance_to_center()) as i32;
            total += weights.advance * side.progress(cube) as i32;
            total += cover(board, side, cell, weights);
        }

        totals[side.index()] = total;
    }

    for run in edge_runs() {
        if let Some(attacker) = run.attacker(board) {
            totals[attacker.index()] += weights.threat;
        }
    }

    totals
}

/// Support from same-side pieces one and two cells away along each line
fn cover(board: &Board, side: Side, cell: CellId, weights: &EvalWeights) -> i32 {
    let mut score = 0;
    for direction in Direction::ALL {
        let Some(near) = board.neighbor(cell, direction) else {
            continue;
        };
        if board.occupant(near) != Some(side) {
            continue;
        }
        score += weights.cover_near;
        if let Some(far) = board.neighbor(near, direction) {
            if board.occupant(far) == Some(side) {
                score += weights.cover_far;
            }
        }
    }
    score
}

// ============================================================================
// EDGE THREATS
// ============================================================================

/// A straight run of 3 or 5 cells ending on an edge cell, in a direction
/// that leaves the board from that cell. `cells[0]` is the edge cell.
///
/// Runs are enumerated per edge cell and exit direction, pointing inward,
/// so each one is a line along which a push could eject the edge piece.
#[derive(Clone, Copy, Debug)]
struct EdgeRun {
    cells: [CellId; 5],
    len: usize,
}

impl EdgeRun {
    /// Side that can push the edge pieces off: `**#` or `***##` read from
    /// the inside out, no gaps
    fn attacker(&self, board: &Board) -> Option<Side> {
        let victims = self.len / 2;
        let victim = board.occupant(self.cells[0])?;
        let attacker = victim.opponent();

        let cells = &self.cells[..self.len];
        let victims_ok = cells[..victims].iter().all(|&c| board.occupant(c) == Some(victim));
        let attackers_ok = cells[victims..].iter().all(|&c| board.occupant(c) == Some(attacker));
        (victims_ok && attackers_ok).then_some(attacker)
    }
}

fn edge_runs() -> &'static [EdgeRun] {
    static RUNS: OnceLock<Vec<EdgeRun>> = OnceLock::new();
    RUNS.get_or_init(|| build_edge_runs(Topology::shared()))
}

fn build_edge_runs(topology: &Topology) -> Vec<EdgeRun> {
    let mut runs = Vec::new();

    for edge in CellId::all().filter(|&c| topology.is_edge(c)) {
        for exit in Direction::ALL {
            if topology.neighbor(edge, exit).is_some() {
                continue;
            }
            let inward = exit.opposite();

            for len in [3, 5] {
                let mut cells = [edge; 5];
                let complete = (1..len).all(|i| match topology.neighbor(cells[i - 1], inward) {
                    Some(next) => {
                        cells[i] = next;
                        true
                    }
                    None => false,
                });
                if complete {
                    runs.push(EdgeRun { cells, len });
                }
            }
        }
    }

    runs
}
