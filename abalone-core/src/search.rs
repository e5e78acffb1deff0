//! Iterative-deepening alpha-beta search
//!
//! The search runs as a resumable task: [`SearchTask::step`] explores until
//! a fixed number of leaf evaluations have passed, then returns
//! [`SearchStatus::Thinking`] so the host can keep its interface alive, and
//! picks up exactly where it stopped on the next call. Recursion is replaced
//! by an explicit stack of frames, one per applied move.
//!
//! The task holds the game mutably for its whole life, so nothing else can
//! touch the board while a search is suspended. Every apply made by the
//! search is matched by a cancel, either as the search unwinds or when an
//! unfinished task is dropped.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::board::Side;
use crate::config::{EngineConfig, SearchConfig};
use crate::eval::{evaluate, EvalWeights, WIN_SCORE};
use crate::game::Game;
use crate::movegen::Move;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Bound outside every reachable score
const INF: i32 = WIN_SCORE + 1;

/// Default seed for reproducible play
const DEFAULT_SEED: u64 = 42;

// ============================================================================
// RESULTS
// ============================================================================

/// Where a suspended search stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchProgress {
    /// Depth of the iteration in progress
    pub depth: u32,
    /// Leaf evaluations so far
    pub leaves: u64,
}

/// The chosen move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    pub mv: Move,
    /// Score of the move; `None` when it was picked without evaluation
    pub score: Option<i32>,
    /// Depth of the last completed iteration
    pub depth: u32,
    pub leaves: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    Thinking(SearchProgress),
    Decided(SearchOutcome),
}

// ============================================================================
// SEARCHER
// ============================================================================

/// Alpha-beta player
pub struct Searcher {
    config: SearchConfig,
    weights: EvalWeights,
    rng: ChaCha8Rng,
}

impl Searcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_seed(config, DEFAULT_SEED)
    }

    pub fn with_seed(config: &EngineConfig, seed: u64) -> Self {
        Self {
            config: config.search.clone(),
            weights: config.weights.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Start a search for `side` at the depth scheduled for the current ply.
    ///
    /// The very first move of a game is picked at random without search.
    /// Returns `None` if `side` has no legal move.
    pub fn start<'g>(&mut self, game: &'g mut Game, side: Side) -> Option<SearchTask<'g>> {
        let ply = game.ply();
        let depth = self.config.depth_for_ply(ply);
        let mut task = self.start_at_depth(game, side, depth)?;

        if ply == 0 {
            let mv = *task.root_moves.choose(&mut task.rng)?;
            debug!("opening move {} picked at random", mv);
            task.outcome = Some(SearchOutcome {
                mv,
                score: None,
                depth: 0,
                leaves: 0,
            });
        }
        Some(task)
    }

    /// Start a search for `side` deepening up to `depth`, whatever the ply
    pub fn start_at_depth<'g>(
        &mut self,
        game: &'g mut Game,
        side: Side,
        depth: u32,
    ) -> Option<SearchTask<'g>> {
        let root_moves = game.legal_moves(side);
        if root_moves.is_empty() {
            return None;
        }

        Some(SearchTask {
            base_ply: game.ply(),
            game,
            side,
            weights: self.weights.clone(),
            target_depth: depth.max(1),
            node_budget: self.config.node_budget,
            yield_every: self.config.yield_every.max(1),
            rng: ChaCha8Rng::seed_from_u64(self.rng.gen()),
            root_moves,
            frames: Vec::new(),
            root_scores: Vec::new(),
            iteration_depth: 0,
            completed: None,
            leaves: 0,
            outcome: None,
        })
    }

    /// Run a search to completion, ignoring yields
    pub fn search_move(&mut self, game: &mut Game, side: Side) -> Option<SearchOutcome> {
        let mut task = self.start(game, side)?;
        Some(task.run())
    }
}

// ============================================================================
// SEARCH TASK
// ============================================================================

/// One node on the explicit search stack
#[derive(Debug)]
struct Frame {
    moves: Vec<Move>,
    /// Index of the next child to expand
    next: usize,
    /// Depth left below this node
    remaining: u32,
    /// Side to move at this node
    side: Side,
    maximizing: bool,
    alpha: i32,
    beta: i32,
    best: i32,
    /// `moves[next - 1]` is currently applied on the board
    applied: bool,
}

impl Frame {
    fn new(
        moves: Vec<Move>,
        remaining: u32,
        side: Side,
        maximizing: bool,
        alpha: i32,
        beta: i32,
    ) -> Self {
        Self {
            moves,
            next: 0,
            remaining,
            side,
            maximizing,
            alpha,
            beta,
            best: if maximizing { -INF } else { INF },
            applied: false,
        }
    }

    fn is_done(&self) -> bool {
        self.next >= self.moves.len()
            || self.alpha >= self.beta
            || (self.maximizing && self.best >= WIN_SCORE)
            || (!self.maximizing && self.best <= -WIN_SCORE)
    }
}

/// Result of one finished deepening iteration
#[derive(Clone, Debug)]
struct Iteration {
    depth: u32,
    best: i32,
    ties: Vec<Move>,
}

/// A search in progress
pub struct SearchTask<'g> {
    game: &'g mut Game,
    side: Side,
    weights: EvalWeights,
    target_depth: u32,
    node_budget: u64,
    yield_every: u64,
    rng: ChaCha8Rng,
    /// Root moves in the order the next iteration will try them
    root_moves: Vec<Move>,
    frames: Vec<Frame>,
    /// Root move scores of the iteration in progress
    root_scores: Vec<(Move, i32)>,
    iteration_depth: u32,
    completed: Option<Iteration>,
    leaves: u64,
    base_ply: usize,
    outcome: Option<SearchOutcome>,
}

impl<'g> SearchTask<'g> {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn progress(&self) -> SearchProgress {
        SearchProgress {
            depth: self.iteration_depth,
            leaves: self.leaves,
        }
    }

    /// Advance the search until the next yield point or the decision.
    ///
    /// Once decided, further calls keep returning the same outcome.
    pub fn step(&mut self) -> SearchStatus {
        if let Some(outcome) = self.outcome {
            return SearchStatus::Decided(outcome);
        }

        loop {
            let Some(top) = self.frames.last_mut() else {
                if let Some(outcome) = self.next_iteration() {
                    self.outcome = Some(outcome);
                    return SearchStatus::Decided(outcome);
                }
                continue;
            };

            if top.is_done() {
                let value = top.best;
                self.frames.pop();
                if self.frames.is_empty() {
                    self.complete_iteration();
                } else {
                    self.game.cancel();
                    self.absorb(value);
                }
                continue;
            }

            let mv = top.moves[top.next];
            top.next += 1;
            top.applied = true;
            let child_side = top.side.opponent();
            let child_remaining = top.remaining - 1;
            let (alpha, beta) = (top.alpha, top.beta);

            self.game.apply(mv);

            // Past the budget a node is treated as if depth ran out
            let expand = child_remaining > 0
                && self.leaves < self.node_budget
                && self.game.winner().is_none();
            let child_moves = if expand {
                self.game.legal_moves(child_side)
            } else {
                Vec::new()
            };

            if child_moves.is_empty() {
                let score = evaluate(self.game.board(), self.side, &self.weights);
                self.leaves += 1;
                self.game.cancel();
                self.absorb(score);

                if self.leaves % self.yield_every == 0 {
                    trace!("search yields after {} leaves", self.leaves);
                    return SearchStatus::Thinking(self.progress());
                }
            } else {
                let maximizing = child_side == self.side;
                self.frames.push(Frame::new(
                    child_moves,
                    child_remaining,
                    child_side,
                    maximizing,
                    alpha,
                    beta,
                ));
            }
        }
    }

    /// Step until decided
    pub fn run(&mut self) -> SearchOutcome {
        loop {
            if let SearchStatus::Decided(outcome) = self.step() {
                return outcome;
            }
        }
    }

    /// Fold a child's score into the frame that expanded it
    fn absorb(&mut self, score: i32) {
        let at_root = self.frames.len() == 1;
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        frame.applied = false;

        if frame.maximizing {
            frame.best = frame.best.max(score);
            // One below the best keeps equal root scores exact for tie-breaking
            frame.alpha = if at_root {
                frame.best - 1
            } else {
                frame.alpha.max(frame.best)
            };
        } else {
            frame.best = frame.best.min(score);
            frame.beta = frame.beta.min(frame.best);
        }

        if at_root {
            let mv = frame.moves[frame.next - 1];
            self.root_scores.push((mv, score));
        }
    }

    /// Start the next deepening iteration, or decide if deepening is over
    fn next_iteration(&mut self) -> Option<SearchOutcome> {
        if let Some(done) = &self.completed {
            let finished = done.depth >= self.target_depth
                || done.best >= WIN_SCORE
                || self.leaves >= self.node_budget;
            if finished {
                return Some(self.decide());
            }
        }

        let depth = self.completed.as_ref().map_or(1, |done| done.depth + 1);
        self.iteration_depth = depth;
        self.root_scores.clear();
        self.frames.push(Frame::new(
            self.root_moves.clone(),
            depth,
            self.side,
            true,
            -INF,
            INF,
        ));
        None
    }

    /// Record the root results and reorder root moves best first
    fn complete_iteration(&mut self) {
        let best = self
            .root_scores
            .iter()
            .map(|&(_, score)| score)
            .max()
            .unwrap_or(-INF);
        let ties: Vec<Move> = self
            .root_scores
            .iter()
            .filter(|&&(_, score)| score == best)
            .map(|&(mv, _)| mv)
            .collect();

        let mut scored = self.root_scores.clone();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        let mut order: Vec<Move> = scored.into_iter().map(|(mv, _)| mv).collect();
        for mv in &self.root_moves {
            if !order.contains(mv) {
                order.push(*mv);
            }
        }
        self.root_moves = order;

        debug!(
            "depth {} done: best={} ties={} leaves={}",
            self.iteration_depth,
            best,
            ties.len(),
            self.leaves
        );

        self.completed = Some(Iteration {
            depth: self.iteration_depth,
            best,
            ties,
        });
    }

    /// Pick uniformly among the best moves of the last iteration
    fn decide(&mut self) -> SearchOutcome {
        debug_assert_eq!(self.game.ply(), self.base_ply, "search left moves applied");

        let (depth, best, mv) = match &self.completed {
            Some(done) => {
                let mv = done.ties.choose(&mut self.rng).copied();
                (done.depth, Some(done.best), mv)
            }
            None => (0, None, None),
        };
        let mv = mv.unwrap_or(self.root_moves[0]);

        debug!(
            "{} plays {} (score {:?}, depth {}, {} leaves)",
            self.side, mv, best, depth, self.leaves
        );

        SearchOutcome {
            mv,
            score: best,
            depth,
            leaves: self.leaves,
        }
    }
}

impl Drop for SearchTask<'_> {
    /// Unwind the moves an unfinished search still has applied
    fn drop(&mut self) {
        let pending = self.frames.iter().filter(|frame| frame.applied).count();
        for _ in 0..pending {
            self.game.cancel();
        }
        if pending > 0 {
            trace!("abandoned search, cancelled {} moves", pending);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, CellId};
    use crate::eval::EvalWeights;

    fn cell(label: &str) -> CellId {
        label.parse().unwrap()
    }

    fn game_with(black: &[&str], white: &[&str]) -> Game {
        let mut pieces = Vec::new();
        pieces.extend(black.iter().map(|l| (cell(l).cube(), Side::Black)));
        pieces.extend(white.iter().map(|l| (cell(l).cube(), Side::White)));
        Game::from_board(Board::from_pieces(&pieces).unwrap())
    }

    /// Black can push A3 off and bring White down to 8
    fn winning_position() -> Game {
        game_with(
            &["C3", "B3", "E1", "E2", "D1", "G3", "G4", "F2", "F3"],
            &["A3", "I5", "I6", "I7", "I8", "I9", "H8", "H9", "G9"],
        )
    }

    /// Same armies without the capture
    fn quiet_position() -> Game {
        game_with(
            &["C3", "B3", "E1", "E2", "D1", "G3", "G4", "F2", "F3"],
            &["A5", "I5", "I6", "I7", "I8", "I9", "H8", "H9", "G9"],
        )
    }

    fn unlimited(weights: EvalWeights) -> EngineConfig {
        EngineConfig {
            search: SearchConfig {
                node_budget: u64::MAX,
                ..SearchConfig::fixed_depth(3)
            },
            weights,
        }
    }

    /// Plain minimax over apply/cancel
    fn minimax(game: &mut Game, to_move: Side, me: Side, depth: u32, weights: &EvalWeights) -> i32 {
        if depth == 0 || game.winner().is_some() {
            return evaluate(game.board(), me, weights);
        }
        let moves = game.legal_moves(to_move);
        if moves.is_empty() {
            return evaluate(game.board(), me, weights);
        }

        let scores = moves.into_iter().map(|mv| {
            game.apply(mv);
            let score = minimax(game, to_move.opponent(), me, depth - 1, weights);
            game.cancel();
            score
        });
        let scores: Vec<i32> = scores.collect();
        if to_move == me {
            scores.into_iter().max().unwrap()
        } else {
            scores.into_iter().min().unwrap()
        }
    }

    #[test]
    fn test_alpha_beta_matches_minimax() {
        let config = unlimited(EvalWeights::default());
        let cases: [(fn() -> Game, Side, u32); 5] = [
            (quiet_position, Side::Black, 1),
            (quiet_position, Side::Black, 2),
            (quiet_position, Side::White, 3),
            (winning_position, Side::Black, 3),
            (Game::new, Side::Black, 2),
        ];

        for (setup, side, depth) in cases {
            let mut game = setup();
            let expected = minimax(&mut game, side, side, depth, &config.weights);

            let mut searcher = Searcher::with_seed(&config, 1);
            let outcome = searcher
                .start_at_depth(&mut game, side, depth)
                .unwrap()
                .run();
            assert_eq!(outcome.score, Some(expected), "depth {}", depth);
            assert_eq!(game.ply(), 0);
        }
    }

    #[test]
    fn test_takes_immediate_win() {
        let config = unlimited(EvalWeights::default());
        let mut game = winning_position();
        let capture = game.legal_moves(Side::Black)[0];
        assert!(capture.is_capture());

        let mut searcher = Searcher::with_seed(&config, 3);
        let outcome = searcher.start_at_depth(&mut game, Side::Black, 3).unwrap().run();
        assert_eq!(outcome.mv, capture);
        assert_eq!(outcome.score, Some(WIN_SCORE));
        // The win is found in the first iteration; no deeper search
        assert_eq!(outcome.depth, 1);
    }

    #[test]
    fn test_opening_move_is_random() {
        let config = EngineConfig::default();
        let mut picks = std::collections::HashSet::new();
        for seed in 0..16 {
            let mut game = Game::new();
            let legal = game.legal_moves(Side::Black);
            let mut searcher = Searcher::with_seed(&config, seed);
            let mut task = searcher.start(&mut game, Side::Black).unwrap();
            let SearchStatus::Decided(outcome) = task.step() else {
                panic!("opening move should be decided at once");
            };
            assert_eq!(outcome.score, None);
            assert_eq!(outcome.leaves, 0);
            drop(task);
            assert!(legal.contains(&outcome.mv));
            picks.insert(outcome.mv);
        }
        assert!(picks.len() > 1);
    }

    #[test]
    fn test_ties_broken_randomly_and_reproducibly() {
        let zero = EvalWeights {
            material: 0,
            center: 0,
            advance: 0,
            cover_near: 0,
            cover_far: 0,
            threat: 0,
        };
        let config = unlimited(zero);

        let pick = |seed: u64| {
            let mut game = Game::new();
            let mut searcher = Searcher::with_seed(&config, seed);
            let outcome = searcher.start_at_depth(&mut game, Side::White, 1).unwrap().run();
            outcome
        };

        let picks: std::collections::HashSet<Move> = (0..16).map(|seed| pick(seed).mv).collect();
        assert!(picks.len() > 1);
        assert_eq!(pick(5), pick(5));
    }

    #[test]
    fn test_task_reports_side_and_schedule() {
        let config = unlimited(EvalWeights::default());
        let mut searcher = Searcher::with_seed(&config, 3);
        assert_eq!(searcher.config(), &config.search);
        assert_eq!(searcher.config().depth_for_ply(12), 3);

        let mut game = quiet_position();
        let task = searcher.start_at_depth(&mut game, Side::White, 1).unwrap();
        assert_eq!(task.side(), Side::White);
        assert_eq!(task.progress().leaves, 0);
    }

    #[test]
    fn test_yielding_resumes_to_same_result() {
        let mut config = unlimited(EvalWeights::default());
        config.search.yield_every = 97;

        let mut game = quiet_position();
        let blocking = Searcher::with_seed(&config, 9)
            .start_at_depth(&mut game, Side::Black, 3)
            .unwrap()
            .run();

        let mut searcher = Searcher::with_seed(&config, 9);
        let mut task = searcher.start_at_depth(&mut game, Side::Black, 3).unwrap();
        let mut yields = 0u64;
        let outcome = loop {
            match task.step() {
                SearchStatus::Thinking(progress) => {
                    yields += 1;
                    assert_eq!(progress.leaves % 97, 0);
                    assert!(progress.depth >= 1 && progress.depth <= 3);
                }
                SearchStatus::Decided(outcome) => break outcome,
            }
        };
        assert_eq!(task.step(), SearchStatus::Decided(outcome));
        drop(task);

        assert_eq!(outcome, blocking);
        assert_eq!(yields, outcome.leaves / 97);
        assert_eq!(game.ply(), 0);
    }

    #[test]
    fn test_dropping_suspended_search_restores_board() {
        let mut config = unlimited(EvalWeights::default());
        config.search.yield_every = 10;

        let mut game = quiet_position();
        let before = game.snapshot();
        let mut searcher = Searcher::with_seed(&config, 2);
        {
            let mut task = searcher.start_at_depth(&mut game, Side::White, 3).unwrap();
            for _ in 0..5 {
                assert!(matches!(task.step(), SearchStatus::Thinking(_)));
            }
        }
        assert_eq!(game.ply(), 0);
        assert_eq!(game.snapshot(), before);
    }

    #[test]
    fn test_node_budget_limits_search() {
        let unbounded = unlimited(EvalWeights::default());
        let mut config = unbounded.clone();
        config.search.node_budget = 200;

        let mut game = quiet_position();
        let legal = game.legal_moves(Side::Black);
        let full = Searcher::with_seed(&unbounded, 4)
            .start_at_depth(&mut game, Side::Black, 3)
            .unwrap()
            .run();

        let mut searcher = Searcher::with_seed(&config, 4);
        let outcome = searcher.start_at_depth(&mut game, Side::Black, 3).unwrap().run();

        assert!(legal.contains(&outcome.mv));
        assert!(outcome.score.is_some());
        assert!(outcome.leaves < full.leaves);
        // Past the budget each move left on the stack costs at most one leaf
        assert!(outcome.leaves < 200 + 400);
        assert_eq!(game.ply(), 0);
    }

    #[test]
    fn test_search_move_uses_schedule() {
        let config = EngineConfig {
            search: SearchConfig::fixed_depth(1),
            ..Default::default()
        };
        let mut game = Game::new();
        let mut searcher = Searcher::with_seed(&config, 8);

        // Ply 0 is random, later plies are searched
        let first = searcher.search_move(&mut game, Side::Black).unwrap();
        assert_eq!(first.depth, 0);
        game.apply(first.mv);

        let reply = searcher.search_move(&mut game, Side::White).unwrap();
        assert_eq!(reply.depth, 1);
        assert!(reply.score.is_some());
        assert_eq!(game.ply(), 1);
    }

    #[test]
    fn test_no_moves() {
        let mut game = game_with(&[], &["E5"]);
        let mut searcher = Searcher::new(&EngineConfig::default());
        assert!(searcher.start(&mut game, Side::Black).is_none());
    }
}
