//! Match command - the engine plays itself
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_match(), report_results()
//! - Level 3: play_single_game(), compute_match_statistics()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use abalone_core::{EngineConfig, Game, Searcher, Side};

use crate::{create_rng, load_config};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct MatchArgs {
    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Plies after which a game is scored as a draw
    #[arg(long, default_value = "200")]
    pub max_plies: usize,

    /// Play games in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Engine config JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GameResult {
    BlackWins,
    WhiteWins,
    /// Ply limit reached or the side to move was stuck
    Draw,
}

/// Result of a single game
#[derive(Clone, Debug, PartialEq, Eq)]
struct GameRecord {
    game_number: usize,
    seed: u64,
    result: GameResult,
    plies: usize,
    black_pieces: usize,
    white_pieces: usize,
    /// Leaf evaluations over all searches of the game
    leaves: u64,
}

/// Aggregated match results
#[derive(Clone, Debug)]
struct MatchResults {
    games: Vec<GameRecord>,
    black_wins: usize,
    white_wins: usize,
    draws: usize,
    avg_plies: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
///
/// 1. Load the engine config
/// 2. Play the match (multiple games)
/// 3. Report results
pub fn run(args: MatchArgs, seed: Option<u64>) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    tracing::info!(
        "Starting match: {} games, max {} plies{}",
        args.games,
        args.max_plies,
        if args.parallel { ", parallel" } else { "" }
    );

    let results = play_match(&config, &args, seed)?;

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Play all games in the match
fn play_match(config: &EngineConfig, args: &MatchArgs, seed: Option<u64>) -> Result<MatchResults> {
    let base_seed: u64 = create_rng(seed).gen();

    let progress = ProgressBar::new(args.games as u64);
    progress.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} games ({elapsed})",
    )?);

    let play = |index: usize| {
        let record = play_single_game(
            config,
            index + 1,
            args.max_plies,
            base_seed.wrapping_add(index as u64),
        );
        tracing::info!(
            "Game {}: {:?} ({} plies, {} vs {} pieces)",
            record.game_number,
            record.result,
            record.plies,
            record.black_pieces,
            record.white_pieces
        );
        progress.inc(1);
        record
    };

    let games: Vec<GameRecord> = if args.parallel {
        (0..args.games).into_par_iter().map(play).collect()
    } else {
        (0..args.games).map(play).collect()
    };
    progress.finish_and_clear();

    Ok(compute_match_statistics(games))
}

/// Report match results
fn report_results(results: &MatchResults, args: &MatchArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game from the standard opening, one searcher per side
fn play_single_game(
    config: &EngineConfig,
    game_number: usize,
    max_plies: usize,
    seed: u64,
) -> GameRecord {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut players = Side::BOTH.map(|_| Searcher::with_seed(config, rng.gen()));
    let mut game = Game::new();
    let mut side = Side::Black;
    let mut leaves = 0;

    while game.winner().is_none() && game.ply() < max_plies {
        let Some(outcome) = players[side.index()].search_move(&mut game, side) else {
            tracing::debug!("game {}: {} has no legal move", game_number, side);
            break;
        };
        leaves += outcome.leaves;
        game.apply(outcome.mv);
        side = side.opponent();
    }

    let result = match game.winner() {
        Some(Side::Black) => GameResult::BlackWins,
        Some(Side::White) => GameResult::WhiteWins,
        None => GameResult::Draw,
    };

    GameRecord {
        game_number,
        seed,
        result,
        plies: game.ply(),
        black_pieces: game.remaining_count(Side::Black),
        white_pieces: game.remaining_count(Side::White),
        leaves,
    }
}

/// Compute aggregate statistics from game records
fn compute_match_statistics(games: Vec<GameRecord>) -> MatchResults {
    let count = |result: GameResult| games.iter().filter(|g| g.result == result).count();
    let black_wins = count(GameResult::BlackWins);
    let white_wins = count(GameResult::WhiteWins);
    let draws = count(GameResult::Draw);

    let total_plies: usize = games.iter().map(|g| g.plies).sum();
    let avg_plies = if games.is_empty() {
        0.0
    } else {
        total_plies as f32 / games.len() as f32
    };

    MatchResults {
        games,
        black_wins,
        white_wins,
        draws,
        avg_plies,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn rate(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32
    } else {
        0.0
    }
}

/// Print results as JSON
fn print_json_results(results: &MatchResults) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        seed: u64,
        result: String,
        plies: usize,
        black_pieces: usize,
        white_pieces: usize,
        leaves: u64,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        black_wins: usize,
        white_wins: usize,
        draws: usize,
        avg_plies: f32,
        black_win_rate: f32,
        games: Vec<JsonGame>,
    }

    let total = results.games.len();
    let output = JsonOutput {
        total_games: total,
        black_wins: results.black_wins,
        white_wins: results.white_wins,
        draws: results.draws,
        avg_plies: results.avg_plies,
        black_win_rate: rate(results.black_wins, total),
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                seed: g.seed,
                result: format!("{:?}", g.result),
                plies: g.plies,
                black_pieces: g.black_pieces,
                white_pieces: g.white_pieces,
                leaves: g.leaves,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &MatchResults) {
    let total = results.games.len();

    println!("\n=== Match Results ===");
    println!("Total games: {}", total);
    println!(
        "Black wins:  {} ({:.1}%)",
        results.black_wins,
        rate(results.black_wins, total) * 100.0
    );
    println!(
        "White wins:  {} ({:.1}%)",
        results.white_wins,
        rate(results.white_wins, total) * 100.0
    );
    println!(
        "Draws:       {} ({:.1}%)",
        results.draws,
        rate(results.draws, total) * 100.0
    );
    println!("Avg plies:   {:.1}", results.avg_plies);

    println!("\nGame details:");
    for game in &results.games {
        println!(
            "  Game {}: {:?} in {} plies ({} vs {} pieces, seed {})",
            game.game_number,
            game.result,
            game.plies,
            game.black_pieces,
            game.white_pieces,
            game.seed
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
