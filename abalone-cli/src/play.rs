//! Play command - human against the engine in the terminal
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_session() - the turn loop
//! - Level 3: human_turn(), engine_turn(), undo_turn()
//! - Level 4: input parsing

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;

use abalone_core::{CellId, Game, SearchOutcome, SearchStatus, Searcher, Selection, Side};

use crate::render::{render_board, render_counts};
use crate::{create_rng, load_config};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Side you play; Black moves first
    #[arg(long, value_enum, default_value = "white")]
    pub human: SideArg,

    /// Engine config JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::White => Side::White,
            SideArg::Black => Side::Black,
        }
    }
}

/// How a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionEnd {
    Won(Side),
    /// The side to move had no legal move
    Stalled(Side),
    Quit,
}

/// One parsed line of human input
#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Move { cells: Vec<CellId>, target: CellId },
    Moves,
    Undo,
    Quit,
}

const HELP: &str = "enter a move as `C3 C4 > C5` (your pieces, then the target cell), \
                    or one of: moves, undo, quit";

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut rng = create_rng(seed);
    let searcher = Searcher::with_seed(&config, rng.gen());
    let human = Side::from(args.human);

    tracing::info!("New game: you play {}, engine plays {}", human, human.opponent());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let end = play_session(Game::new(), searcher, human, stdin.lock(), &mut stdout)?;

    match end {
        SessionEnd::Won(side) if side == human => println!("You win!"),
        SessionEnd::Won(side) => println!("{} wins.", side),
        SessionEnd::Stalled(side) => println!("{} has no legal move. Game over.", side),
        SessionEnd::Quit => println!("Bye."),
    }
    Ok(())
}

// ============================================================================
// LEVEL 2 - TURN LOOP
// ============================================================================

fn play_session<R: BufRead, W: Write>(
    mut game: Game,
    mut searcher: Searcher,
    human: Side,
    mut input: R,
    out: &mut W,
) -> Result<SessionEnd> {
    writeln!(out, "{}", HELP)?;

    loop {
        writeln!(out)?;
        write!(out, "{}", render_board(&game.snapshot(), game.last_action()))?;
        writeln!(out, "{}", render_counts(&game.snapshot()))?;

        if let Some(winner) = game.winner() {
            return Ok(SessionEnd::Won(winner));
        }

        let to_move = side_to_move(&game);
        if to_move != human {
            match engine_turn(&mut searcher, &mut game, to_move)? {
                Some(outcome) => writeln!(out, "{} plays {}", to_move, outcome.mv)?,
                None => return Ok(SessionEnd::Stalled(to_move)),
            }
            continue;
        }

        if game.legal_moves(human).is_empty() {
            return Ok(SessionEnd::Stalled(human));
        }

        // Read until the human makes a move or leaves
        loop {
            write!(out, "{} to move> ", human)?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(SessionEnd::Quit);
            }

            match parse_command(&line) {
                Ok(Command::Quit) => return Ok(SessionEnd::Quit),
                Ok(Command::Moves) => {
                    for mv in game.legal_moves(human) {
                        writeln!(out, "  {}", mv)?;
                    }
                }
                Ok(Command::Undo) => {
                    let undone = undo_turn(&mut game, human);
                    if undone == 0 {
                        writeln!(out, "nothing to undo")?;
                    }
                    break;
                }
                Ok(Command::Move { cells, target }) => {
                    match human_turn(&mut game, human, &cells, target) {
                        Ok(()) => break,
                        Err(e) => writeln!(out, "{:#}", e)?,
                    }
                }
                Err(e) => {
                    writeln!(out, "{:#}", e)?;
                    writeln!(out, "{}", HELP)?;
                }
            }
        }
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Build the human's move from the picked cells and apply it
fn human_turn(game: &mut Game, human: Side, cells: &[CellId], target: CellId) -> Result<()> {
    let selection = Selection::from_cells(game.board(), human, cells)?;
    let mv = selection
        .build_move(game, target)
        .with_context(|| format!("cannot play {}", target))?;
    game.apply(mv);
    Ok(())
}

/// Search with a spinner that ticks on every yield
fn engine_turn(
    searcher: &mut Searcher,
    game: &mut Game,
    side: Side,
) -> Result<Option<SearchOutcome>> {
    let target = searcher.config().depth_for_ply(game.ply());
    let outcome = {
        let Some(mut task) = searcher.start(game, side) else {
            return Ok(None);
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
        spinner.set_message(format!("{} is thinking", task.side()));

        let outcome = loop {
            match task.step() {
                SearchStatus::Thinking(progress) => {
                    spinner.set_message(format!(
                        "{} is thinking (depth {}/{}, {} positions)",
                        task.side(),
                        progress.depth,
                        target,
                        progress.leaves
                    ));
                    spinner.tick();
                }
                SearchStatus::Decided(outcome) => break outcome,
            }
        };
        spinner.finish_and_clear();
        outcome
    };

    tracing::debug!(
        "engine move {} score={:?} depth={} leaves={}",
        outcome.mv,
        outcome.score,
        outcome.depth,
        outcome.leaves
    );
    game.apply(outcome.mv);
    Ok(Some(outcome))
}

/// Take back moves until it is the human's turn again, returning how many
/// were cancelled
fn undo_turn(game: &mut Game, human: Side) -> usize {
    let mut undone = 0;
    while game.ply() > 0 {
        game.cancel();
        undone += 1;
        if side_to_move(game) == human {
            break;
        }
    }
    undone
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Black moves on even plies
fn side_to_move(game: &Game) -> Side {
    if game.ply() % 2 == 0 {
        Side::Black
    } else {
        Side::White
    }
}

fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => bail!("empty input"),
        "quit" | "q" | "exit" => return Ok(Command::Quit),
        "moves" | "m" => return Ok(Command::Moves),
        "undo" | "u" => return Ok(Command::Undo),
        _ => {}
    }

    let Some((picked, target)) = line.split_once('>') else {
        bail!("missing `>` before the target cell");
    };

    let cells = picked
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|label| label.parse::<CellId>())
        .collect::<Result<Vec<_>, _>>()?;
    if cells.is_empty() {
        bail!("no pieces selected");
    }

    let target = target
        .trim()
        .parse::<CellId>()
        .context("invalid target cell")?;

    Ok(Command::Move { cells, target })
}

// ============================================================================
// TESTS
// ============================================================================
