use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use serde::Serialize;

use std::io::{stdin, stdout, Write};
use std::time::Duration;

use connect4_ai::{
    arrayboard::ArrayBoard,
    depth::{DepthConfig, DepthController},
    engine::EngineConfig,
    evaluation::{WIN_SCORE, WIN_THRESHOLD},
    session::{play_game, GameRecord},
    BitBoard, EngineKind, Error, GameState, Match, Player, SearchResult, WIDTH,
};

#[derive(Parser)]
#[command(name = "connect4", version, about = "Play and analyse Connect 4 against a game tree search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a game against the engine in the terminal
    Play {
        #[arg(long, value_enum, default_value_t = EngineKind::AlphaBeta)]
        engine: EngineKind,
        /// search depth in plies
        #[arg(long, default_value_t = 8)]
        depth: u32,
        /// adapt the depth to the time each move takes
        #[arg(long)]
        dynamic_depth: bool,
        /// thinking time per move the dynamic depth aims for, in seconds
        #[arg(long, default_value_t = 2.0)]
        target_seconds: f64,
        /// let the engine make the first move
        #[arg(long)]
        engine_first: bool,
        /// show the score of every column after each engine move
        #[arg(long)]
        scores: bool,
        #[arg(long, default_value_t = 8000)]
        iterations: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the best move and per-column scores of a position
    Analyze {
        /// moves played so far as 1-indexed columns, e.g. 4453
        #[arg(default_value = "")]
        moves: String,
        #[arg(long, value_enum, default_value_t = EngineKind::AlphaBeta)]
        engine: EngineKind,
        #[arg(long, default_value_t = 8)]
        depth: u32,
        #[arg(long, default_value_t = 8000)]
        iterations: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Play engines against each other, alternating who moves first
    Compare {
        #[arg(long, value_enum, default_value_t = EngineKind::AlphaBeta)]
        first: EngineKind,
        #[arg(long, value_enum, default_value_t = EngineKind::Mcts)]
        second: EngineKind,
        #[arg(long, default_value_t = 10)]
        games: usize,
        #[arg(long, default_value_t = 6)]
        depth: u32,
        #[arg(long, default_value_t = 2000)]
        iterations: u32,
        /// base seed for the MCTS engines, game `n` uses `seed + n`
        #[arg(long)]
        seed: Option<u64>,
        /// transposition table buckets per alpha-beta engine, each game builds two
        #[arg(long, default_value_t = COMPARE_TABLE_CAPACITY)]
        table_capacity: usize,
        /// print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Table size for comparison games, which run in parallel on every worker
const COMPARE_TABLE_CAPACITY: usize = (1 << 16) - 15;

fn engine_config(kind: EngineKind, iterations: u32, seed: Option<u64>) -> EngineConfig {
    let mut config = EngineConfig::new(kind);
    config.mcts.iterations = iterations;
    config.mcts.seed = seed;
    config
}

fn is_mcts(kind: EngineKind) -> bool {
    matches!(kind, EngineKind::Mcts | EngineKind::MctsTransposition)
}

/// Human readable score of a root move
fn describe_score(kind: EngineKind, board: &BitBoard, result: &SearchResult, column: usize) -> String {
    let score = match result.column_scores[column] {
        Some(score) => score,
        None => return "full".to_string(),
    };
    if is_mcts(kind) {
        return format!(
            "{:5.1}% from {} visits",
            score as f64 / 10.0,
            result.stats.root_visits[column]
        );
    }
    // plies until the end of the game, counted from the current position
    let distance = (WIN_SCORE - score.abs()) as usize - board.num_moves();
    if score >= WIN_THRESHOLD {
        format!("win in {}", distance)
    } else if score <= -WIN_THRESHOLD {
        format!("loss in {}", distance)
    } else {
        let bar = "#".repeat((score.abs() / 20).min(40) as usize);
        format!("{:6} {}{}", score, if score < 0 { "-" } else { "+" }, bar)
    }
}

fn print_scores(kind: EngineKind, board: &BitBoard, result: &SearchResult) {
    for column in 0..WIDTH {
        let marker = if column == result.column { ">" } else { " " };
        println!(
            "{} {}: {}",
            marker,
            column + 1,
            describe_score(kind, board, result, column)
        );
    }
    println!(
        "{} positions, {} cutoffs, {} table hits, depth {}, {:.3}s",
        result.stats.nodes,
        result.stats.cutoffs,
        result.stats.tt_hits,
        result.stats.depth,
        result.stats.elapsed.as_secs_f64()
    );
}

fn play(
    engine: EngineKind,
    depth: u32,
    dynamic_depth: bool,
    target_seconds: f64,
    engine_first: bool,
    scores: bool,
    iterations: u32,
    seed: Option<u64>,
) -> Result<()> {
    let depth_config = DepthConfig {
        min_depth: depth.min(DepthConfig::default().min_depth),
        max_depth: depth.max(DepthConfig::default().max_depth),
        default_depth: depth,
        target_seconds,
        ..DepthConfig::default()
    };
    let engine_player = if engine_first { Player::One } else { Player::Two };
    let mut game = Match::new(
        engine_config(engine, iterations, seed).build()?,
        DepthController::new(depth_config)?,
        dynamic_depth,
        Player::One,
    );

    let stdin = stdin();
    println!("Welcome to Connect 4, playing against {}\n", game.engine_name());

    // game loop
    loop {
        ArrayBoard::from(game.board()).display()?;

        match game.state() {
            GameState::InProgress => {
                if game.board().to_move() == engine_player {
                    println!("AI is thinking at depth {}...", game.depth());
                    stdout().flush()?;

                    let board = *game.board();
                    let (result, _) = game.play_engine()?;
                    if scores {
                        print_scores(engine, &board, &result);
                    }
                    println!("Best move: {}", result.column + 1);
                } else {
                    print!("Move input > ");
                    stdout().flush()?;
                    let mut input_str = String::new();
                    if stdin.read_line(&mut input_str)? == 0 {
                        // end of input
                        return Ok(());
                    }

                    let column = match input_str.trim().parse::<usize>() {
                        Ok(column @ 1..=WIDTH) => column - 1,
                        _ => {
                            println!("Invalid column: {}", input_str.trim());
                            continue;
                        }
                    };
                    if let Err(err) = game.play_human(column) {
                        match (&err, err.column()) {
                            (Error::ColumnFull { .. }, Some(full)) => {
                                println!("Column {} is full", full + 1)
                            }
                            _ => println!("{}", err),
                        }
                        // try the move again
                        continue;
                    }
                }
            }

            // end states
            GameState::Won(player) => {
                println!("{} wins!", player);
                break;
            }
            GameState::Draw => {
                println!("Draw!");
                break;
            }
        }
    }
    Ok(())
}

fn analyze(
    moves: &str,
    engine: EngineKind,
    depth: u32,
    iterations: u32,
    seed: Option<u64>,
) -> Result<()> {
    let board = BitBoard::from_moves(moves)?;
    ArrayBoard::from(&board).display()?;
    if GameState::of(&board).is_over() {
        bail!("the game is already over: {:?}", GameState::of(&board));
    }

    let mut engine_instance = engine_config(engine, iterations, seed).build()?;
    let result = engine_instance.best_move(&board, depth)?;
    println!("{} to move, best move: {}", board.to_move(), result.column + 1);
    print_scores(engine, &board, &result);
    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct EngineSummary {
    engine: String,
    wins: u32,
    moves: u32,
    mean_move_ms: f64,
    mean_nodes: f64,
}

#[derive(Debug, Serialize)]
struct CompareReport {
    games: usize,
    depth: u32,
    draws: u32,
    engines: [EngineSummary; 2],
}

/// Seed of game `game`, wrapping at the top of the range
fn game_seed(seed: Option<u64>, game: usize) -> Option<u64> {
    seed.map(|seed| seed.wrapping_add(game as u64))
}

fn compare_config(
    kind: EngineKind,
    iterations: u32,
    seed: Option<u64>,
    table_capacity: usize,
) -> EngineConfig {
    let mut config = engine_config(kind, iterations, seed);
    config.solver.table_capacity = table_capacity;
    config
}

fn compare(
    kinds: [EngineKind; 2],
    games: usize,
    depth: u32,
    iterations: u32,
    seed: Option<u64>,
    table_capacity: usize,
    json: bool,
) -> Result<()> {
    let bar = ProgressBar::new(games as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} games ({eta})")
            .progress_chars("=> "),
    );

    // every game owns its engines, nothing is shared between games
    let records = (0..games)
        .into_par_iter()
        .map(|game| -> Result<(usize, GameRecord)> {
            let seed = game_seed(seed, game);
            // odd games swap colours
            let (first, second) = if game % 2 == 0 {
                (kinds[0], kinds[1])
            } else {
                (kinds[1], kinds[0])
            };
            let mut first = compare_config(first, iterations, seed, table_capacity).build()?;
            let mut second = compare_config(second, iterations, seed, table_capacity).build()?;
            let record = play_game(first.as_mut(), second.as_mut(), depth)?;
            bar.inc(1);
            Ok((game, record))
        })
        .collect::<Result<Vec<_>>>()?;
    bar.finish_and_clear();

    let mut engines = [
        EngineSummary {
            engine: kinds[0].to_string(),
            ..EngineSummary::default()
        },
        EngineSummary {
            engine: kinds[1].to_string(),
            ..EngineSummary::default()
        },
    ];
    let mut draws = 0;
    let mut thinking = [Duration::default(); 2];
    let mut nodes = [0u64; 2];

    for (game, record) in records.iter() {
        // slot of the engine playing each colour
        let slot = |player: Player| (player.index() + game % 2) % 2;
        match record.outcome {
            GameState::Won(player) => engines[slot(player)].wins += 1,
            _ => draws += 1,
        }
        for &player in &[Player::One, Player::Two] {
            let side = &record.players[player.index()];
            engines[slot(player)].moves += side.moves;
            thinking[slot(player)] += side.thinking;
            nodes[slot(player)] += side.nodes;
        }
    }
    for (i, summary) in engines.iter_mut().enumerate() {
        if summary.moves > 0 {
            summary.mean_move_ms = thinking[i].as_secs_f64() * 1000.0 / summary.moves as f64;
            summary.mean_nodes = nodes[i] as f64 / summary.moves as f64;
        }
    }

    let report = CompareReport {
        games,
        depth,
        draws,
        engines,
    };
    info!("compared {} and {} over {} games", kinds[0], kinds[1], games);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} games at depth {}, {} draws", report.games, report.depth, report.draws);
        for summary in report.engines.iter() {
            println!(
                "{:>20}: {} wins, {:.3}ms per move, {:.0} nodes per move",
                summary.engine, summary.wins, summary.mean_move_ms, summary.mean_nodes
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Play {
            engine,
            depth,
            dynamic_depth,
            target_seconds,
            engine_first,
            scores,
            iterations,
            seed,
        } => play(
            engine,
            depth,
            dynamic_depth,
            target_seconds,
            engine_first,
            scores,
            iterations,
            seed,
        ),
        Command::Analyze {
            moves,
            engine,
            depth,
            iterations,
            seed,
        } => analyze(&moves, engine, depth, iterations, seed),
        Command::Compare {
            first,
            second,
            games,
            depth,
            iterations,
            seed,
            table_capacity,
            json,
        } => compare(
            [first, second],
            games,
            depth,
            iterations,
            seed,
            table_capacity,
            json,
        ),
    }
}
