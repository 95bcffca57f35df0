//! A game tree search engine for playing or analysing the board game 'Connect 4'
//!
//! The main engine is a depth-limited alpha-beta search over a bitboard
//! position, guided by a hand-crafted evaluation, with a transposition table,
//! killer moves and tactical move ordering. A Monte-Carlo tree search engine
//! implements the same [`Engine`] interface for comparison play.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_ai::{solver::{Solver, SolverConfig}, BitBoard};
//!
//!# fn main() -> connect4_ai::Result<()> {
//! let mut solver = Solver::new(SolverConfig::default())?;
//! // player one has three in the first column
//! let result = solver.search(&BitBoard::from_moves("121212")?, 4)?;
//!
//! assert_eq!(result.column, 0);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod bitboard;

pub mod arrayboard;

pub mod evaluation;

pub mod move_order;

pub mod transposition_table;

pub mod killer;

pub mod solver;

pub mod depth;

pub mod mcts;

pub mod engine;

pub mod session;

mod test;

pub use bitboard::{BitBoard, Player};
pub use engine::{Engine, EngineKind, SearchResult, SearchStats};
pub use error::{Error, Result};
pub use session::{GameState, Match};

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
