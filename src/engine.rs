//! The capability shared by every search strategy

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    mcts::{Mcts, MctsConfig, TranspositionMcts},
    solver::{Solver, SolverConfig},
    BitBoard, Result, WIDTH,
};

/// Counters collected during one `best_move` call
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchStats {
    /// positions visited (alpha-beta) or tree nodes created (MCTS)
    pub nodes: u64,
    /// beta cutoffs, i.e. pruned sibling branches
    pub cutoffs: u64,
    pub tt_hits: u64,
    pub depth: u32,
    pub iterations: u64,
    /// visits of each root child (MCTS only)
    pub root_visits: [u32; WIDTH],
    pub elapsed: Duration,
}

/// A chosen move plus everything a front end may want to display about it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
    pub column: usize,
    /// minimax score of the move, or its mean reward in thousandths for MCTS
    pub score: i32,
    /// score of every legal root move, `None` for full columns
    pub column_scores: [Option<i32>; WIDTH],
    pub stats: SearchStats,
}

/// A strategy that picks moves for the side to move
///
/// Implementations keep whatever caches they need between calls; those caches
/// belong to one game and are dropped by `new_game`.
pub trait Engine: Send {
    fn name(&self) -> &'static str;

    /// Searches `board` for the side to move. `depth` is in plies and ignored
    /// by engines with their own budget.
    fn best_move(&mut self, board: &BitBoard, depth: u32) -> Result<SearchResult>;

    fn new_game(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum EngineKind {
    /// bitboard alpha-beta with transposition table, killers and move ordering
    AlphaBeta,
    /// plain alpha-beta in column order, no tables
    Classic,
    /// Monte-Carlo tree search
    Mcts,
    /// Monte-Carlo search sharing statistics between transposed positions
    MctsTransposition,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::AlphaBeta => "alpha-beta",
            EngineKind::Classic => "classic",
            EngineKind::Mcts => "mcts",
            EngineKind::MctsTransposition => "mcts-transposition",
        };
        f.write_str(name)
    }
}

/// Everything needed to build an engine for one game
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub solver: SolverConfig,
    pub mcts: MctsConfig,
}

impl Default for EngineKind {
    fn default() -> Self {
        EngineKind::AlphaBeta
    }
}

impl EngineConfig {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Builds a fresh engine, with its own tables, after validating the configuration
    pub fn build(&self) -> Result<Box<dyn Engine>> {
        Ok(match self.kind {
            EngineKind::AlphaBeta => Box::new(Solver::new(self.solver.clone())?),
            EngineKind::Classic => Box::new(Solver::new(SolverConfig::classic())?),
            EngineKind::Mcts => Box::new(Mcts::new(self.mcts.clone())?),
            EngineKind::MctsTransposition => {
                Box::new(TranspositionMcts::new(self.mcts.clone())?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_plays_a_legal_move() -> Result<()> {
        let board = BitBoard::from_moves("444444")?;
        for &kind in &[
            EngineKind::AlphaBeta,
            EngineKind::Classic,
            EngineKind::Mcts,
            EngineKind::MctsTransposition,
        ] {
            let mut config = EngineConfig::new(kind);
            config.mcts.iterations = 500;
            config.mcts.seed = Some(7);
            let mut engine = config.build()?;
            let result = engine.best_move(&board, 3)?;
            assert!(board.playable(result.column), "{} played {}", kind, result.column);
            assert_eq!(result.column_scores[3], None);
        }
        Ok(())
    }
}
