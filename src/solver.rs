//! Depth-limited alpha-beta search for Connect 4
//!
//! Scores always come from the point of view of the player to move at the
//! root of the search, so the search alternates between maximizing and
//! minimizing plies instead of negating scores.

use std::time::Instant;

use log::{debug, trace};

use crate::{
    engine::{Engine, SearchResult, SearchStats},
    evaluation::{evaluate, WIN_SCORE},
    killer::KillerTable,
    move_order::{order_moves, MoveSorter},
    transposition_table::{Bound, TranspositionTable, DEFAULT_CAPACITY},
    BitBoard, Error, Player, Result, WIDTH,
};

/// Larger than any score the evaluation can produce
pub const INFINITY: i32 = 2 * WIN_SCORE;

// scores depend on the searching player, so entries for both players are kept apart
const PERSPECTIVE_BIT: u64 = 1 << 62;

/// Which optimisations a `Solver` uses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    pub transposition_table: bool,
    pub move_ordering: bool,
    pub killer_moves: bool,
    /// number of transposition table buckets
    pub table_capacity: usize,
}

impl SolverConfig {
    /// Plain alpha-beta over columns in ascending order
    pub fn classic() -> Self {
        Self {
            transposition_table: false,
            move_ordering: false,
            killer_moves: false,
            table_capacity: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.transposition_table && self.table_capacity == 0 {
            return Err(Error::InvalidConfig(
                "transposition table capacity must be positive".into(),
            ));
        }
        if self.killer_moves && !self.move_ordering {
            return Err(Error::InvalidConfig(
                "killer moves require move ordering".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            transposition_table: true,
            move_ordering: true,
            killer_moves: true,
            table_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// An alpha-beta agent with a transposition table and killer moves
///
/// # Notes
/// The transposition table lives as long as the `Solver` and is reused across
/// the moves of one game, `new_game` empties it. Killer moves only carry
/// information within one search and are reset each time `search` is called.
///
/// Every root move is searched with a full window, so the per-column scores in
/// the result are exact minimax values at the requested depth.
pub struct Solver {
    config: SolverConfig,
    transposition_table: Option<TranspositionTable>,
    killers: KillerTable,
    perspective: Player,
    stats: SearchStats,
}

impl Solver {
    /// Creates a new `Solver`, allocating its transposition table up front
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let transposition_table = if config.transposition_table {
            Some(TranspositionTable::with_capacity(config.table_capacity))
        } else {
            None
        };
        Ok(Self {
            config,
            transposition_table,
            killers: KillerTable::new(),
            perspective: Player::One,
            stats: SearchStats::default(),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Counters of the most recent search
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn transposition_table(&self) -> Option<&TranspositionTable> {
        self.transposition_table.as_ref()
    }

    fn table_key(&self, board: &BitBoard) -> u64 {
        match self.perspective {
            Player::One => board.key(),
            Player::Two => board.key() | PERSPECTIVE_BIT,
        }
    }

    fn ordered_moves(&self, board: &BitBoard, depth: u32) -> MoveSorter {
        if self.config.move_ordering {
            let killers = if self.config.killer_moves {
                Some(&self.killers)
            } else {
                None
            };
            order_moves(board, depth, killers)
        } else {
            // equal scores come out in ascending column order
            let mut moves = MoveSorter::new();
            for column in (0..WIDTH).rev().filter(|&column| board.playable(column)) {
                moves.push(column, 0);
            }
            moves
        }
    }

    fn store(&mut self, key: u64, score: i32, depth: u32, bound: Bound) {
        if let Some(table) = &mut self.transposition_table {
            table.set(key, score, depth, bound);
        }
    }

    /// Searches `board` to `depth` plies, returning a fail-soft score for the root player
    fn alpha_beta(
        &mut self,
        board: &BitBoard,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
    ) -> i32 {
        self.stats.nodes += 1;

        let key = self.table_key(board);
        if let Some(table) = &self.transposition_table {
            if let Some((score, bound)) = table.get(key, depth) {
                self.stats.tt_hits += 1;
                match bound {
                    Bound::Exact => return score,
                    Bound::Lower => alpha = alpha.max(score),
                    Bound::Upper => beta = beta.min(score),
                }
                if alpha >= beta {
                    return score;
                }
            }
        }

        if depth == 0 || board.is_terminal() {
            let score = evaluate(board, self.perspective);
            self.store(key, score, depth, Bound::Exact);
            return score;
        }

        // the window actually searched decides which bound the result is
        let (window_alpha, window_beta) = (alpha, beta);
        let mut best = if maximizing { -INFINITY } else { INFINITY };

        for column in self.ordered_moves(board, depth) {
            let mut next = *board;
            next.play(column);
            let score = self.alpha_beta(&next, depth - 1, alpha, beta, !maximizing);

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if alpha >= beta {
                self.stats.cutoffs += 1;
                if self.config.killer_moves {
                    self.killers.record(depth, column);
                }
                break;
            }
        }

        let bound = if best <= window_alpha {
            Bound::Upper
        } else if best >= window_beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.store(key, best, depth, bound);
        best
    }

    /// Finds the best move for the side to move, searching `depth` plies
    ///
    /// A depth of zero is treated as one, a move always needs to be looked at.
    /// Among equally scored moves the lowest column wins.
    pub fn search(&mut self, board: &BitBoard, depth: u32) -> Result<SearchResult> {
        if board.winner().is_some() {
            return Err(Error::GameOver);
        }
        if board.is_full() {
            return Err(Error::NoLegalMoves);
        }

        let depth = depth.max(1);
        let start = Instant::now();
        self.perspective = board.to_move();
        self.stats = SearchStats {
            depth,
            nodes: 1,
            ..SearchStats::default()
        };
        self.killers.clear();

        let mut column_scores = [None; WIDTH];
        let mut best: Option<(usize, i32)> = None;
        for column in self.ordered_moves(board, depth) {
            let mut next = *board;
            next.play(column);
            let score = self.alpha_beta(&next, depth - 1, -INFINITY, INFINITY, false);
            trace!("column {}: {}", column, score);
            column_scores[column] = Some(score);

            best = match best {
                Some((best_column, best_score))
                    if best_score > score || (best_score == score && best_column < column) =>
                {
                    Some((best_column, best_score))
                }
                _ => Some((column, score)),
            };
        }

        // the board is neither won nor full, so some column was playable
        let (column, score) = best.ok_or(Error::NoLegalMoves)?;
        self.stats.elapsed = start.elapsed();
        debug!(
            "depth {}: column {} scores {} after {} nodes ({} cutoffs, {} table hits) in {:?}",
            depth,
            column,
            score,
            self.stats.nodes,
            self.stats.cutoffs,
            self.stats.tt_hits,
            self.stats.elapsed
        );

        Ok(SearchResult {
            column,
            score,
            column_scores,
            stats: self.stats.clone(),
        })
    }

    /// Drops everything learned about previous positions
    pub fn reset(&mut self) {
        if let Some(table) = &mut self.transposition_table {
            table.clear();
        }
        self.killers.clear();
        self.stats = SearchStats::default();
    }
}

impl Engine for Solver {
    fn name(&self) -> &'static str {
        if self.config == SolverConfig::classic() {
            "classic"
        } else {
            "alpha-beta"
        }
    }

    fn best_move(&mut self, board: &BitBoard, depth: u32) -> Result<SearchResult> {
        self.search(board, depth)
    }

    fn new_game(&mut self) {
        self.reset();
    }
}

/// Exhaustive minimax without pruning or caching, scored for `perspective`
///
/// Exponential in `depth`; this is the reference the pruned search must agree with.
pub fn minimax(board: &BitBoard, depth: u32, perspective: Player) -> i32 {
    if depth == 0 || board.is_terminal() {
        return evaluate(board, perspective);
    }
    let scores = board.legal_moves().map(|column| {
        let mut next = *board;
        next.play(column);
        minimax(&next, depth - 1, perspective)
    });
    if board.to_move() == perspective {
        scores.max().unwrap_or(0)
    } else {
        scores.min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::WIN_THRESHOLD;

    const POSITIONS: [&str; 6] = ["", "4", "4453", "1234567", "22334", "4444335"];

    fn small_config() -> SolverConfig {
        SolverConfig {
            table_capacity: 1 << 12,
            ..SolverConfig::default()
        }
    }

    #[test]
    fn agrees_with_minimax() -> Result<()> {
        for moves in POSITIONS.iter() {
            let board = BitBoard::from_moves(moves)?;
            for depth in 1..=4 {
                let mut solver = Solver::new(small_config())?;
                let result = solver.search(&board, depth)?;

                let mut expected = [None; WIDTH];
                for column in board.legal_moves() {
                    let next = board.apply(column)?;
                    expected[column] = Some(minimax(&next, depth - 1, board.to_move()));
                }
                assert_eq!(result.column_scores, expected, "{:?} at depth {}", moves, depth);

                let best = expected.iter().flatten().max().copied();
                assert_eq!(Some(result.score), best);
                let first_best = expected.iter().position(|&score| score == best);
                assert_eq!(Some(result.column), first_best);
            }
        }
        Ok(())
    }

    #[test]
    fn ordering_and_tables_do_not_change_the_result() -> Result<()> {
        for moves in POSITIONS.iter() {
            let board = BitBoard::from_moves(moves)?;
            let mut full = Solver::new(small_config())?;
            let mut classic = Solver::new(SolverConfig::classic())?;
            let mut unordered = Solver::new(SolverConfig {
                move_ordering: false,
                killer_moves: false,
                ..small_config()
            })?;

            let expected = classic.search(&board, 5)?;
            for result in vec![full.search(&board, 5)?, unordered.search(&board, 5)?] {
                assert_eq!(result.column, expected.column);
                assert_eq!(result.score, expected.score);
                assert_eq!(result.column_scores, expected.column_scores);
            }
        }
        Ok(())
    }

    #[test]
    fn pruning_visits_fewer_nodes() -> Result<()> {
        let board = BitBoard::from_moves("4453")?;
        let mut full = Solver::new(small_config())?;
        let mut classic = Solver::new(SolverConfig::classic())?;
        let full_nodes = full.search(&board, 6)?.stats.nodes;
        let classic_result = classic.search(&board, 6)?;
        assert!(full_nodes < classic_result.stats.nodes);
        assert!(classic_result.stats.cutoffs > 0);
        assert_eq!(classic_result.stats.tt_hits, 0);
        Ok(())
    }

    #[test]
    fn plays_centre_on_empty_board() -> Result<()> {
        let mut solver = Solver::new(small_config())?;
        assert_eq!(solver.search(&BitBoard::new(), 1)?.column, 3);
        Ok(())
    }

    #[test]
    fn takes_immediate_win() -> Result<()> {
        // player one has three stacked in the first column
        let board = BitBoard::from_moves("121212")?;
        for depth in 1..=5 {
            let mut solver = Solver::new(small_config())?;
            let result = solver.search(&board, depth)?;
            assert_eq!(result.column, 0);
            assert!(result.score >= WIN_THRESHOLD);
        }
        Ok(())
    }

    #[test]
    fn blocks_immediate_threat() -> Result<()> {
        // player one threatens to complete the first column, player two to move
        let board = BitBoard::from_moves("12121")?;
        for depth in 2..=5 {
            let mut solver = Solver::new(small_config())?;
            let result = solver.search(&board, depth)?;
            assert_eq!(result.column, 0, "depth {}", depth);
            assert!(result.column_scores[3].map_or(false, |score| score <= -WIN_THRESHOLD));
        }
        Ok(())
    }

    #[test]
    fn table_survives_between_moves() -> Result<()> {
        let mut solver = Solver::new(SolverConfig {
            table_capacity: 1 << 16,
            ..SolverConfig::default()
        })?;
        let board = BitBoard::from_moves("44")?;
        solver.search(&board, 5)?;
        assert!(solver.transposition_table().map_or(false, |table| !table.is_empty()));

        // a search of the same position is answered from the table at the root children
        let again = solver.search(&board, 5)?;
        assert!(again.stats.nodes <= 1 + WIDTH as u64);

        solver.new_game();
        assert!(solver.transposition_table().map_or(false, |table| table.is_empty()));
        Ok(())
    }

    #[test]
    fn finished_positions_are_rejected() -> Result<()> {
        let mut solver = Solver::new(small_config())?;
        let won = BitBoard::from_moves("1213141")?;
        assert_eq!(solver.search(&won, 4), Err(Error::GameOver));
        Ok(())
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let config = SolverConfig {
            table_capacity: 0,
            ..SolverConfig::default()
        };
        assert!(matches!(Solver::new(config), Err(Error::InvalidConfig(_))));
    }
}
