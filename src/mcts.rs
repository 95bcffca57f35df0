//! Monte-Carlo tree search
//!
//! Two variants share the rollout policy and the UCT rule. [`Mcts`] grows a
//! fresh tree for every move. [`TranspositionMcts`] keeps node statistics in a
//! map keyed by position for the whole game, so different move orders reaching
//! the same position (or its mirror image) share what was learned about it.
//!
//! Rewards are stored from the point of view of the player who moved into a
//! node: 1 for a win, 0 for a loss and 0.5 for a draw.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    engine::{Engine, SearchResult, SearchStats},
    BitBoard, Error, Player, Result, WIDTH,
};

/// Columns tried by the rollout policy when nothing is forced
const CENTRE_PREFERENCE: [usize; WIDTH] = [3, 2, 4, 1, 5, 0, 6];

#[derive(Clone, Debug, PartialEq)]
pub struct MctsConfig {
    pub iterations: u32,
    /// stop early once this much time was spent
    pub time_limit: Option<Duration>,
    /// the `C` in the UCT formula
    pub exploration: f64,
    /// probability of a uniformly random move at each rollout step
    pub rollout_randomness: f64,
    /// fixed seed for reproducible games, random otherwise
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: 8000,
            time_limit: None,
            exploration: 1.41,
            rollout_randomness: 0.1,
            seed: None,
        }
    }
}

impl MctsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfig("iterations must be positive".into()));
        }
        if !(self.exploration.is_finite() && self.exploration >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "exploration constant {} must be finite and non-negative",
                self.exploration
            )));
        }
        if !(0.0..=1.0).contains(&self.rollout_randomness) {
            return Err(Error::InvalidConfig(format!(
                "rollout randomness {} outside [0, 1]",
                self.rollout_randomness
            )));
        }
        Ok(())
    }

    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }

    fn out_of_time(&self, start: Instant) -> bool {
        self.time_limit.map_or(false, |limit| start.elapsed() >= limit)
    }
}

/// Upper confidence bound of a child, unvisited children come first
pub fn uct(reward: f64, visits: u32, parent_visits: u32, exploration: f64) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    let visits = visits as f64;
    let parent_visits = parent_visits.max(1) as f64;
    reward / visits + exploration * (parent_visits.ln() / visits).sqrt()
}

fn reward_for(mover: Player, winner: Option<Player>) -> f64 {
    match winner {
        Some(winner) if winner == mover => 1.0,
        Some(_) => 0.0,
        None => 0.5,
    }
}

fn random_legal_move<R: Rng>(board: &BitBoard, rng: &mut R) -> Option<usize> {
    let count = board.legal_moves().count();
    if count == 0 {
        return None;
    }
    board.legal_moves().nth(rng.gen_range(0..count))
}

/// Picks a rollout move: sometimes at random, otherwise win, block, or the most central column
pub fn rollout_move<R: Rng>(board: &BitBoard, rng: &mut R, randomness: f64) -> Option<usize> {
    if rng.gen_bool(randomness) {
        return random_legal_move(board, rng);
    }
    BitBoard::columns_in(board.winning_moves())
        .next()
        .or_else(|| BitBoard::columns_in(board.threatened_moves()).next())
        .or_else(|| {
            CENTRE_PREFERENCE
                .iter()
                .copied()
                .find(|&column| board.playable(column))
        })
}

/// Plays `board` out to the end, returning the winner (`None` for a draw)
pub fn simulate<R: Rng>(mut board: BitBoard, rng: &mut R, randomness: f64) -> Option<Player> {
    loop {
        if let Some(winner) = board.winner() {
            return Some(winner);
        }
        match rollout_move(&board, rng, randomness) {
            Some(column) => board.play(column),
            None => return None,
        }
    }
}

fn check_searchable(board: &BitBoard) -> Result<()> {
    if board.winner().is_some() {
        return Err(Error::GameOver);
    }
    if board.is_full() {
        return Err(Error::NoLegalMoves);
    }
    Ok(())
}

/// Chooses the most visited root child, the lowest column on ties
fn summarize<I>(children: I, mut stats: SearchStats) -> Result<SearchResult>
where
    I: IntoIterator<Item = (usize, u32, f64)>,
{
    let mut column_scores = [None; WIDTH];
    let mut best: Option<(usize, u32)> = None;
    for (column, visits, reward) in children {
        stats.root_visits[column] = visits;
        if visits > 0 {
            column_scores[column] = Some((1000.0 * reward / visits as f64).round() as i32);
        }
        best = match best {
            Some((best_column, best_visits))
                if best_visits > visits || (best_visits == visits && best_column < column) =>
            {
                Some((best_column, best_visits))
            }
            _ => Some((column, visits)),
        };
    }
    let (column, _) = best.ok_or(Error::NoLegalMoves)?;
    Ok(SearchResult {
        column,
        score: column_scores[column].unwrap_or(500),
        column_scores,
        stats,
    })
}

struct Node {
    board: BitBoard,
    column: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    untried: Vec<usize>,
    visits: u32,
    reward: f64,
}

impl Node {
    fn new(board: BitBoard, column: usize, parent: Option<usize>) -> Self {
        let untried = if board.is_terminal() {
            Vec::new()
        } else {
            board.legal_moves().collect()
        };
        Self {
            board,
            column,
            parent,
            children: Vec::new(),
            untried,
            visits: 0,
            reward: 0.0,
        }
    }
}

/// MCTS building a new tree for every move
pub struct Mcts {
    config: MctsConfig,
    rng: SmallRng,
}

impl Mcts {
    pub fn new(config: MctsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng: config.rng(),
            config,
        })
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    fn select_child(&self, nodes: &[Node], index: usize) -> usize {
        let parent = &nodes[index];
        let mut best = (parent.children[0], f64::NEG_INFINITY);
        for &child in parent.children.iter() {
            let value = uct(
                nodes[child].reward,
                nodes[child].visits,
                parent.visits,
                self.config.exploration,
            );
            // strictly greater keeps the first child on ties
            if value > best.1 {
                best = (child, value);
            }
        }
        best.0
    }

    pub fn search(&mut self, board: &BitBoard) -> Result<SearchResult> {
        check_searchable(board)?;
        let start = Instant::now();
        let mut nodes = vec![Node::new(*board, WIDTH, None)];
        let mut stats = SearchStats::default();

        while stats.iterations < self.config.iterations as u64 && !self.config.out_of_time(start) {
            stats.iterations += 1;

            // selection
            let mut index = 0;
            let mut depth = 0;
            while nodes[index].untried.is_empty() && !nodes[index].children.is_empty() {
                index = self.select_child(&nodes, index);
                depth += 1;
            }

            // expansion
            if !nodes[index].untried.is_empty() {
                let pick = self.rng.gen_range(0..nodes[index].untried.len());
                let column = nodes[index].untried.swap_remove(pick);
                let mut next = nodes[index].board;
                next.play(column);
                nodes.push(Node::new(next, column, Some(index)));
                let child = nodes.len() - 1;
                nodes[index].children.push(child);
                index = child;
                depth += 1;
            }
            stats.depth = stats.depth.max(depth);

            // simulation
            let winner = simulate(nodes[index].board, &mut self.rng, self.config.rollout_randomness);

            // backpropagation
            let mut current = Some(index);
            while let Some(i) = current {
                let node = &mut nodes[i];
                node.visits += 1;
                node.reward += reward_for(node.board.to_move().other(), winner);
                current = node.parent;
            }
        }

        stats.nodes = nodes.len() as u64;
        stats.elapsed = start.elapsed();
        let root = &nodes[0];
        let result = summarize(
            root.children
                .iter()
                .map(|&child| (nodes[child].column, nodes[child].visits, nodes[child].reward)),
            stats,
        )?;
        debug!(
            "mcts: column {} after {} iterations ({} nodes) in {:?}",
            result.column, result.stats.iterations, result.stats.nodes, result.stats.elapsed
        );
        Ok(result)
    }
}

impl Engine for Mcts {
    fn name(&self) -> &'static str {
        "mcts"
    }

    fn best_move(&mut self, board: &BitBoard, _depth: u32) -> Result<SearchResult> {
        self.search(board)
    }

    fn new_game(&mut self) {
        self.rng = self.config.rng();
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Statistics {
    visits: u32,
    reward: f64,
}

/// Key shared by a position and its left-right mirror image
pub fn canonical_key(board: &BitBoard) -> u64 {
    board.key().min(board.mirror_columns().key())
}

/// MCTS over a game-long map of position statistics
///
/// Children are never stored, they are found again by playing each legal
/// move and looking the resulting position up, so there are no links between
/// nodes at all.
pub struct TranspositionMcts {
    config: MctsConfig,
    rng: SmallRng,
    table: HashMap<u64, Statistics>,
}

impl TranspositionMcts {
    pub fn new(config: MctsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng: config.rng(),
            config,
            table: HashMap::new(),
        })
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Number of positions with statistics
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn child_statistics(&self, board: &BitBoard, column: usize) -> Option<Statistics> {
        let mut next = *board;
        next.play(column);
        self.table.get(&canonical_key(&next)).copied()
    }

    /// Runs one iteration, returning the length of the selected path
    fn iterate(&mut self, root: &BitBoard) -> u32 {
        let mut board = *root;
        let mut path = vec![(canonical_key(&board), board.to_move().other())];

        while !board.is_terminal() {
            let unexpanded: Vec<usize> = board
                .legal_moves()
                .filter(|&column| self.child_statistics(&board, column).is_none())
                .collect();

            let column = if unexpanded.is_empty() {
                let parent_visits = self
                    .table
                    .get(&canonical_key(&board))
                    .map_or(0, |statistics| statistics.visits);
                let mut best = (WIDTH, f64::NEG_INFINITY);
                for column in board.legal_moves() {
                    let child = self.child_statistics(&board, column).unwrap_or_default();
                    let value = uct(child.reward, child.visits, parent_visits, self.config.exploration);
                    if value > best.1 {
                        best = (column, value);
                    }
                }
                best.0
            } else {
                unexpanded[self.rng.gen_range(0..unexpanded.len())]
            };

            board.play(column);
            let key = canonical_key(&board);
            path.push((key, board.to_move().other()));
            if !unexpanded.is_empty() {
                self.table.entry(key).or_default();
                break;
            }
        }

        let winner = simulate(board, &mut self.rng, self.config.rollout_randomness);
        for &(key, mover) in path.iter() {
            let statistics = self.table.entry(key).or_default();
            statistics.visits += 1;
            statistics.reward += reward_for(mover, winner);
        }
        path.len() as u32 - 1
    }

    pub fn search(&mut self, board: &BitBoard) -> Result<SearchResult> {
        check_searchable(board)?;
        let start = Instant::now();
        let mut stats = SearchStats::default();

        while stats.iterations < self.config.iterations as u64 && !self.config.out_of_time(start) {
            stats.iterations += 1;
            let depth = self.iterate(board);
            stats.depth = stats.depth.max(depth);
        }

        stats.nodes = self.table.len() as u64;
        stats.elapsed = start.elapsed();
        let children: Vec<_> = board
            .legal_moves()
            .map(|column| {
                let child = self.child_statistics(board, column).unwrap_or_default();
                (column, child.visits, child.reward)
            })
            .collect();
        let result = summarize(children, stats)?;
        debug!(
            "mcts with transpositions: column {} after {} iterations ({} positions known) in {:?}",
            result.column, result.stats.iterations, result.stats.nodes, result.stats.elapsed
        );
        Ok(result)
    }
}

impl Engine for TranspositionMcts {
    fn name(&self) -> &'static str {
        "mcts-transposition"
    }

    fn best_move(&mut self, board: &BitBoard, _depth: u32) -> Result<SearchResult> {
        self.search(board)
    }

    fn new_game(&mut self) {
        self.table.clear();
        self.rng = self.config.rng();
    }
}
