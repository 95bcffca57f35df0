//! One running game
//!
//! A [`Match`] owns everything with per-game lifetime: the position, the engine
//! (and with it the engine's tables) and the depth controller. Two games must
//! never share any of these.

use std::time::Duration;

use log::{debug, info};
use serde::Serialize;

use crate::{
    depth::DepthController,
    engine::{Engine, SearchResult},
    BitBoard, Error, Player, Result,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum GameState {
    InProgress,
    Won(Player),
    Draw,
}

impl GameState {
    pub fn of(board: &BitBoard) -> Self {
        match board.winner() {
            Some(player) => GameState::Won(player),
            None if board.is_full() => GameState::Draw,
            None => GameState::InProgress,
        }
    }

    pub fn is_over(&self) -> bool {
        *self != GameState::InProgress
    }
}

/// A game against one engine
pub struct Match {
    board: BitBoard,
    first_player: Player,
    engine: Box<dyn Engine>,
    depth: DepthController,
    dynamic_depth: bool,
    history: Vec<usize>,
}

impl Match {
    /// Starts a game where `first_player` moves first. With `dynamic_depth`
    /// the depth controller adapts the depth after every engine move.
    pub fn new(
        engine: Box<dyn Engine>,
        depth: DepthController,
        dynamic_depth: bool,
        first_player: Player,
    ) -> Self {
        Self {
            board: BitBoard::with_first_player(first_player),
            first_player,
            engine,
            depth,
            dynamic_depth,
            history: Vec::new(),
        }
    }

    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    pub fn state(&self) -> GameState {
        GameState::of(&self.board)
    }

    /// Depth the next engine search will use
    pub fn depth(&self) -> u32 {
        self.depth.depth()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Columns played so far, in order
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Plays a column chosen outside the engine, rejecting illegal moves
    pub fn play_human(&mut self, column: usize) -> Result<GameState> {
        self.board.try_play(column)?;
        self.history.push(column);
        Ok(self.state())
    }

    /// Lets the engine move for the side to move
    pub fn play_engine(&mut self) -> Result<(SearchResult, GameState)> {
        if self.state().is_over() {
            return Err(Error::GameOver);
        }
        let result = self.engine.best_move(&self.board, self.depth.depth())?;
        self.board.try_play(result.column)?;
        self.history.push(result.column);
        debug!(
            "{} played column {} at depth {}",
            self.engine.name(),
            result.column,
            result.stats.depth
        );
        if self.dynamic_depth {
            self.depth.observe(result.stats.elapsed);
        }
        Ok((result, self.state()))
    }

    /// Clears the board, the engine's tables and the depth
    pub fn new_game(&mut self) {
        info!("new game against {}", self.engine.name());
        self.board = BitBoard::with_first_player(self.first_player);
        self.engine.new_game();
        self.depth.reset();
        self.history.clear();
    }
}

/// Running totals for one side of a game between engines
#[derive(Clone, Debug, Default, Serialize)]
pub struct PlayerRecord {
    pub engine: String,
    pub moves: u32,
    pub nodes: u64,
    pub thinking: Duration,
}

/// Outcome of a game between two engines
#[derive(Clone, Debug, Serialize)]
pub struct GameRecord {
    pub outcome: GameState,
    pub moves: Vec<usize>,
    /// indexed by player, `Player::One` moved first
    pub players: [PlayerRecord; 2],
}

/// Plays a full game, `first` moving as `Player::One`
///
/// Both engines are reset first; each keeps its own tables for the whole game.
pub fn play_game<'a>(
    first: &'a mut dyn Engine,
    second: &'a mut dyn Engine,
    depth: u32,
) -> Result<GameRecord> {
    first.new_game();
    second.new_game();

    let mut board = BitBoard::new();
    let mut moves = Vec::new();
    let mut players = [
        PlayerRecord {
            engine: first.name().to_string(),
            ..PlayerRecord::default()
        },
        PlayerRecord {
            engine: second.name().to_string(),
            ..PlayerRecord::default()
        },
    ];

    while !GameState::of(&board).is_over() {
        let player = board.to_move();
        let engine = match player {
            Player::One => &mut *first,
            Player::Two => &mut *second,
        };
        let result = engine.best_move(&board, depth)?;
        board.try_play(result.column)?;
        moves.push(result.column);

        let record = &mut players[player.index()];
        record.moves += 1;
        record.nodes += result.stats.nodes;
        record.thinking += result.stats.elapsed;
    }

    Ok(GameRecord {
        outcome: GameState::of(&board),
        moves,
        players,
    })
}
