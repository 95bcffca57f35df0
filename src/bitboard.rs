//! Packed board representation
//!
//! Each column occupies `HEIGHT + 1` bits of a `u64`, bottom cell first. The
//! extra bit on top of every column stays empty so that shifted masks never
//! bleed from one column into the next, which is what makes the shift-and-mask
//! alignment tests below valid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, HEIGHT, WIDTH};

pub(crate) mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// One of the two sides
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Human readable player number, starting at 1
    pub fn number(self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

/// A Connect 4 position: one occupancy mask per player plus fill heights
///
/// Moves are column indices `0..WIDTH`. Child positions are either copies
/// (`apply`) or in-place mutations reverted with `undo`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitBoard {
    masks: [u64; 2],
    heights: [u8; WIDTH],
    num_moves: usize,
    to_move: Player,
}

impl BitBoard {
    pub fn new() -> Self {
        Self::with_first_player(Player::One)
    }

    /// An empty board where `player` makes the first move
    pub fn with_first_player(player: Player) -> Self {
        Self {
            masks: [0, 0],
            heights: [0; WIDTH],
            num_moves: 0,
            to_move: player,
        }
    }

    /// Builds a position from a string of 1-indexed column digits, e.g. `"4453"`
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();

        for (position, column_char) in moves.as_ref().chars().enumerate() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => board.try_play(column - 1)?,
                _ => {
                    return Err(Error::Parse {
                        position,
                        found: column_char,
                    })
                }
            }
        }
        Ok(board)
    }

    /// Builds a position from per-player masks, checking that it is reachable
    pub fn from_masks(one: u64, two: u64, to_move: Player) -> Result<Self> {
        if one & two != 0 {
            return Err(Error::InvalidBoard("a cell is occupied by both players".into()));
        }
        let board_mask = one | two;
        if board_mask & !static_masks::full_board_mask() != 0 {
            return Err(Error::InvalidBoard("pieces outside of the board".into()));
        }

        let mut heights = [0; WIDTH];
        for (column, height) in heights.iter_mut().enumerate() {
            let column_bits = (board_mask & Self::column_mask(column)) >> (column * (HEIGHT + 1));
            // a column must be filled contiguously from the bottom
            if column_bits & (column_bits + 1) != 0 {
                return Err(Error::InvalidBoard(format!(
                    "floating piece in column {}",
                    column
                )));
            }
            *height = column_bits.count_ones() as u8;
        }

        let (count_one, count_two) = (one.count_ones() as i32, two.count_ones() as i32);
        if (count_one - count_two).abs() > 1 {
            return Err(Error::InvalidBoard(format!(
                "impossible piece counts {} and {}",
                count_one, count_two
            )));
        }
        if Self::has_alignment(one) && Self::has_alignment(two) {
            return Err(Error::InvalidBoard("both players have four in a row".into()));
        }

        Ok(Self {
            masks: [one, two],
            heights,
            num_moves: board_mask.count_ones() as usize,
            to_move,
        })
    }

    pub fn player_mask(&self, player: Player) -> u64 {
        self.masks[player.index()]
    }

    pub fn board_mask(&self) -> u64 {
        self.masks[0] | self.masks[1]
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    pub fn height(&self, column: usize) -> usize {
        self.heights[column] as usize
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    pub fn cell_mask(row: usize, column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + row)
    }

    /// Columns with at least one cell set in `bitmap`, ascending
    pub fn columns_in(bitmap: u64) -> impl Iterator<Item = usize> {
        (0..WIDTH).filter(move |&column| bitmap & Self::column_mask(column) != 0)
    }

    /// The owner of a cell, row 0 being the bottom row
    pub fn cell(&self, row: usize, column: usize) -> Option<Player> {
        let mask = Self::cell_mask(row, column);
        if self.masks[0] & mask != 0 {
            Some(Player::One)
        } else if self.masks[1] & mask != 0 {
            Some(Player::Two)
        } else {
            None
        }
    }

    pub fn playable(&self, column: usize) -> bool {
        column < WIDTH && Self::top_mask(column) & self.board_mask() == 0
    }

    /// Legal moves in ascending column order
    pub fn legal_moves(&self) -> impl Iterator<Item = usize> + '_ {
        (0..WIDTH).filter(move |&column| self.playable(column))
    }

    /// Bitmap of the cells a piece would land in for every non-full column
    pub fn possible_moves(&self) -> u64 {
        (self.board_mask() + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// Plays a legal move for the side to move, without any checks
    pub fn play(&mut self, column: usize) {
        debug_assert!(self.playable(column), "column {} is not playable", column);
        let move_bitmap = Self::cell_mask(self.heights[column] as usize, column);
        self.masks[self.to_move.index()] |= move_bitmap;
        self.heights[column] += 1;
        self.num_moves += 1;
        self.to_move = self.to_move.other();
    }

    /// Plays a move after checking the column and the state of the game
    pub fn try_play(&mut self, column: usize) -> Result<()> {
        if column >= WIDTH {
            return Err(Error::ColumnOutOfRange { column });
        }
        if !self.playable(column) {
            return Err(Error::ColumnFull { column });
        }
        if self.winner().is_some() {
            return Err(Error::GameOver);
        }
        self.play(column);
        Ok(())
    }

    /// Returns the position after `column` is played, leaving `self` untouched
    pub fn apply(&self, column: usize) -> Result<Self> {
        let mut next = *self;
        next.try_play(column)?;
        Ok(next)
    }

    /// Takes back the most recent piece in `column`, restoring the side to move
    pub fn undo(&mut self, column: usize) {
        debug_assert!(self.heights[column] > 0, "column {} is empty", column);
        let last = self.to_move.other();
        let move_bitmap = Self::cell_mask(self.heights[column] as usize - 1, column);
        debug_assert!(
            self.masks[last.index()] & move_bitmap != 0,
            "top of column {} was not played by {}",
            column,
            last
        );
        self.masks[last.index()] &= !move_bitmap;
        self.heights[column] -= 1;
        self.num_moves -= 1;
        self.to_move = last;
    }

    /// Does `mask` contain four aligned cells in any direction?
    pub fn has_alignment(mask: u64) -> bool {
        // vertical, horizontal and both diagonals
        for &shift in &[1, HEIGHT + 1, HEIGHT, HEIGHT + 2] {
            // mark all runs of 2
            let m = mask & (mask >> shift);
            // check for runs of 2 * (runs of 2)
            if m & (m >> (2 * shift)) != 0 {
                return true;
            }
        }
        false
    }

    pub fn is_win(&self, player: Player) -> bool {
        Self::has_alignment(self.masks[player.index()])
    }

    pub fn winner(&self) -> Option<Player> {
        // only the player who moved last can have completed an alignment
        let last = self.to_move.other();
        if self.is_win(last) {
            Some(last)
        } else if self.is_win(self.to_move) {
            Some(self.to_move)
        } else {
            None
        }
    }

    pub fn is_full(&self) -> bool {
        self.num_moves == WIDTH * HEIGHT
    }

    pub fn is_draw(&self) -> bool {
        self.is_full() && self.winner().is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.is_full() || self.winner().is_some()
    }

    /// Would the side to move win by playing `column`?
    pub fn check_winning_move(&self, column: usize) -> bool {
        let pos = self.masks[self.to_move.index()]
            | ((self.board_mask() + Self::bottom_mask(column)) & Self::column_mask(column));
        Self::has_alignment(pos)
    }

    /// Open cells that complete an alignment for `player`
    pub fn winning_positions(&self, player: Player) -> u64 {
        let player_mask = self.masks[player.index()];

        // vertical
        // find the top ends of 3-alignments
        let mut r = (player_mask << 1) & (player_mask << 2) & (player_mask << 3);

        // horizontal and both diagonals
        for &shift in &[HEIGHT + 1, HEIGHT, HEIGHT + 2] {
            let mut p = (player_mask << shift) & (player_mask << (2 * shift));
            // find the right ends of 3-alignments
            r |= p & (player_mask << (3 * shift));
            // find holes of the type ...O O _ O...
            r |= p & (player_mask >> shift);

            p = (player_mask >> shift) & (player_mask >> (2 * shift));
            // find the left ends of 3-alignments
            r |= p & (player_mask >> (3 * shift));
            // find holes of the type ...O _ O O...
            r |= p & (player_mask << shift);
        }

        r & (static_masks::full_board_mask() ^ self.board_mask())
    }

    /// Playable cells that win immediately for the side to move
    pub fn winning_moves(&self) -> u64 {
        self.possible_moves() & self.winning_positions(self.to_move)
    }

    /// Playable cells the opponent would win with on their next move
    pub fn threatened_moves(&self) -> u64 {
        self.possible_moves() & self.winning_positions(self.to_move.other())
    }

    /// Key for transposition tables: piece layout plus the side to move
    pub fn key(&self) -> u64 {
        // unique for a layout, uses at most WIDTH * (HEIGHT + 1) + 1 bits
        let layout = self.masks[0] + self.board_mask();
        layout | ((self.to_move.index() as u64) << 63)
    }

    /// The same position with the colours of every piece and the side to move swapped
    pub fn mirror_players(&self) -> Self {
        Self {
            masks: [self.masks[1], self.masks[0]],
            heights: self.heights,
            num_moves: self.num_moves,
            to_move: self.to_move.other(),
        }
    }

    /// The position reflected left to right
    pub fn mirror_columns(&self) -> Self {
        let mut mirrored = Self {
            masks: [0, 0],
            heights: self.heights,
            num_moves: self.num_moves,
            to_move: self.to_move,
        };
        mirrored.heights.reverse();
        for column in 0..WIDTH {
            let shift = column * (HEIGHT + 1);
            let mirror_shift = (WIDTH - 1 - column) * (HEIGHT + 1);
            for (mirror_mask, mask) in mirrored.masks.iter_mut().zip(self.masks.iter()) {
                *mirror_mask |= ((mask >> shift) & ((1 << HEIGHT) - 1)) << mirror_shift;
            }
        }
        mirrored
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..HEIGHT).rev() {
            for column in 0..WIDTH {
                let symbol = match self.cell(row, column) {
                    Some(Player::One) => 'X',
                    Some(Player::Two) => 'O',
                    None => '.',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        for column in 0..WIDTH {
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}
