//! Move ordering for the alpha-beta search
//!
//! Ordering never changes the result of a search, only how early cutoffs
//! happen. Candidates are ranked in strict tiers:
//!
//! 1. moves that win immediately for the side to move
//! 2. moves that block a cell the opponent would win with next ply
//! 3. killer moves recorded for this depth, most recent first
//! 4. everything else, centre columns first
//!
//! Ties inside a tier go to the lowest column.

use crate::{killer::KillerTable, BitBoard, WIDTH};

const WIN_PRIORITY: i32 = 300;
const BLOCK_PRIORITY: i32 = 200;
const KILLER_PRIORITY: i32 = 100;

/// Static preference for a column, highest in the centre and falling towards the edges
pub const fn centre_priority(column: usize) -> i32 {
    let centre = (WIDTH / 2) as i32;
    let distance = column as i32 - centre;
    centre - if distance < 0 { -distance } else { distance }
}

/// Fixed capacity list of moves yielded from highest to lowest score
pub struct MoveSorter {
    size: usize,
    // column and score
    moves: [(usize, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0); WIDTH],
        }
    }

    /// Adds a move, among equal scores the move pushed last is yielded first
    pub fn push(&mut self, column: usize, score: i32) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].1 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (column, score);
    }
}

impl Default for MoveSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for MoveSorter {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some(self.moves[self.size].0)
            }
        }
    }
}

/// Ranks the legal moves of `board` for a search at `depth`
pub fn order_moves(board: &BitBoard, depth: u32, killers: Option<&KillerTable>) -> MoveSorter {
    let winning = board.winning_moves();
    let threatened = board.threatened_moves();

    let mut moves = MoveSorter::new();
    // pushing columns from right to left leaves ties in ascending column order
    for column in (0..WIDTH).rev() {
        if !board.playable(column) {
            continue;
        }
        let column_mask = BitBoard::column_mask(column);
        let score = if winning & column_mask != 0 {
            WIN_PRIORITY
        } else if threatened & column_mask != 0 {
            BLOCK_PRIORITY
        } else if let Some(recency) =
            killers.and_then(|killers| killers.get(depth).position(|killer| killer == column))
        {
            KILLER_PRIORITY - recency as i32
        } else {
            centre_priority(column)
        };
        moves.push(column, score);
    }
    moves
}
