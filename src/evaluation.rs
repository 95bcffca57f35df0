//! Static evaluation of positions
//!
//! Terminal positions get a saturating utility that prefers faster wins and
//! slower losses. Everything else is scored from the 69 four-cell windows of
//! the board, a fixed positional weight per occupied cell and a bonus for
//! pieces in the centre column.
//!
//! The evaluation is deliberately asymmetric: an open opponent three costs far
//! more than an open own three earns, which pushes the search towards blocking.

use crate::{BitBoard, Player, HEIGHT, WIDTH};

/// Utility of a won position before the ply penalty
pub const WIN_SCORE: i32 = 100_000;

/// Any score at or above this is a proven win, at or below its negation a proven loss
pub const WIN_THRESHOLD: i32 = WIN_SCORE - (WIDTH * HEIGHT) as i32;

pub const FOUR_SCORE: i32 = 10_000;
pub const THREE_SCORE: i32 = 10;
pub const TWO_SCORE: i32 = 3;
pub const OPPONENT_THREE_PENALTY: i32 = 80;
pub const CENTER_BONUS: i32 = 5;

/// Weight of an occupied cell, indexed by row (bottom first) then column
pub const POSITION_WEIGHTS: [[i32; WIDTH]; HEIGHT] = [
    [3, 4, 5, 7, 5, 4, 3],
    [4, 6, 8, 10, 8, 6, 4],
    [5, 8, 11, 13, 11, 8, 5],
    [5, 8, 11, 13, 11, 8, 5],
    [4, 6, 8, 10, 8, 6, 4],
    [3, 4, 5, 7, 5, 4, 3],
];

pub const NUM_WINDOWS: usize =
    HEIGHT * (WIDTH - 3) + WIDTH * (HEIGHT - 3) + 2 * (WIDTH - 3) * (HEIGHT - 3);

const fn cell(row: usize, column: usize) -> u64 {
    1 << (column * (HEIGHT + 1) + row)
}

/// Bitmasks of every line of four cells on the board
pub const fn window_masks() -> [u64; NUM_WINDOWS] {
    let mut windows = [0; NUM_WINDOWS];
    let mut i = 0;

    let mut row = 0;
    while row < HEIGHT {
        let mut column = 0;
        while column < WIDTH {
            let mut k = 0;
            // horizontal
            if column + 3 < WIDTH {
                while k < 4 {
                    windows[i] |= cell(row, column + k);
                    k += 1;
                }
                i += 1;
            }
            // vertical
            if row + 3 < HEIGHT {
                k = 0;
                while k < 4 {
                    windows[i] |= cell(row + k, column);
                    k += 1;
                }
                i += 1;
            }
            if row + 3 < HEIGHT && column + 3 < WIDTH {
                // diagonal /
                k = 0;
                while k < 4 {
                    windows[i] |= cell(row + k, column + k);
                    k += 1;
                }
                i += 1;
                // diagonal \
                k = 0;
                while k < 4 {
                    windows[i] |= cell(row + 3 - k, column + k);
                    k += 1;
                }
                i += 1;
            }
            column += 1;
        }
        row += 1;
    }
    windows
}

const WINDOWS: [u64; NUM_WINDOWS] = window_masks();

/// Score of a single window given the number of own and opponent pieces in it
pub fn window_score(own: u32, opponent: u32) -> i32 {
    match (own, opponent) {
        (4, 0) => FOUR_SCORE,
        (3, 0) => THREE_SCORE,
        (2, 0) => TWO_SCORE,
        (0, 4) => -FOUR_SCORE,
        (0, 3) => -OPPONENT_THREE_PENALTY,
        (0, 2) => -TWO_SCORE,
        // mixed windows can never be completed by either side
        _ => 0,
    }
}

fn positional_score(mut mask: u64) -> i32 {
    let mut score = 0;
    while mask != 0 {
        let index = mask.trailing_zeros() as usize;
        score += POSITION_WEIGHTS[index % (HEIGHT + 1)][index / (HEIGHT + 1)];
        mask &= mask - 1;
    }
    score
}

/// Utility of a finished position for `perspective`, `None` if the game goes on
pub fn terminal_score(board: &BitBoard, perspective: Player) -> Option<i32> {
    let utility = WIN_SCORE - board.num_moves() as i32;
    match board.winner() {
        Some(winner) if winner == perspective => Some(utility),
        Some(_) => Some(-utility),
        None if board.is_full() => Some(0),
        None => None,
    }
}

/// Heuristic score of a position for `perspective`, ignoring whether it is finished
pub fn heuristic_score(board: &BitBoard, perspective: Player) -> i32 {
    let own = board.player_mask(perspective);
    let opponent = board.player_mask(perspective.other());

    let mut score = 0;
    for window in WINDOWS.iter() {
        score += window_score((own & window).count_ones(), (opponent & window).count_ones());
    }

    score += positional_score(own) - positional_score(opponent);
    score += CENTER_BONUS * (own & BitBoard::column_mask(WIDTH / 2)).count_ones() as i32;
    score
}

/// Scores a position for `perspective`, higher is better
pub fn evaluate(board: &BitBoard, perspective: Player) -> i32 {
    terminal_score(board, perspective).unwrap_or_else(|| heuristic_score(board, perspective))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    #[test]
    fn window_counts() {
        let windows = window_masks();
        assert_eq!(windows.len(), 69);
        assert!(windows.iter().all(|w| w.count_ones() == 4));
        // every window is distinct
        for (i, a) in windows.iter().enumerate() {
            assert!(windows[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn empty_board_is_neutral() {
        let board = BitBoard::new();
        assert_eq!(evaluate(&board, Player::One), 0);
        assert_eq!(evaluate(&board, Player::Two), 0);
    }

    #[test]
    fn centre_is_preferred() -> Result<()> {
        let centre = BitBoard::from_moves("4")?;
        let edge = BitBoard::from_moves("1")?;
        assert_eq!(evaluate(&centre, Player::One), 7 + CENTER_BONUS);
        assert!(evaluate(&centre, Player::One) > evaluate(&edge, Player::One));
        Ok(())
    }

    #[test]
    fn opponent_threes_weigh_more() -> Result<()> {
        // player one has an open three on the bottom row, player two two on top of it
        let board = BitBoard::from_moves("22334")?;
        let one = heuristic_score(&board, Player::One);
        let two = heuristic_score(&board, Player::Two);
        assert!(one > 0);
        assert!(two < 0);
        assert!(-two > one);
        Ok(())
    }

    #[test]
    fn terminal_scores_prefer_fast_wins() -> Result<()> {
        let fast = BitBoard::from_moves("1213141")?;
        let slow = BitBoard::from_moves("121314561")?;
        let fast_score = evaluate(&fast, Player::One);
        let slow_score = evaluate(&slow, Player::One);
        assert!(fast_score >= WIN_THRESHOLD);
        assert!(fast_score > slow_score);
        assert_eq!(evaluate(&fast, Player::Two), -fast_score);
        Ok(())
    }

    #[test]
    fn heuristic_never_reaches_win_threshold() -> Result<()> {
        let board = BitBoard::from_moves("445566")?;
        let score = evaluate(&board, Player::One);
        assert!(score.abs() < WIN_THRESHOLD);
        Ok(())
    }

    #[test]
    fn symmetric_under_colour_swap_and_reflection() -> Result<()> {
        for moves in &["", "4", "4453", "1234567", "3344556", "44444433"] {
            let board = BitBoard::from_moves(moves)?;
            for &player in &[Player::One, Player::Two] {
                let score = evaluate(&board, player);
                assert_eq!(score, evaluate(&board.mirror_players(), player.other()));
                assert_eq!(score, evaluate(&board.mirror_columns(), player));
            }
        }
        Ok(())
    }
}
