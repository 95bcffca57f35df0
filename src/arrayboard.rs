//! Dense grid representation of a position, as exchanged with front ends

use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};
use serde::{Deserialize, Serialize};

use std::io::{stdout, Write};

use crate::{BitBoard, Player, Result, HEIGHT, WIDTH};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    PlayerOne,
    PlayerTwo,
}

impl Cell {
    pub fn player(&self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::PlayerOne => Some(Player::One),
            Cell::PlayerTwo => Some(Player::Two),
        }
    }
}

impl From<Option<Player>> for Cell {
    fn from(player: Option<Player>) -> Self {
        match player {
            None => Cell::Empty,
            Some(Player::One) => Cell::PlayerOne,
            Some(Player::Two) => Cell::PlayerTwo,
        }
    }
}

/// Rows by columns, row 0 is the bottom row
pub type Grid = [[Cell; WIDTH]; HEIGHT];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayBoard {
    cells: Grid,
    to_move: Player,
}

impl ArrayBoard {
    pub fn from_cells(cells: Grid, to_move: Player) -> Self {
        Self { cells, to_move }
    }

    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.cells[row][column]
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    /// Packs the grid into a bitboard, rejecting unreachable layouts
    pub fn to_bitboard(&self) -> Result<BitBoard> {
        let mut masks = [0u64; 2];
        for (row, cells) in self.cells.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                if let Some(player) = cell.player() {
                    masks[player.index()] |= BitBoard::cell_mask(row, column);
                }
            }
        }
        BitBoard::from_masks(masks[0], masks[1], self.to_move)
    }

    /// Draws the board in place at the cursor, with column numbers on top
    pub fn display(&self) -> anyhow::Result<()> {
        let mut stdout = stdout();

        let cols: String = (1..=WIDTH).map(|x| x.to_string()).collect();
        stdout.queue(PrintStyledContent(style(cols + "\n")))?;
        for _ in 0..HEIGHT {
            stdout.queue(PrintStyledContent(style("\n")))?;
        }
        stdout.flush()?;

        let (origin_x, origin_y) = crossterm::cursor::position()?;

        for (row, cells) in self.cells.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                let (pos_x, pos_y) = (origin_x + column as u16, origin_y - row as u16);

                stdout
                    .queue(MoveTo(pos_x, pos_y))?
                    .queue(PrintStyledContent(
                        style("O")
                            .attribute(Attribute::Bold)
                            .on(Color::DarkBlue)
                            .with(match cell {
                                Cell::PlayerOne => Color::Red,
                                Cell::PlayerTwo => Color::Yellow,
                                Cell::Empty => Color::DarkBlue,
                            }),
                    ))?;
            }
        }
        stdout
            .queue(MoveTo(origin_x + WIDTH as u16, origin_y))?
            .queue(PrintStyledContent(style("\n")))?;
        stdout.flush()?;
        Ok(())
    }
}

impl From<&BitBoard> for ArrayBoard {
    fn from(board: &BitBoard) -> Self {
        let mut cells = [[Cell::Empty; WIDTH]; HEIGHT];
        for (row, row_cells) in cells.iter_mut().enumerate() {
            for (column, cell) in row_cells.iter_mut().enumerate() {
                *cell = Cell::from(board.cell(row, column));
            }
        }
        Self {
            cells,
            to_move: board.to_move(),
        }
    }
}
