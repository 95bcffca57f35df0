use thiserror::Error;

use crate::WIDTH;

/// Errors reported by the board model and the engines
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid move, column {column} out of range. Columns must be between 0 and {}", WIDTH - 1)]
    ColumnOutOfRange { column: usize },

    #[error("Invalid move, column {column} full")]
    ColumnFull { column: usize },

    #[error("Invalid move, the game is already over")]
    GameOver,

    #[error("no legal moves remain, the board is full")]
    NoLegalMoves,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid board: {0}")]
    InvalidBoard(String),

    #[error("could not parse '{found}' at position {position} as a valid move")]
    Parse { position: usize, found: char },
}

impl Error {
    /// The column an illegal move was attempted in, if any
    pub fn column(&self) -> Option<usize> {
        match self {
            Error::ColumnOutOfRange { column } | Error::ColumnFull { column } => Some(*column),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
