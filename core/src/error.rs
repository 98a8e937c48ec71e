use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Tile values must be empty or a power of two of at least 2")]
    InvalidTileValue,
}

pub type Result<T> = std::result::Result<T, GameError>;
