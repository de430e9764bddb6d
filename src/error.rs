use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    #[error("grid {rows}x{cols} is too small: (1,1) must be an interior cell")]
    TooSmall { rows: usize, cols: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Maze(#[from] MazeError),
    #[error("starting lives must be at least 1, got {0}")]
    InvalidLives(i32),
    #[error("a session needs at least one pursuer")]
    NoPursuers,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("best score store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("best score store payload is invalid: {0}")]
    Json(#[from] serde_json::Error),
}
