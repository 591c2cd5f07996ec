use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("illegal tap at index {index}: {reason}")]
    IllegalTap {
        index: usize,
        reason: IllegalTapReason,
    },

    #[error("failed to persist stat record: {0}")]
    PersistenceFailure(#[from] PersistenceError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("card count {0} is odd")]
    OddCardCount(usize),

    #[error("card count {count} is outside {min}..={max}")]
    CardCountOutOfRange { count: usize, min: usize, max: usize },

    #[error("column count {columns} is outside {min}..={max}")]
    ColumnsOutOfRange {
        columns: usize,
        min: usize,
        max: usize,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalTapReason {
    #[error("no card at this position (deck has {len} cards)")]
    OutOfRange { len: usize },

    #[error("card is already matched")]
    AlreadyMatched,

    #[error("card is already face up")]
    AlreadyFaceUp,

    #[error("session is not active")]
    NotActive,
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl GameError {
    pub fn is_illegal_tap(&self) -> bool {
        matches!(self, GameError::IllegalTap { .. })
    }
}

pub type Result<T, E = GameError> = std::result::Result<T, E>;
