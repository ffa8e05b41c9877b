//! Error types for the duel core.

use thiserror::Error;

/// The symbol palette failed validation at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("deck is empty")]
    Empty,
    #[error("deck has {valid} valid symbols, at least {minimum} are required")]
    TooSmall { valid: usize, minimum: usize },
}

/// Board generation failed; duel creation must be aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("grid size {0} is invalid: it must be even and at least 2")]
    InvalidGridSize(u8),
    #[error("deck supplies {available} unique symbols but the board needs {required} pairs")]
    InsufficientSymbols { required: usize, available: usize },
    #[error("a {grid_size}x{grid_size} board around this parcel leaves the coordinate range")]
    OutOfRange { grid_size: u8 },
}

/// A configuration value could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("{0}")]
    Rejected(String),
}

/// A duel's internal state no longer satisfies its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuelError {
    #[error("pending selection holds {0} cells")]
    PendingOverflow(usize),
    #[error("{matched} matched cells on a board of {total}")]
    MatchedOverflow { matched: usize, total: usize },
    #[error("pair counts {counted} disagree with {matched} matched cells")]
    PairCountMismatch { counted: u32, matched: usize },
    #[error("board complete but duel still {0}")]
    CompleteNotFinished(&'static str),
}
