//! Error types for the engine.

use thiserror::Error;

/// Errors reported by the public engine operations. Every operation is
/// total: on an error path the board and network are left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid FEN string")]
    InvalidFen,

    #[error("square index {square} out of range (must be 0-63)")]
    SquareOutOfRange { square: u8 },

    #[error("illegal move: {from} -> {to}")]
    MoveIllegal { from: u8, to: u8 },

    #[error("a promotion is pending; commit it before other moves")]
    PromotionNotExpected,

    #[error("no promotion is pending")]
    NoPromotionPending,

    #[error("neural network is not initialized")]
    NetNotInitialized,

    #[error("feature vector size mismatch: expected {expected}, got {got}")]
    FeatureSizeMismatch { expected: usize, got: usize },

    #[error("network persistence error: {reason}")]
    PersistenceFormat { reason: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
