//! Error types for PowChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Mining exhausted: no nonce satisfied difficulty {difficulty} within {attempts} attempts")]
    MiningExhausted { attempts: u64, difficulty: usize },

    #[error("Mining cancelled after {attempts} attempts")]
    MiningCancelled { attempts: u64 },

    #[error("Nonce overflow while mining block {0}")]
    NonceOverflow(u64),

    #[error("Invalid difficulty {0}: must be between 0 and 64")]
    InvalidDifficulty(usize),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Miner thread pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for ChainError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        ChainError::ThreadPool(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
