//! Error types for the poll lifecycle engine

use crate::platform::PlatformError;
use thiserror::Error;

/// Errors that can occur during poll operations
#[derive(Debug, Error)]
pub enum PollError {
    /// Backing medium could not be read or written
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing medium or snapshot content could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// A platform call failed
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The stored member snapshot could not be restored
    #[error("corrupt member snapshot for poll {poll_id}: {source}")]
    CorruptSnapshot {
        poll_id: String,
        source: serde_yaml::Error,
    },
}

/// Result type for poll operations
pub type PollResult<T> = Result<T, PollError>;
