//! Error types for the simulation core.
//!
//! Gameplay anomalies (unaffordable plays, vanished targets, out-of-bounds
//! positions) are never errors; they are normalized inside the tick. These
//! variants cover the fallible edges: loading data, serialization, replays.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// The card catalog failed validation.
    #[error("Invalid card catalog: {0}")]
    InvalidCatalog(String),

    /// A card id was referenced that the catalog does not define.
    #[error("Unknown card: {0}")]
    UnknownCard(String),

    /// A match configuration value is out of range.
    #[error("Invalid match config: {0}")]
    InvalidConfig(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// File system error while reading or writing a data file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path that was being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Replay verification failed.
    #[error("Replay desync at tick {tick}: expected hash {expected}, got {actual}")]
    ReplayDesync {
        /// Tick where the mismatch was detected.
        tick: u64,
        /// Hash recorded in the replay.
        expected: u64,
        /// Hash produced by the re-run.
        actual: u64,
    },
}
