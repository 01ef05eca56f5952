//! Error types surfaced to callers of the engine

use thiserror::Error;

/// Recoverable errors; none of these end the process
#[derive(Debug, Error)]
pub enum TrisError {
    /// A game is already live in this context
    #[error("a game is already running here")]
    AlreadyRunning,

    /// No live game in this context
    #[error("no game running here - use !tris to start one")]
    NoSession,

    /// Unrecognized command token; the whole sequence was rejected
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Stats requested for a user that never finished a game
    #[error("no games recorded for this player")]
    NoRecord,

    /// Speed factor outside the accepted range
    #[error("invalid speed factor {0} (allowed 0.1 to 100)")]
    InvalidSpeed(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("score file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TrisError>;
