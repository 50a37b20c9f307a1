//! Error types for the bulletin board server
//!
//! Defines connection-level errors, outbound send errors and
//! configuration errors. Uses thiserror for ergonomic error definitions.
//!
//! Protocol-level problems (unknown verb, bad field count, unknown board)
//! are deliberately absent: they are dropped without a reply.

use thiserror::Error;

/// Application-level errors
///
/// Everything here is fatal to the connection it happened on and
/// to nothing else.
#[derive(Debug, Error)]
pub enum AppError {
    /// Line framing error (over-long line, invalid UTF-8, underlying IO)
    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer task could not deliver a reply to the peer
    #[error("Write to connection failed")]
    WriteFailed,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Message send errors
///
/// Occurs when attempting to send to a session whose outbound path is gone.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session has closed its outbound path
    #[error("Session closed")]
    Closed,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Config file is not valid JSON for `ServerConfig`
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// No boards configured
    #[error("at least one board must be configured")]
    NoBoards,

    /// Board name is empty or contains a protocol delimiter
    #[error("invalid board name: {0:?}")]
    InvalidBoardName(String),

    /// Board name listed twice
    #[error("duplicate board name: {0}")]
    DuplicateBoard(String),

    /// Line limit of zero would reject every command
    #[error("max_line_length must be greater than zero")]
    ZeroLineLength,
}
