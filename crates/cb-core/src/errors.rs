use std::path::PathBuf;

/// Core error type for ChannelBot.
///
/// Adapter crates should map their specific errors into this type so the bot
/// core can handle failures consistently (logged and skipped vs user-facing).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("no channel at registry index {0}")]
    UnknownChannel(usize),

    #[error("channel at index {index} is {expected}, refusing to overwrite with {actual}")]
    ChannelMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a command was rejected.
///
/// Every variant ends up as exactly one reply to the author; none of them
/// escapes the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<String>),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("channel not resolvable: {0}")]
    Resolution(String),

    /// The video platform could not be asked at all.
    #[error("channel lookup failed: {0}")]
    LookupFailed(String),

    #[error("channel {channel_id} is already registered for /r/{destination}")]
    Duplicate {
        channel_id: String,
        destination: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}
