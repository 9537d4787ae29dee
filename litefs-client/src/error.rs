//! Error types for the LiteFS client

use std::sync::Arc;

use thiserror::Error;

/// Errors from the event subscription and the primary monitor
///
/// Cloneable so the monitor can hand the most recent failure to every
/// reader; sources that are not `Clone` are held behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Connection could not be established or broke before a response arrived
    #[error("HTTP request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// Events endpoint answered with a non-success status
    #[error("unexpected status: {0}")]
    UnexpectedStatus(u16),

    /// A line of the stream was not a valid event
    #[error("failed to decode event: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    /// The stream broke in the middle of an event
    #[error("event stream truncated: {0}")]
    Truncated(String),

    /// The server finished the response; the next read reconnects
    #[error("event stream ended")]
    StreamEnded,

    /// The subscription or monitor was closed
    #[error("closed")]
    Closed,

    /// No event or error has been received yet
    #[error("awaiting first event")]
    NotReady,

    /// Waiting for readiness took longer than the caller allowed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Configuration validation failed
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether calling `next()` again may succeed
    ///
    /// Everything the remote side can cause is retryable; closing and
    /// caller-side conditions are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::UnexpectedStatus(_)
                | Error::Decode(_)
                | Error::Truncated(_)
                | Error::StreamEnded
        )
    }

    /// Whether this is the canonical closed error
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(Arc::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(Arc::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from reading the replication lag file
#[derive(Debug, Error)]
pub enum LagError {
    /// Lag file could not be read
    #[error("failed to read lag file: {0}")]
    Io(#[from] std::io::Error),

    /// Lag file does not hold a 32-bit integer
    #[error("invalid lag value: {0}")]
    Parse(#[from] std::num::ParseIntError),

    /// Initial replication from the primary has not finished
    #[error("initial replication from primary not finished yet")]
    NotReplicated,

    /// Lag file holds a negative millisecond count
    #[error("negative lag: {0}ms")]
    Negative(i32),
}
