//! Error Types
//!
//! Transport-level failures are terminal for a stream and surface once to the
//! caller. Record-level failures are recovered inside the decoder.

use thiserror::Error;

/// Errors surfaced to the owner of a chat exchange
#[derive(Debug, Error)]
pub enum ChatError {
    /// The byte source failed mid-stream
    #[error("Stream read failed: {0}")]
    Transport(String),

    /// The HTTP client failed before or while sending
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Chat server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// An exchange is already in flight for this session
    #[error("An exchange is already in flight")]
    Busy,

    /// Input was empty after trimming
    #[error("Message is empty")]
    EmptyInput,
}

impl ChatError {
    /// Whether this error ends the current stream
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_) | Self::Status { .. })
    }
}

/// A single `data:` record that could not be turned into an event
#[derive(Debug, Error)]
pub enum RecordError {
    /// Payload is not a JSON object with a known shape
    #[error("Malformed record {line:?}: {source}")]
    Malformed {
        /// The offending line, trimmed
        line: String,
        /// Parser error
        source: serde_json::Error,
    },
}
