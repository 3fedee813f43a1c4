//! Error types for frame sources.

use thiserror::Error;

/// Errors that can occur while operating a frame source.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Source is already running.
    #[error("Source already started")]
    AlreadyStarted,

    /// Source is not running.
    #[error("Source not started")]
    NotStarted,

    /// No frames available to stream.
    #[error("No frames loaded from {0}")]
    NoFrames(String),

    /// IO error while loading frame assets.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
