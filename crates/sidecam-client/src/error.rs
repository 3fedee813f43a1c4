//! Error types for the streaming client.

use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Endpoint configuration is invalid.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Initial transport construction failed.
    #[error("Connect failed: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// Frame submitted while no connection is live.
    #[error("Not connected")]
    NotConnected,

    /// Frame buffer is closed and cannot accept items.
    #[error("Frame channel closed")]
    ChannelClosed,
}
