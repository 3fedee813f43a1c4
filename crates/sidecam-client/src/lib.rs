//! Resilient streaming client for the side camera image service.
//!
//! This crate owns one logical connection to the remote inference service and
//! the two independent long-lived RPC streams layered on it: a
//! client-streaming frame submission call fed from a bounded drop-oldest
//! buffer, and a server-streaming prediction observer. Each stream is wrapped
//! in an auto-reconnect supervisor with exponential backoff, so a failure on
//! one side never takes down the other and never blocks frame producers.

mod channel;
mod client;
mod config;
mod connection;
mod error;
mod prediction;
mod supervisor;

pub use channel::{Frame, FrameChannel, OfferOutcome};
pub use client::{ClientStatistics, SideCameraClient};
pub use config::Endpoint;
pub use connection::{BackoffPolicy, ConnectionState};
pub use error::ClientError;
pub use prediction::{Prediction, PredictionObserver};

/// Capacity of the outbound frame buffer.
pub const FRAME_CHANNEL_CAPACITY: usize = 5;

/// Bound on the graceful shutdown wait in [`SideCameraClient::close`].
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
