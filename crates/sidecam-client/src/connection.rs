//! Connection state and reconnect backoff.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection state for the streaming client.
///
/// Owned solely by `connect`/`close`; the per-stream retry loops never touch
/// it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,

    /// Transport is being established.
    Connecting,

    /// Transport is up and both stream tasks are running.
    Connected,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        }
    }
}

/// Exponential backoff for the per-stream reconnect supervisors.
///
/// Each supervised task starts at the floor delay and doubles after every
/// failure, capped at the ceiling. The delay resets to the floor only when a
/// fresh `connect` cycle starts the supervisor again; retries within a cycle
/// never shrink it.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub floor: Duration,

    /// Upper bound on the retry delay.
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(1),
            ceiling: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait before the first retry of a cycle.
    pub fn initial_delay(&self) -> Duration {
        self.floor
    }

    /// Delay to wait after the next failure.
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.ceiling)
    }
}
