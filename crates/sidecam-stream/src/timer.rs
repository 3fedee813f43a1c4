//! Rate gate for frame submission.

use std::time::{Duration, Instant};

/// Admits at most `rate` events per `period`.
///
/// `tick` runs its action only when at least `period / rate` has elapsed
/// since the last executed action, or when no action has executed yet.
/// Intended to be driven from a single capture callback context; calling
/// `tick` concurrently from multiple threads is undefined unless externally
/// synchronized.
#[derive(Debug)]
pub struct Timer {
    min_interval: Duration,
    last_fire: Option<Instant>,
}

impl Timer {
    /// Create a timer admitting `rate` events per second.
    pub fn new(rate: u32) -> Self {
        Self::with_period(rate, Duration::from_secs(1))
    }

    /// Create a timer admitting `rate` events per `period`.
    pub fn with_period(rate: u32, period: Duration) -> Self {
        Self {
            min_interval: period / rate.max(1),
            last_fire: None,
        }
    }

    /// Run `action` if enough time has elapsed since the last executed
    /// action. Returns whether the action ran.
    pub fn tick(&mut self, action: impl FnOnce()) -> bool {
        self.tick_at(Instant::now(), action)
    }

    /// Clear the last-fire mark so the next `tick` always fires.
    pub fn reset(&mut self) {
        self.last_fire = None;
    }

    fn tick_at(&mut self, now: Instant, action: impl FnOnce()) -> bool {
        match self.last_fire {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_fire = Some(now);
                action();
                true
            }
        }
    }
}
