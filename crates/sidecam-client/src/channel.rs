//! Bounded drop-oldest frame buffer.
//!
//! Decouples frame producers from the outbound network stream: `offer` is
//! synchronous and never blocks, `recv` is the async single-consumer side
//! driven by the frame stream task. On overflow the newest frame displaces
//! the oldest queued one; producers are never back-pressured.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::{ClientError, ClientResult};

/// One frame queued for submission.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image bytes.
    pub payload: Bytes,

    /// Identifier of the producing camera, when known.
    pub camera_id: Option<String>,

    /// Capture time in milliseconds since the Unix epoch, when known.
    pub timestamp_ms: Option<i64>,
}

/// Outcome of a successful [`FrameChannel::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Frame was queued with room to spare.
    Enqueued,

    /// Frame was queued by displacing the oldest queued frame.
    Displaced,
}

struct Inner {
    queue: VecDeque<Frame>,
    closed: bool,
}

/// Bounded single-consumer conduit with drop-oldest overflow.
pub struct FrameChannel {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl FrameChannel {
    /// Create a channel holding at most `capacity` frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be nonzero");
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Queue a frame without blocking.
    ///
    /// Overflow is not an error: when full, the oldest queued frame is
    /// evicted and the offer succeeds. Fails only once the channel is closed.
    pub fn offer(&self, frame: Frame) -> ClientResult<OfferOutcome> {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(ClientError::ChannelClosed);
            }

            let outcome = if inner.queue.len() == self.capacity {
                inner.queue.pop_front();
                OfferOutcome::Displaced
            } else {
                OfferOutcome::Enqueued
            };
            inner.queue.push_back(frame);
            outcome
        };

        if outcome == OfferOutcome::Displaced {
            debug!("Frame buffer full, evicted oldest frame");
        }
        self.notify.notify_one();
        Ok(outcome)
    }

    /// Receive the next frame in FIFO order.
    ///
    /// Returns `None` once the channel is closed and drained. Single-consumer:
    /// only one task may await this at a time.
    pub async fn recv(&self) -> Option<Frame> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(frame) = inner.queue.pop_front() {
                    return Some(frame);
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Close the channel. Queued frames remain receivable; subsequent offers
    /// fail.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_one();
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
