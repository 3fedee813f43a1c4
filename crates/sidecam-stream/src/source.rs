//! Frame source and processor traits.

use std::sync::Arc;

use bytes::Bytes;

use crate::frame::FrameMetadata;
use crate::{StreamResult, DEFAULT_FPS};

/// Receives frames pushed by a [`FrameSource`].
///
/// Implementations must return quickly; a source delivers frames from its own
/// capture context and a slow processor delays subsequent frames.
pub trait FrameProcessor: Send + Sync {
    /// Handle one frame. `payload` holds encoded image bytes.
    fn process(&self, payload: Bytes, metadata: &FrameMetadata);
}

impl<F> FrameProcessor for F
where
    F: Fn(Bytes, &FrameMetadata) + Send + Sync,
{
    fn process(&self, payload: Bytes, metadata: &FrameMetadata) {
        self(payload, metadata);
    }
}

/// Something that produces frames: a camera, a file replayer, a test stub.
pub trait FrameSource: Send {
    /// Start pushing frames to `processor` until [`stop`](Self::stop).
    fn start(&mut self, processor: Arc<dyn FrameProcessor>) -> StreamResult<()>;

    /// Stop producing frames and release the capture context.
    fn stop(&mut self) -> StreamResult<()>;

    /// Whether the source is currently producing frames.
    fn is_active(&self) -> bool;
}

/// Configuration for a frame source.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Target frames per second submitted downstream, independent of the
    /// source's native capture rate.
    pub fps: u32,

    /// Number of frames the capture side may hold in flight.
    pub max_pending: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            max_pending: 3,
        }
    }
}
