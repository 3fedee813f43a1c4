//! Frame sources for the side camera client.
//!
//! This crate defines the collaborator shape the streaming client depends on:
//! something that pushes encoded frames plus metadata into a processor
//! callback until stopped. It also provides the fps rate gate and a replay
//! source that streams pre-encoded image assets for testing without camera
//! hardware.

mod error;
mod frame;
mod replay;
mod source;
mod timer;

pub use error::StreamError;
pub use frame::FrameMetadata;
pub use replay::ReplaySource;
pub use source::{FrameProcessor, FrameSource, StreamConfig};
pub use timer::Timer;

/// Default frame submission rate in frames per second.
pub const DEFAULT_FPS: u32 = 5;

/// Result type for frame source operations.
pub type StreamResult<T> = Result<T, StreamError>;
