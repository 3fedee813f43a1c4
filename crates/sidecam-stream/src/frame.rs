//! Frame metadata types.

/// Metadata accompanying one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    /// Identifier of the producing camera.
    pub camera_id: String,

    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,

    /// Frame width in pixels. Zero when the source streams pre-encoded
    /// payloads and the dimensions are not known without decoding.
    pub width: u32,

    /// Frame height in pixels. Zero when unknown, see `width`.
    pub height: u32,
}
