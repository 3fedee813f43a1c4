//! Replay frame source for testing without camera hardware.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::frame::FrameMetadata;
use crate::source::{FrameProcessor, FrameSource, StreamConfig};
use crate::timer::Timer;
use crate::{StreamError, StreamResult};

/// Simulated native delivery rate of the replay worker. The [`Timer`] gates
/// this down to the configured fps, the same way a camera's capture callback
/// rate is throttled.
const NATIVE_INTERVAL: Duration = Duration::from_millis(33);

/// Streams a fixed set of pre-encoded image payloads in a loop, at the
/// configured fps, from a dedicated worker thread.
pub struct ReplaySource {
    camera_id: String,
    config: StreamConfig,
    frames: Vec<Bytes>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySource {
    /// Create a replay source over in-memory payloads.
    pub fn new(frames: Vec<Bytes>, camera_id: impl Into<String>, config: StreamConfig) -> Self {
        Self {
            camera_id: camera_id.into(),
            config,
            frames,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Load every regular file under `dir` (sorted by name) as one frame
    /// payload each. Files are treated as opaque encoded image bytes.
    pub fn from_dir(
        dir: impl AsRef<Path>,
        camera_id: impl Into<String>,
        config: StreamConfig,
    ) -> StreamResult<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            frames.push(Bytes::from(fs::read(path)?));
        }

        if frames.is_empty() {
            return Err(StreamError::NoFrames(dir.display().to_string()));
        }

        info!(count = frames.len(), dir = %dir.display(), "Loaded replay frames");
        Ok(Self::new(frames, camera_id, config))
    }
}

impl FrameSource for ReplaySource {
    fn start(&mut self, processor: Arc<dyn FrameProcessor>) -> StreamResult<()> {
        if self.is_active() {
            return Err(StreamError::AlreadyStarted);
        }
        if self.frames.is_empty() {
            return Err(StreamError::NoFrames("<memory>".to_string()));
        }

        info!(
            camera_id = %self.camera_id,
            fps = self.config.fps,
            frames = self.frames.len(),
            "Starting replay source"
        );

        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let frames = self.frames.clone();
        let camera_id = self.camera_id.clone();
        let mut timer = Timer::new(self.config.fps);

        let handle = thread::spawn(move || {
            let mut index = 0usize;
            while running.load(Ordering::SeqCst) {
                timer.tick(|| {
                    let payload = frames[index].clone();
                    index = (index + 1) % frames.len();

                    let metadata = FrameMetadata {
                        camera_id: camera_id.clone(),
                        timestamp_ms: now_ms(),
                        width: 0,
                        height: 0,
                    };
                    processor.process(payload, &metadata);
                });
                thread::sleep(NATIVE_INTERVAL);
            }
            debug!(camera_id = %camera_id, "Replay worker stopped");
        });

        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> StreamResult<()> {
        if !self.is_active() {
            return Err(StreamError::NotStarted);
        }

        debug!(camera_id = %self.camera_id, "Stopping replay source");
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Replay worker panicked");
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        if self.is_active() {
            let _ = self.stop();
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
