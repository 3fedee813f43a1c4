//! Demo host for the side camera streaming client.
//!
//! Replays encoded image assets from a directory to a remote inference
//! service and prints received JSON predictions, until Ctrl-C.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use tracing::{info, warn};

use sidecam_client::{Endpoint, Prediction, SideCameraClient};
use sidecam_stream::{FrameMetadata, FrameProcessor, FrameSource, ReplaySource, StreamConfig};

#[derive(Debug, Parser)]
#[command(name = "sidecam", about = "Stream image assets to an inference service")]
struct Args {
    /// Directory of encoded image files to replay in a loop.
    assets: PathBuf,

    /// Service hostname or IP address.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Service port.
    #[arg(long, default_value_t = 50051)]
    port: u16,

    /// Negotiate TLS on the transport.
    #[arg(long)]
    tls: bool,

    /// Frames per second to submit.
    #[arg(long, default_value_t = sidecam_stream::DEFAULT_FPS)]
    fps: u32,

    /// Camera identifier attached to each frame.
    #[arg(long, default_value = "cam-0")]
    camera_id: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let endpoint = Endpoint::new(args.host, args.port, args.tls)?;

    let client = Arc::new(SideCameraClient::new(
        endpoint,
        Arc::new(|prediction| match prediction {
            Prediction::Json(json) => println!("{json}"),
            Prediction::Raw(bytes) => info!(size = bytes.len(), "Received binary prediction"),
            Prediction::Empty => {}
        }),
    ));
    client.connect().await?;

    let submitter = Arc::clone(&client);
    let processor = Arc::new(move |payload: Bytes, metadata: &FrameMetadata| {
        if let Err(e) = submitter.submit_frame(
            payload,
            Some(metadata.camera_id.clone()),
            Some(metadata.timestamp_ms),
        ) {
            warn!("Frame submission failed: {e}");
        }
    });

    let config = StreamConfig {
        fps: args.fps,
        ..StreamConfig::default()
    };
    let mut source = ReplaySource::from_dir(&args.assets, args.camera_id, config)?;
    source.start(processor as Arc<dyn FrameProcessor>)?;

    info!("Streaming, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    source.stop()?;
    client.close().await;

    let stats = client.statistics();
    info!(
        submitted = stats.frames_submitted,
        evicted = stats.frames_evicted,
        sent = stats.frames_sent,
        predictions = stats.predictions_received,
        "Session finished"
    );
    Ok(())
}
