//! Streaming client lifecycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint as TonicEndpoint};
use tracing::{debug, error, info, instrument, warn};

use sidecam_proto::{SideCameraImageServiceClient, SubmitCameraFrameRequest};

use crate::channel::{Frame, FrameChannel, OfferOutcome};
use crate::config::Endpoint;
use crate::connection::{BackoffPolicy, ConnectionState};
use crate::prediction::{Prediction, PredictionObserver};
use crate::supervisor::auto_reconnect;
use crate::{ClientError, ClientResult, FRAME_CHANNEL_CAPACITY, SHUTDOWN_TIMEOUT_SECS};

/// Counters exposed to the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientStatistics {
    /// Frames accepted by `submit_frame`.
    pub frames_submitted: u64,

    /// Frames evicted from the buffer by newer submissions.
    pub frames_evicted: u64,

    /// Frames handed to the outbound stream call.
    pub frames_sent: u64,

    /// Predictions delivered to the observer.
    pub predictions_received: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_submitted: AtomicU64,
    frames_evicted: AtomicU64,
    frames_sent: AtomicU64,
    predictions_received: AtomicU64,
}

/// Everything owned by one live connection. Created whole by `connect`,
/// taken whole by `close`, so a close racing a connect can never observe a
/// half-built transport.
struct ActiveConnection {
    frames: Arc<FrameChannel>,
    shutdown_tx: watch::Sender<bool>,
    outbound: JoinHandle<()>,
    inbound: JoinHandle<()>,
}

/// Client for the side camera image service.
///
/// Owns one logical connection and two supervised stream tasks: the outbound
/// frame drain and the inbound prediction observer. The tasks fail and
/// reconnect independently; only `connect`/`close` move the connection state.
pub struct SideCameraClient {
    endpoint: Endpoint,
    observer: PredictionObserver,
    backoff: BackoffPolicy,
    lifecycle: tokio::sync::Mutex<Option<ActiveConnection>>,
    // Producer-side handle to the live frame buffer; read by `submit_frame`
    // without touching the lifecycle lock.
    frames: Mutex<Option<Arc<FrameChannel>>>,
    state_tx: watch::Sender<ConnectionState>,
    counters: Arc<Counters>,
}

impl SideCameraClient {
    /// Create a client for `endpoint`, delivering predictions to `observer`.
    pub fn new(endpoint: Endpoint, observer: PredictionObserver) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            endpoint,
            observer,
            backoff: BackoffPolicy::default(),
            lifecycle: tokio::sync::Mutex::new(None),
            frames: Mutex::new(None),
            state_tx,
            counters: Arc::new(Counters::default()),
        }
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Establish the transport and start both stream tasks.
    ///
    /// Idempotent: a no-op when already connected. A transport construction
    /// failure is returned to the caller and leaves the client Disconnected;
    /// failures after this point are handled by the per-stream supervisors
    /// and never surface here.
    #[instrument(name = "connect", skip(self), fields(endpoint = %self.endpoint))]
    pub async fn connect(&self) -> ClientResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            debug!("Already connected, skipping");
            return Ok(());
        }

        info!("Connecting");
        self.set_state(ConnectionState::Connecting);

        let channel = match self.build_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                error!("Connect failed: {e}");
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let frames = Arc::new(FrameChannel::new(FRAME_CHANNEL_CAPACITY));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stub = SideCameraImageServiceClient::new(channel);

        let outbound = tokio::spawn(run_outbound(
            stub.clone(),
            Arc::clone(&frames),
            shutdown_rx.clone(),
            self.backoff.clone(),
            Arc::clone(&self.counters),
        ));
        let inbound = tokio::spawn(run_inbound(
            stub,
            Arc::clone(&self.observer),
            shutdown_rx,
            self.backoff.clone(),
            Arc::clone(&self.counters),
        ));

        *self.frames.lock() = Some(Arc::clone(&frames));
        *lifecycle = Some(ActiveConnection {
            frames,
            shutdown_tx,
            outbound,
            inbound,
        });

        self.set_state(ConnectionState::Connected);
        info!("Connected, frame stream and prediction observer started");
        Ok(())
    }

    async fn build_channel(&self) -> ClientResult<Channel> {
        let mut transport = TonicEndpoint::from_shared(self.endpoint.uri())
            .map_err(|e| ClientError::InvalidEndpoint(e.to_string()))?
            .connect_timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS));

        if self.endpoint.use_tls {
            transport = transport.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }

        Ok(transport.connect().await?)
    }

    /// Queue a frame for submission.
    ///
    /// Non-blocking and O(1): the frame lands in the drop-oldest buffer and
    /// the outbound task ships it as the network allows. Displacing an older
    /// queued frame is success; the only failure is a dead buffer (not
    /// connected, or closed).
    pub fn submit_frame(
        &self,
        payload: Bytes,
        camera_id: Option<String>,
        timestamp_ms: Option<i64>,
    ) -> ClientResult<()> {
        let frames = self
            .frames
            .lock()
            .clone()
            .ok_or(ClientError::NotConnected)?;

        let outcome = frames.offer(Frame {
            payload,
            camera_id,
            timestamp_ms,
        })?;

        self.counters.frames_submitted.fetch_add(1, Ordering::Relaxed);
        if outcome == OfferOutcome::Displaced {
            self.counters.frames_evicted.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Cancel both stream tasks and tear down the transport.
    ///
    /// Idempotent: a no-op when not connected. Waits up to five seconds for
    /// the tasks to wind down, then aborts them; shutdown is best-effort and
    /// always leaves the client ready for a fresh `connect`.
    #[instrument(name = "close", skip(self))]
    pub async fn close(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(connection) = lifecycle.take() else {
            debug!("Already disconnected, skipping");
            return;
        };

        info!("Disconnecting");
        *self.frames.lock() = None;

        let ActiveConnection {
            frames,
            shutdown_tx,
            mut outbound,
            mut inbound,
        } = connection;

        // Ends the outbound call normally once the buffer drains; the watch
        // signal interrupts the inbound stream and any backoff wait.
        frames.close();
        let _ = shutdown_tx.send(true);

        let graceful = futures::future::join(&mut outbound, &mut inbound);
        if timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), graceful)
            .await
            .is_err()
        {
            warn!("Graceful shutdown timed out, forcing teardown");
            outbound.abort();
            inbound.abort();
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Disconnected");
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the client counters.
    pub fn statistics(&self) -> ClientStatistics {
        ClientStatistics {
            frames_submitted: self.counters.frames_submitted.load(Ordering::Relaxed),
            frames_evicted: self.counters.frames_evicted.load(Ordering::Relaxed),
            frames_sent: self.counters.frames_sent.load(Ordering::Relaxed),
            predictions_received: self.counters.predictions_received.load(Ordering::Relaxed),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(previous = previous.name(), current = state.name(), "State transition");
        }
    }
}

impl Drop for SideCameraClient {
    fn drop(&mut self) {
        // Best-effort teardown when dropped without a close().
        if let Ok(mut lifecycle) = self.lifecycle.try_lock() {
            if let Some(connection) = lifecycle.take() {
                connection.frames.close();
                let _ = connection.shutdown_tx.send(true);
                connection.outbound.abort();
                connection.inbound.abort();
            }
        }
    }
}

/// Supervised outbound task: drains the frame buffer into the
/// client-streaming submission call, re-opening the call on failure.
async fn run_outbound(
    stub: SideCameraImageServiceClient<Channel>,
    frames: Arc<FrameChannel>,
    shutdown: watch::Receiver<bool>,
    backoff: BackoffPolicy,
    counters: Arc<Counters>,
) {
    auto_reconnect("frame stream", backoff, shutdown, move || {
        let mut stub = stub.clone();
        let frames = Arc::clone(&frames);
        let counters = Arc::clone(&counters);
        async move {
            let outbound = futures::stream::unfold(frames, move |frames| {
                let counters = Arc::clone(&counters);
                async move {
                    let frame = frames.recv().await?;
                    counters.frames_sent.fetch_add(1, Ordering::Relaxed);
                    let request = SubmitCameraFrameRequest::new(
                        frame.payload,
                        frame.camera_id,
                        frame.timestamp_ms,
                    );
                    Some((request, frames))
                }
            });

            stub.submit_side_camera_image(outbound).await.map(|_| ())
        }
    })
    .await;
}

/// Supervised inbound task: opens the server-streaming prediction call and
/// delivers each message to the observer, re-opening the call on failure.
async fn run_inbound(
    stub: SideCameraImageServiceClient<Channel>,
    observer: PredictionObserver,
    shutdown: watch::Receiver<bool>,
    backoff: BackoffPolicy,
    counters: Arc<Counters>,
) {
    auto_reconnect("prediction observer", backoff, shutdown, move || {
        let mut stub = stub.clone();
        let observer = Arc::clone(&observer);
        let counters = Arc::clone(&counters);
        async move {
            let mut stream = stub
                .observe_predictions(())
                .await?
                .into_inner();

            while let Some(response) = stream.message().await? {
                counters.predictions_received.fetch_add(1, Ordering::Relaxed);

                let prediction = Prediction::from(response);
                match &prediction {
                    Prediction::Json(json) => {
                        info!(size = json.len(), "Prediction: JSON");
                        debug!(%json);
                    }
                    Prediction::Raw(bytes) => info!(size = bytes.len(), "Prediction: file"),
                    Prediction::Empty => info!("Prediction received with no payload"),
                }
                observer(prediction);
            }
            Ok::<(), tonic::Status>(())
        }
    })
    .await;
}
