//! End-to-end lifecycle tests against an in-process gRPC server.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

use sidecam_client::{
    ClientError, ConnectionState, Endpoint, Prediction, SideCameraClient,
};
use sidecam_proto::{
    ObservePredictionsResponse, Payload, SideCameraImageService, SideCameraImageServiceServer,
    SubmitCameraFrameRequest,
};

type PredictionStream =
    Pin<Box<dyn Stream<Item = Result<ObservePredictionsResponse, Status>> + Send>>;

/// Service double: forwards every submitted frame to a channel and replays a
/// fixed prediction script per observer attempt.
struct TestService {
    frames_tx: mpsc::UnboundedSender<SubmitCameraFrameRequest>,
    predictions: Vec<ObservePredictionsResponse>,
    observe_attempts: Arc<AtomicU32>,
    /// Fail the first N observe calls with an error status.
    fail_observe_calls: u32,
}

#[tonic::async_trait]
impl SideCameraImageService for TestService {
    async fn submit_side_camera_image(
        &self,
        request: Request<Streaming<SubmitCameraFrameRequest>>,
    ) -> Result<Response<()>, Status> {
        let mut stream = request.into_inner();
        while let Some(frame) = stream.message().await? {
            let _ = self.frames_tx.send(frame);
        }
        Ok(Response::new(()))
    }

    type ObservePredictionsStream = PredictionStream;

    async fn observe_predictions(
        &self,
        _request: Request<()>,
    ) -> Result<Response<Self::ObservePredictionsStream>, Status> {
        let attempt = self.observe_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_observe_calls {
            return Err(Status::unavailable("prediction stream not ready"));
        }

        let script: Vec<Result<ObservePredictionsResponse, Status>> =
            self.predictions.iter().cloned().map(Ok).collect();
        // Keep the stream open after the script so normal completion does not
        // end the client's observer loop mid-test.
        let stream = futures::stream::iter(script).chain(futures::stream::pending());
        Ok(Response::new(Box::pin(stream)))
    }
}

async fn spawn_server(service: TestService) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let incoming = futures::stream::unfold(listener, |listener| async move {
        let accepted = listener.accept().await.map(|(socket, _)| socket);
        Some((accepted, listener))
    });

    tokio::spawn(
        Server::builder()
            .add_service(SideCameraImageServiceServer::new(service))
            .serve_with_incoming(incoming),
    );
    addr
}

fn json_prediction(body: &str) -> ObservePredictionsResponse {
    ObservePredictionsResponse {
        payload: Some(Payload::JsonRaw(body.to_string())),
    }
}

async fn wait_for<T>(
    mut probe: impl FnMut() -> Option<T>,
    deadline: Duration,
    what: &str,
) -> T {
    let start = tokio::time::Instant::now();
    loop {
        if let Some(value) = probe() {
            return value;
        }
        assert!(start.elapsed() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_lifecycle_round_trip() {
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(TestService {
        frames_tx,
        predictions: vec![json_prediction("{\"label\":\"apple\"}")],
        observe_attempts: Arc::new(AtomicU32::new(0)),
        fail_observe_calls: 0,
    })
    .await;

    let observed: Arc<Mutex<Vec<Prediction>>> = Arc::new(Mutex::new(Vec::new()));
    let observer_sink = Arc::clone(&observed);
    let client = SideCameraClient::new(
        Endpoint::new(addr.ip().to_string(), addr.port(), false).unwrap(),
        Arc::new(move |prediction| observer_sink.lock().push(prediction)),
    );

    assert_eq!(client.state(), ConnectionState::Disconnected);
    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    // Frame goes out through the buffer and lands on the server.
    client
        .submit_frame(Bytes::from_static(&[0; 4]), Some("cam-0".to_string()), Some(1000))
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv())
        .await
        .expect("frame should reach the server")
        .unwrap();
    assert_eq!(received.image_data, vec![0; 4]);
    assert_eq!(received.camera_id.as_deref(), Some("cam-0"));
    assert_eq!(received.timestamp, Some(1000));

    // Prediction comes back through the observer.
    let prediction = wait_for(
        || observed.lock().first().cloned(),
        Duration::from_secs(5),
        "prediction delivery",
    )
    .await;
    assert_eq!(prediction, Prediction::Json("{\"label\":\"apple\"}".to_string()));

    let stats = client.statistics();
    assert_eq!(stats.frames_submitted, 1);
    assert_eq!(stats.predictions_received, 1);

    // Close cancels both tasks and rejects further submissions.
    client.close().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(matches!(
        client.submit_frame(Bytes::from_static(&[1]), None, None),
        Err(ClientError::NotConnected)
    ));

    // The lifecycle round-trips: a fresh connect works after close.
    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
    client.close().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let (frames_tx, _frames_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(TestService {
        frames_tx,
        predictions: Vec::new(),
        observe_attempts: Arc::new(AtomicU32::new(0)),
        fail_observe_calls: 0,
    })
    .await;

    let client = SideCameraClient::new(
        Endpoint::new(addr.ip().to_string(), addr.port(), false).unwrap(),
        Arc::new(|_| {}),
    );

    client.connect().await.unwrap();
    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_inbound_stream_failure_retries_independently() {
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    let observe_attempts = Arc::new(AtomicU32::new(0));
    let addr = spawn_server(TestService {
        frames_tx,
        predictions: vec![json_prediction("{}")],
        observe_attempts: Arc::clone(&observe_attempts),
        fail_observe_calls: 1,
    })
    .await;

    let observed: Arc<Mutex<Vec<Prediction>>> = Arc::new(Mutex::new(Vec::new()));
    let observer_sink = Arc::clone(&observed);
    let client = SideCameraClient::new(
        Endpoint::new(addr.ip().to_string(), addr.port(), false).unwrap(),
        Arc::new(move |prediction| observer_sink.lock().push(prediction)),
    );

    client.connect().await.unwrap();

    // First observe call fails; the supervisor retries after its 1s floor
    // delay and the second call delivers the prediction.
    let prediction = wait_for(
        || observed.lock().first().cloned(),
        Duration::from_secs(10),
        "prediction after inbound retry",
    )
    .await;
    assert_eq!(prediction, Prediction::Json("{}".to_string()));
    assert!(observe_attempts.load(Ordering::SeqCst) >= 2);

    // The outbound stream kept flowing throughout the inbound outage.
    client
        .submit_frame(Bytes::from_static(&[7]), None, None)
        .unwrap();
    let received = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv())
        .await
        .expect("frame should reach the server")
        .unwrap();
    assert_eq!(received.image_data, vec![7]);

    client.close().await;
}
