//! Prediction observer boundary.

use std::sync::Arc;

use bytes::Bytes;

use sidecam_proto::{ObservePredictionsResponse, Payload};

/// One inference result received from the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// JSON document.
    Json(String),

    /// Raw binary blob (e.g. an annotated image file).
    Raw(Bytes),

    /// Message carried no payload.
    Empty,
}

impl From<ObservePredictionsResponse> for Prediction {
    fn from(response: ObservePredictionsResponse) -> Self {
        match response.payload {
            Some(Payload::JsonRaw(json)) => Self::Json(json),
            Some(Payload::FileRaw(bytes)) => Self::Raw(Bytes::from(bytes)),
            None => Self::Empty,
        }
    }
}

/// Callback invoked once per received prediction, in server-send order.
///
/// Observers must not block: the inbound stream task delivers at most one
/// prediction in flight and waits for the callback to return before reading
/// the next message. Long-running work must be handed off by the caller.
pub type PredictionObserver = Arc<dyn Fn(Prediction) + Send + Sync>;
