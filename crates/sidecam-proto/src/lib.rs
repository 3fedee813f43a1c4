//! Protobuf contract for the side camera image service.
//!
//! This crate holds the checked-in `.proto` definition, the tonic-generated
//! client and server stubs, and small constructor helpers so callers never
//! hand-assemble optional fields.
//!
//! The wire shape (field numbers, optional presence, oneof payload) is owned
//! by the remote service and must be preserved byte-for-byte.

/// Generated messages and client stub for `sidecam.v1`.
pub mod v1 {
    tonic::include_proto!("sidecam.v1");
}

pub use v1::observe_predictions_response::Payload;
pub use v1::side_camera_image_service_client::SideCameraImageServiceClient;
pub use v1::side_camera_image_service_server::{
    SideCameraImageService, SideCameraImageServiceServer,
};
pub use v1::{ObservePredictionsResponse, SubmitCameraFrameRequest};

impl SubmitCameraFrameRequest {
    /// Build a frame submission request.
    ///
    /// `camera_id` and `timestamp` use proto3 optional presence: when `None`
    /// the field is absent on the wire and the server's `HasField` check
    /// reports it unset.
    pub fn new(
        image_data: impl Into<Vec<u8>>,
        camera_id: Option<String>,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            image_data: image_data.into(),
            camera_id,
            timestamp,
        }
    }
}

impl ObservePredictionsResponse {
    /// Size in bytes of whichever payload variant is set, if any.
    pub fn payload_len(&self) -> Option<usize> {
        match &self.payload {
            Some(Payload::JsonRaw(json)) => Some(json.len()),
            Some(Payload::FileRaw(bytes)) => Some(bytes.len()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_request_optional_fields_absent() {
        let request = SubmitCameraFrameRequest::new(vec![1, 2, 3], None, None);
        assert_eq!(request.image_data, vec![1, 2, 3]);
        assert!(request.camera_id.is_none());
        assert!(request.timestamp.is_none());
    }

    #[test]
    fn test_request_round_trip() {
        let request =
            SubmitCameraFrameRequest::new(vec![0u8; 4], Some("cam-0".to_string()), Some(1000));
        let bytes = request.encode_to_vec();
        let decoded = SubmitCameraFrameRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_payload_len() {
        let json = ObservePredictionsResponse {
            payload: Some(Payload::JsonRaw("{}".to_string())),
        };
        assert_eq!(json.payload_len(), Some(2));

        let empty = ObservePredictionsResponse { payload: None };
        assert_eq!(empty.payload_len(), None);
    }
}
