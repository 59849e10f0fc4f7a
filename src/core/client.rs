//! HTTP client for the recognition service and its persistence endpoints
//!
//! - POST /detect-face  {image}                   → {gender, age, ...} | {error}
//! - POST /save-photo   {photo, vipId, timestamp}
//! - POST /save-rating  {rating, vipId, timestamp}
//! - GET  /test                                   → liveness

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::boundary::{IdentityClassifier, PhotoSink};
use crate::error::{ClassifierError, SinkError};
use crate::types::{Classification, Detection, Frame, PhotoCaptureRequest, RatingRecord, VipId};

#[derive(Debug, Serialize)]
struct DetectRequest {
    image: String,
}

/// `{error}` means no usable face
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetectResponse {
    Error { error: String },
    Face(Classification),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePhotoRequest {
    photo: String,
    vip_id: Option<VipId>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRatingRequest {
    rating: u8,
    vip_id: Option<VipId>,
    timestamp: String,
}

/// Recognition service client
#[derive(Debug, Clone)]
pub struct RecognitionClient {
    client: Client,
    base_url: String,
}

impl RecognitionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Is the service answering?
    pub async fn health(&self) -> bool {
        let url = format!("{}/test", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("Recognition service health check failed: {}", e);
                false
            }
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        self.client.post(&url).json(body).send().await
    }
}

#[async_trait]
impl IdentityClassifier for RecognitionClient {
    async fn classify(&self, frame: &Frame) -> Result<Detection, ClassifierError> {
        let request = DetectRequest {
            image: frame.to_data_url(),
        };
        let response = self.post_json("/detect-face", &request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match response.json::<DetectResponse>().await? {
            DetectResponse::Face(c) => {
                debug!(gender = %c.gender, age = c.age, "face detected");
                Ok(Detection::Face(c))
            }
            DetectResponse::Error { error } => {
                debug!(%error, "no face");
                Ok(Detection::NoFace)
            }
        }
    }
}

#[async_trait]
impl PhotoSink for RecognitionClient {
    async fn save_photo(&self, request: PhotoCaptureRequest) -> Result<(), SinkError> {
        let frame = request.frame.ok_or(SinkError::NoFrame)?;
        let body = SavePhotoRequest {
            photo: frame.to_data_url(),
            vip_id: request.vip_id,
            timestamp: request.timestamp.to_rfc3339(),
        };
        let response = self.post_json("/save-photo", &body).await?;
        check_status(response).await
    }

    async fn save_rating(&self, record: RatingRecord) -> Result<(), SinkError> {
        let body = SaveRatingRequest {
            rating: record.rating,
            vip_id: record.vip_id,
            timestamp: record.timestamp.to_rfc3339(),
        };
        let response = self.post_json("/save-rating", &body).await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Gender;

    #[test]
    fn test_client_creation_trims_slash() {
        let client = RecognitionClient::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_detect_response_face() {
        let json = r#"{"gender": "Male", "age": 27, "confidence": 0.91, "face_coords": {"x": 10, "y": 20, "width": 100, "height": 120}}"#;
        match serde_json::from_str::<DetectResponse>(json).unwrap() {
            DetectResponse::Face(c) => {
                assert_eq!(c.gender, Gender::Male);
                assert_eq!(c.age, 27);
                assert_eq!(c.confidence, Some(0.91));
                assert_eq!(c.face_coords.unwrap().width, 100);
            }
            other => panic!("expected face, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_response_error() {
        let json = r#"{"error": "No face detected"}"#;
        assert!(matches!(
            serde_json::from_str::<DetectResponse>(json).unwrap(),
            DetectResponse::Error { .. }
        ));
    }

    #[test]
    fn test_save_photo_body_uses_camel_case() {
        let body = SavePhotoRequest {
            photo: "data:image/jpeg;base64,AA==".to_string(),
            vip_id: Some(VipId(2)),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["vipId"], 2);
        assert!(json.get("vip_id").is_none());
    }
}
