//! Camera frames and the records handed to the persistence collaborator

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::VipId;

/// One encoded camera frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// MIME type of `data`
    pub mime: String,
    /// When the frame was grabbed
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// JPEG frame stamped with the current time
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            mime: "image/jpeg".to_string(),
            captured_at: Utc::now(),
        }
    }

    /// `data:` URL as expected by the recognition service
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.data))
    }
}

/// Photo taken at the end of the countdown
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCaptureRequest {
    /// Latest sampled frame (none if the camera never delivered one)
    pub frame: Option<Frame>,
    /// Active VIP, none for guests
    pub vip_id: Option<VipId>,
    pub timestamp: DateTime<Utc>,
}

/// Submitted star rating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRecord {
    pub rating: u8,
    pub vip_id: Option<VipId>,
    pub timestamp: DateTime<Utc>,
}
