//! Capability traits for the kiosk's external collaborators

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CaptureError, ClassifierError, SinkError};
use crate::types::{Detection, FaceCoords, Frame, PhotoCaptureRequest, RatingRecord};

/// Camera or any other frame producer
pub trait FrameSource: Send + Sync {
    /// Is a frame available right now?
    fn is_ready(&self) -> bool;

    /// Grab the current frame. Must not block.
    fn capture(&self) -> Result<Frame, CaptureError>;
}

/// Recognition service
#[async_trait]
pub trait IdentityClassifier: Send + Sync {
    /// `Ok(Detection::NoFace)` when the service found nobody
    async fn classify(&self, frame: &Frame) -> Result<Detection, ClassifierError>;
}

/// Persistence collaborator for photos and ratings. Fire-and-forget.
#[async_trait]
pub trait PhotoSink: Send + Sync {
    async fn save_photo(&self, request: PhotoCaptureRequest) -> Result<(), SinkError>;

    async fn save_rating(&self, record: RatingRecord) -> Result<(), SinkError>;
}

/// Visual overlay drawn over the camera view (face box)
pub trait Overlay: Send + Sync {
    fn show_face(&self, coords: Option<FaceCoords>);

    fn clear(&self);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl PhotoSink for LogSink {
    async fn save_photo(&self, request: PhotoCaptureRequest) -> Result<(), SinkError> {
        debug!(
            vip = ?request.vip_id,
            bytes = request.frame.as_ref().map(|f| f.data.len()).unwrap_or(0),
            "photo taken"
        );
        Ok(())
    }

    async fn save_rating(&self, record: RatingRecord) -> Result<(), SinkError> {
        debug!(vip = ?record.vip_id, rating = record.rating, "rating submitted");
        Ok(())
    }
}

/// Overlay for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn show_face(&self, _coords: Option<FaceCoords>) {}

    fn clear(&self) {}
}
