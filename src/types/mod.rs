//! Core types for the kiosk

mod state;
mod identity;
mod flow;
mod output;
mod reason;
mod capture;
mod snapshot;

pub use state::FlowState;
pub use identity::{Gender, FaceCoords, Classification, Detection, VipId, Owner, OwnerKind};
pub use flow::{BoxId, FlowInput, FlowEvent};
pub use output::SessionView;
pub use reason::ReasonCode;
pub use capture::{Frame, PhotoCaptureRequest, RatingRecord};
pub use snapshot::{SessionSnapshot, ObserveOutcome};
