//! Inputs into and events out of the flow engine

use serde::{Deserialize, Serialize};
use crate::types::{FlowState, ReasonCode};

/// Identifier of a physical collection box ("1", "2", "batteries", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(pub String);

impl BoxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// User actions coming from the touch screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowInput {
    /// Waste category button
    SelectBox { box_id: BoxId },
    /// Yes/No on the learn-more panel
    LearnMore { yes: bool },
    /// "Give feedback" button on the game panel
    ProceedToFeedback,
    /// Star tapped (1..=5)
    SetRating { rating: u8 },
    /// Submit button on the feedback panel
    SubmitRating,
    /// Yes/No on the photo panel
    Photo { yes: bool },
}

impl FlowInput {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            FlowInput::SelectBox { .. } => "select_box",
            FlowInput::LearnMore { .. } => "learn_more",
            FlowInput::ProceedToFeedback => "proceed_to_feedback",
            FlowInput::SetRating { .. } => "set_rating",
            FlowInput::SubmitRating => "submit_rating",
            FlowInput::Photo { .. } => "photo",
        }
    }
}

/// Something the view layer or a collaborator needs to know about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    /// A new panel should be shown
    StateEntered { state: FlowState, reason: ReasonCode },
    /// Countdown digit to display
    CountdownTick { remaining: u8 },
    /// Submit pressed without a rating
    RatingRequired,
    /// Rating accepted, to be persisted
    RatingSubmitted { rating: u8 },
    /// Countdown done, capture the current frame
    PhotoRequested,
}
