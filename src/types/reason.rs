//! Reason codes for session switches and flow transitions

use serde::{Deserialize, Serialize};

/// Reason codes for every session switch and flow transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R100: Session multiplexing
    // =========================================================================
    /// First sighting of a VIP, fresh session
    R101_SESSION_NEW,
    /// VIP returned, suspended session restored
    R102_SESSION_RESTORED,
    /// Guest became active, fresh throwaway session
    R103_SESSION_GUEST,
    /// Same owner still in front of the kiosk
    R104_SESSION_MAINTAINED,
    /// No face this tick, active session left alone
    R105_SESSION_DEBOUNCED,
    /// Nothing active and nobody in view
    R106_SESSION_IDLE,

    // =========================================================================
    // R200: Flow transitions
    // =========================================================================
    /// Flow (re)started at selection
    R201_FLOW_RESET,
    /// Waste category picked
    R202_BOX_SELECTED,
    /// Walk-to-box time elapsed
    R203_BOX_TIMEOUT,
    /// Away subject came back to the kiosk
    R204_WELCOME_BACK,
    /// Thank-you hold elapsed
    R205_THANK_YOU_TIMEOUT,
    /// Subject wants to learn more
    R206_LEARN_MORE_YES,
    /// Subject skipped learning
    R207_LEARN_MORE_NO,
    /// Subject left the game for feedback
    R208_GAME_DONE,
    /// Rating 1-4 submitted, flow ends
    R209_RATING_SUBMITTED,
    /// Rating 5 submitted, photo offered
    R210_RATING_FIVE_STARS,
    /// Photo accepted, countdown started
    R211_PHOTO_ACCEPTED,
    /// Photo declined, flow ends
    R212_PHOTO_DECLINED,
    /// Countdown done, photo captured
    R213_PHOTO_TAKEN,
    /// Rehydrated from a suspended snapshot
    R214_FLOW_RESTORED,

    // =========================================================================
    // R300: Rejections
    // =========================================================================
    /// Submit pressed without a rating
    R301_RATING_REQUIRED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R101_SESSION_NEW => "R101_SESSION_NEW",
            Self::R102_SESSION_RESTORED => "R102_SESSION_RESTORED",
            Self::R103_SESSION_GUEST => "R103_SESSION_GUEST",
            Self::R104_SESSION_MAINTAINED => "R104_SESSION_MAINTAINED",
            Self::R105_SESSION_DEBOUNCED => "R105_SESSION_DEBOUNCED",
            Self::R106_SESSION_IDLE => "R106_SESSION_IDLE",
            Self::R201_FLOW_RESET => "R201_FLOW_RESET",
            Self::R202_BOX_SELECTED => "R202_BOX_SELECTED",
            Self::R203_BOX_TIMEOUT => "R203_BOX_TIMEOUT",
            Self::R204_WELCOME_BACK => "R204_WELCOME_BACK",
            Self::R205_THANK_YOU_TIMEOUT => "R205_THANK_YOU_TIMEOUT",
            Self::R206_LEARN_MORE_YES => "R206_LEARN_MORE_YES",
            Self::R207_LEARN_MORE_NO => "R207_LEARN_MORE_NO",
            Self::R208_GAME_DONE => "R208_GAME_DONE",
            Self::R209_RATING_SUBMITTED => "R209_RATING_SUBMITTED",
            Self::R210_RATING_FIVE_STARS => "R210_RATING_FIVE_STARS",
            Self::R211_PHOTO_ACCEPTED => "R211_PHOTO_ACCEPTED",
            Self::R212_PHOTO_DECLINED => "R212_PHOTO_DECLINED",
            Self::R213_PHOTO_TAKEN => "R213_PHOTO_TAKEN",
            Self::R214_FLOW_RESTORED => "R214_FLOW_RESTORED",
            Self::R301_RATING_REQUIRED => "R301_RATING_REQUIRED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R101_SESSION_NEW => "New VIP session",
            Self::R102_SESSION_RESTORED => "VIP session restored",
            Self::R103_SESSION_GUEST => "Guest session started",
            Self::R104_SESSION_MAINTAINED => "Same subject",
            Self::R105_SESSION_DEBOUNCED => "No face - session kept",
            Self::R106_SESSION_IDLE => "Looking for face",
            Self::R201_FLOW_RESET => "Waiting for selection",
            Self::R202_BOX_SELECTED => "Box selected",
            Self::R203_BOX_TIMEOUT => "Back from the box",
            Self::R204_WELCOME_BACK => "Welcome back",
            Self::R205_THANK_YOU_TIMEOUT => "Offering to learn more",
            Self::R206_LEARN_MORE_YES => "Starting game",
            Self::R207_LEARN_MORE_NO => "Skipping to feedback",
            Self::R208_GAME_DONE => "Game finished",
            Self::R209_RATING_SUBMITTED => "Rating submitted",
            Self::R210_RATING_FIVE_STARS => "Five stars - photo offered",
            Self::R211_PHOTO_ACCEPTED => "Countdown started",
            Self::R212_PHOTO_DECLINED => "Photo declined",
            Self::R213_PHOTO_TAKEN => "Photo taken",
            Self::R214_FLOW_RESTORED => "Flow restored",
            Self::R301_RATING_REQUIRED => "Please select a rating",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
