//! Flow state definitions

use colored::Color;
use serde::{Deserialize, Serialize};

/// The nodes of the kiosk interaction script.
///
/// Serialized with the panel ids the view layer shows/hides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    /// Initial state, waiting for the subject to pick a waste category
    #[serde(rename = "ewaste-selection")]
    Selection,
    /// Subject is away, walking to the indicated box
    #[serde(rename = "box-instruction")]
    BoxInstruction,
    /// Subject came back from the box
    #[serde(rename = "thank-you")]
    ThankYou,
    /// "Do you want to learn more?"
    #[serde(rename = "learn-more")]
    LearnMore,
    /// Mini game
    #[serde(rename = "game-state")]
    Game,
    /// Star rating
    #[serde(rename = "feedback-state")]
    Feedback,
    /// "Take a photo with us?" (5-star raters only)
    #[serde(rename = "photo-state")]
    PhotoPrompt,
    /// 3-2-1 before the shutter
    #[serde(rename = "countdown-state")]
    Countdown,
}

impl FlowState {
    pub const ALL: [FlowState; 8] = [
        FlowState::Selection,
        FlowState::BoxInstruction,
        FlowState::ThankYou,
        FlowState::LearnMore,
        FlowState::Game,
        FlowState::Feedback,
        FlowState::PhotoPrompt,
        FlowState::Countdown,
    ];

    /// Panel id shown by the view layer
    pub fn panel_id(&self) -> &'static str {
        match self {
            FlowState::Selection => "ewaste-selection",
            FlowState::BoxInstruction => "box-instruction",
            FlowState::ThankYou => "thank-you",
            FlowState::LearnMore => "learn-more",
            FlowState::Game => "game-state",
            FlowState::Feedback => "feedback-state",
            FlowState::PhotoPrompt => "photo-state",
            FlowState::Countdown => "countdown-state",
        }
    }

    /// Look a state up by its panel id
    pub fn from_panel_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.panel_id() == id)
    }

    /// States where the subject is expected to be physically away from the kiosk
    pub fn is_away(&self) -> bool {
        matches!(self, FlowState::BoxInstruction)
    }

    /// Terminal color for display
    pub fn color(&self) -> Color {
        match self {
            FlowState::Selection => Color::BrightBlack,
            FlowState::BoxInstruction | FlowState::ThankYou => Color::Yellow,
            FlowState::LearnMore | FlowState::Game => Color::Cyan,
            FlowState::Feedback => Color::Blue,
            FlowState::PhotoPrompt | FlowState::Countdown => Color::Green,
        }
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            FlowState::Selection => "♻️",
            FlowState::BoxInstruction => "🚶",
            FlowState::ThankYou => "🙏",
            FlowState::LearnMore => "❓",
            FlowState::Game => "🎮",
            FlowState::Feedback => "⭐",
            FlowState::PhotoPrompt => "📷",
            FlowState::Countdown => "⏱️",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlowState::Selection => "SELECTION",
            FlowState::BoxInstruction => "BOX_INSTRUCTION",
            FlowState::ThankYou => "THANK_YOU",
            FlowState::LearnMore => "LEARN_MORE",
            FlowState::Game => "GAME",
            FlowState::Feedback => "FEEDBACK",
            FlowState::PhotoPrompt => "PHOTO_PROMPT",
            FlowState::Countdown => "COUNTDOWN",
        };
        write!(f, "{}", name)
    }
}
