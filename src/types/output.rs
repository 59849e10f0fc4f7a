//! Output structures for the view layer and terminal display

use colored::Colorize;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{BoxId, FlowState, Gender, OwnerKind, ReasonCode, VipId};

/// Everything the view layer needs after a tick or transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Idle / guest / VIP
    pub owner_kind: OwnerKind,
    /// VIP number, if any
    pub owner_id: Option<VipId>,
    /// Last classification, `None` while looking for a face
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    /// Did the last tick see a face?
    pub face_detected: bool,
    /// Panel to show
    pub flow_state: FlowState,
    pub selected_box: Option<BoxId>,
    /// 0 = no star selected
    pub selected_rating: u8,
    /// Digit to show while counting down
    pub countdown: Option<u8>,
    /// Number of VIPs waiting to come back
    pub suspended_count: usize,
    /// Reason for the last change
    pub reason: ReasonCode,
}

impl SessionView {
    /// Idle view before anybody shows up
    pub fn idle() -> Self {
        Self {
            timestamp: Utc::now(),
            owner_kind: OwnerKind::Idle,
            owner_id: None,
            gender: None,
            age: None,
            face_detected: false,
            flow_state: FlowState::Selection,
            selected_box: None,
            selected_rating: 0,
            countdown: None,
            suspended_count: 0,
            reason: ReasonCode::R106_SESSION_IDLE,
        }
    }

    /// Name shown under the avatar
    pub fn owner_label(&self) -> String {
        match (self.owner_kind, self.owner_id) {
            (OwnerKind::Vip, Some(id)) => format!("VIP {}", id),
            (OwnerKind::Guest, _) => "Guest".to_string(),
            _ => "No VIP".to_string(),
        }
    }

    /// Status line under the avatar
    pub fn status_text(&self) -> &'static str {
        if !self.face_detected {
            return "Looking for face...";
        }
        match self.owner_kind {
            OwnerKind::Vip => "Active",
            OwnerKind::Guest => "Not registered",
            OwnerKind::Idle => "Looking for face...",
        }
    }

    fn detection_text(&self) -> String {
        match (self.gender, self.age) {
            (Some(g), Some(a)) => format!("{} {}", g, a),
            _ => "--".to_string(),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let mut line = format!(
            "{} {} | {} | {} | {}",
            self.flow_state.emoji(),
            self.flow_state,
            self.owner_label(),
            self.detection_text(),
            self.status_text(),
        );
        if let Some(n) = self.countdown {
            line.push_str(&format!(" | {}", n));
        }
        format!(
            "{} {}",
            line.color(self.flow_state.color()),
            self.reason.code().dimmed()
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "state={} | owner={} | detected={} | box={} | rating={} | suspended={} | reason={}",
            self.flow_state.panel_id(),
            self.owner_label(),
            self.detection_text(),
            self.selected_box.as_ref().map(|b| b.as_str()).unwrap_or("-"),
            self.selected_rating,
            self.suspended_count,
            self.reason.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_view_is_looking_for_face() {
        let view = SessionView::idle();
        assert_eq!(view.owner_label(), "No VIP");
        assert_eq!(view.status_text(), "Looking for face...");
        assert_eq!(view.flow_state, FlowState::Selection);
    }

    #[test]
    fn test_parseable_string() {
        let mut view = SessionView::idle();
        view.owner_kind = OwnerKind::Vip;
        view.owner_id = Some(VipId(4));
        view.face_detected = true;
        view.gender = Some(Gender::Female);
        view.age = Some(38);
        let s = view.to_parseable_string();
        assert!(s.starts_with("state=ewaste-selection | owner=VIP 4 | detected=Female 38"));
        assert!(s.ends_with("reason=R106_SESSION_IDLE"));
    }
}
