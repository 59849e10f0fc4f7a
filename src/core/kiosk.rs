//! Kiosk: resolver + registry + latest frame, producing views and
//! outbound persistence requests.
//!
//! Synchronous and clock-free; the sampling loop (or the interactive
//! CLI) supplies `now`.

use std::time::Instant;
use chrono::Utc;
use tracing::debug;

use crate::core::registry::SessionRegistry;
use crate::core::resolver::IdentityResolver;
use crate::types::{
    Detection, FlowEvent, FlowInput, Frame, OwnerKind, PhotoCaptureRequest, RatingRecord,
    ReasonCode, SessionSnapshot, SessionView, VipId,
};

/// Result of feeding the kiosk one tick, input, or timer
#[derive(Debug, Clone, PartialEq)]
pub struct KioskOutput {
    pub view: SessionView,
    pub events: Vec<FlowEvent>,
    /// Photos to hand to the persistence collaborator
    pub photos: Vec<PhotoCaptureRequest>,
    /// Ratings to hand to the persistence collaborator
    pub ratings: Vec<RatingRecord>,
}

impl KioskOutput {
    /// Did the flow change panels?
    pub fn state_changed(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, FlowEvent::StateEntered { .. }))
    }
}

pub struct Kiosk {
    resolver: Box<dyn IdentityResolver>,
    registry: SessionRegistry,
    latest_frame: Option<Frame>,
    last_detection: Detection,
    last_reason: ReasonCode,
    tick_count: u64,
}

impl std::fmt::Debug for Kiosk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kiosk")
            .field("registry", &self.registry)
            .field("last_detection", &self.last_detection)
            .field("tick_count", &self.tick_count)
            .finish()
    }
}

impl Kiosk {
    pub fn new(resolver: Box<dyn IdentityResolver>, registry: SessionRegistry) -> Self {
        Self {
            resolver,
            registry,
            latest_frame: None,
            last_detection: Detection::NoFace,
            last_reason: ReasonCode::R106_SESSION_IDLE,
            tick_count: 0,
        }
    }

    /// Remember the frame that is being classified (used for photos)
    pub fn on_frame(&mut self, frame: Frame) {
        self.latest_frame = Some(frame);
    }

    /// Apply one classifier result
    pub fn on_detection(&mut self, detection: Detection, now: Instant) -> KioskOutput {
        self.tick_count += 1;
        let owner = self.resolver.resolve(&detection);
        self.last_detection = detection;

        let outcome = self.registry.observe(owner, now);
        debug!(
            tick = self.tick_count,
            reason = outcome.reason.code(),
            "detection applied"
        );
        if outcome.is_switch() || outcome.reason == ReasonCode::R106_SESSION_IDLE {
            self.last_reason = outcome.reason;
        }

        let mut events = outcome.events;
        // A restored session may already be past its timer deadline
        events.extend(self.registry.advance(now));
        self.collect(events)
    }

    /// Apply a touch-screen input
    pub fn on_input(&mut self, input: FlowInput, now: Instant) -> KioskOutput {
        let events = self.registry.handle(input, now);
        self.collect(events)
    }

    /// Fire due flow timers
    pub fn advance(&mut self, now: Instant) -> KioskOutput {
        let events = self.registry.advance(now);
        self.collect(events)
    }

    /// Forget a VIP
    pub fn clear(&mut self, vip_id: VipId) -> KioskOutput {
        if self.registry.clear(vip_id) && self.registry.active_owner().is_none() {
            self.last_reason = ReasonCode::R106_SESSION_IDLE;
        }
        self.collect(Vec::new())
    }

    /// Turn flow events into outbound records and a fresh view
    fn collect(&mut self, events: Vec<FlowEvent>) -> KioskOutput {
        let vip_id = self.registry.current_vip();
        let mut photos = Vec::new();
        let mut ratings = Vec::new();

        for event in &events {
            match event {
                FlowEvent::PhotoRequested => photos.push(PhotoCaptureRequest {
                    frame: self.latest_frame.clone(),
                    vip_id,
                    timestamp: Utc::now(),
                }),
                FlowEvent::RatingSubmitted { rating } => ratings.push(RatingRecord {
                    rating: *rating,
                    vip_id,
                    timestamp: Utc::now(),
                }),
                FlowEvent::StateEntered { reason, .. } => self.last_reason = *reason,
                FlowEvent::RatingRequired => self.last_reason = ReasonCode::R301_RATING_REQUIRED,
                FlowEvent::CountdownTick { .. } => {}
            }
        }

        KioskOutput {
            view: self.view(),
            events,
            photos,
            ratings,
        }
    }

    /// Current view for the rendering boundary
    pub fn view(&self) -> SessionView {
        let mut view = SessionView::idle();
        view.reason = self.last_reason;
        view.suspended_count = self.registry.suspended_len();

        if let Some(c) = self.last_detection.classification() {
            view.face_detected = true;
            view.gender = Some(c.gender);
            view.age = Some(c.age);
        }
        if let Some(owner) = self.registry.active_owner() {
            view.owner_kind = owner.kind();
            view.owner_id = owner.vip_id();
        } else {
            view.owner_kind = OwnerKind::Idle;
        }
        if let Some(flow) = self.registry.active_flow() {
            view.flow_state = flow.state();
            view.selected_box = flow.selected_box().cloned();
            view.selected_rating = flow.selected_rating();
            view.countdown = flow.countdown();
        }
        view
    }

    /// Cancel the active flow timer while the loop is stopped
    pub fn pause_timers(&mut self) {
        self.registry.pause_timers();
    }

    /// Re-arm the flow timer cancelled by `pause_timers`, counting from `now`
    pub fn resume_timers(&mut self, now: Instant) {
        self.registry.resume_timers(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.registry.next_deadline()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn suspended(&self) -> Vec<SessionSnapshot> {
        self.registry.suspended()
    }

    pub fn latest_frame(&self) -> Option<&Frame> {
        self.latest_frame.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::core::resolver::RuleTable;
    use crate::types::{BoxId, FlowState, Gender};

    fn kiosk() -> Kiosk {
        Kiosk::new(Box::new(RuleTable::default()), SessionRegistry::default())
    }

    #[test]
    fn test_no_face_view() {
        let t0 = Instant::now();
        let mut k = kiosk();
        let out = k.on_detection(Detection::NoFace, t0);

        assert_eq!(out.view.owner_kind, OwnerKind::Idle);
        assert_eq!(out.view.status_text(), "Looking for face...");
        assert_eq!(out.view.gender, None);
    }

    #[test]
    fn test_vip_view_carries_classification() {
        let t0 = Instant::now();
        let mut k = kiosk();
        let out = k.on_detection(Detection::face(Gender::Female, 37), t0);

        assert_eq!(out.view.owner_kind, OwnerKind::Vip);
        assert_eq!(out.view.owner_id, Some(VipId(4)));
        assert_eq!(out.view.age, Some(37));
        assert_eq!(out.view.reason, ReasonCode::R201_FLOW_RESET);
        assert!(out.state_changed());
    }

    #[test]
    fn test_photo_request_carries_frame_and_vip() {
        let t0 = Instant::now();
        let mut k = kiosk();
        k.on_frame(Frame::jpeg(vec![1, 2, 3]));
        k.on_detection(Detection::face(Gender::Male, 22), t0);
        k.on_input(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
        k.advance(t0 + Duration::from_secs(7));
        k.on_input(FlowInput::LearnMore { yes: false }, t0 + Duration::from_secs(7));
        k.on_input(FlowInput::SetRating { rating: 5 }, t0 + Duration::from_secs(7));
        let out = k.on_input(FlowInput::SubmitRating, t0 + Duration::from_secs(7));
        assert_eq!(out.ratings.len(), 1);
        assert_eq!(out.ratings[0].vip_id, Some(VipId(1)));

        k.on_input(FlowInput::Photo { yes: true }, t0 + Duration::from_secs(8));
        let out = k.advance(t0 + Duration::from_secs(11));

        assert_eq!(out.photos.len(), 1);
        assert_eq!(out.photos[0].vip_id, Some(VipId(1)));
        assert_eq!(out.photos[0].frame.as_ref().unwrap().data, vec![1, 2, 3]);
        assert_eq!(out.view.flow_state, FlowState::Selection);
    }

    #[test]
    fn test_rating_required_surfaces_in_view() {
        let t0 = Instant::now();
        let mut k = kiosk();
        k.on_detection(Detection::face(Gender::Male, 60), t0);
        k.on_input(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
        k.advance(t0 + Duration::from_secs(7));
        k.on_input(FlowInput::LearnMore { yes: false }, t0 + Duration::from_secs(7));
        let out = k.on_input(FlowInput::SubmitRating, t0 + Duration::from_secs(8));

        assert_eq!(out.view.reason, ReasonCode::R301_RATING_REQUIRED);
        assert_eq!(out.view.flow_state, FlowState::Feedback);
        assert!(out.ratings.is_empty());
    }

    #[test]
    fn test_clear_active_vip_goes_idle() {
        let t0 = Instant::now();
        let mut k = kiosk();
        k.on_detection(Detection::face(Gender::Male, 33), t0);
        let out = k.clear(VipId(3));

        assert_eq!(out.view.owner_kind, OwnerKind::Idle);
        assert_eq!(out.view.reason, ReasonCode::R106_SESSION_IDLE);
    }
}
