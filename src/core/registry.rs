//! Session Registry: one active session, suspended VIP sessions by id
//!
//! Switching rules (one `observe` per sampling tick):
//! - nobody in view: leave the active session alone
//! - same owner: refresh last-seen
//! - new guest: suspend any active VIP, start a throwaway guest session
//! - new VIP: suspend any active VIP, then restore or start theirs
//!
//! Guests are never written to the suspended set.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::core::flow::{FlowEngine, FlowTimings};
use crate::types::{
    FlowEvent, FlowInput, FlowState, ObserveOutcome, Owner, ReasonCode, SessionSnapshot, VipId,
};
use crate::SUSPENDED_CAPACITY;

/// Bounds on the suspended set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Suspended sessions kept; the least recently seen goes first
    pub capacity: usize,
    /// Drop suspended sessions not seen for this long
    pub idle_ttl: Option<Duration>,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            capacity: SUSPENDED_CAPACITY,
            idle_ttl: None,
        }
    }
}

/// The session currently driving the screen
#[derive(Debug)]
struct ActiveSession {
    owner: Owner,
    engine: FlowEngine,
    last_seen: Instant,
}

/// Owns every session record
#[derive(Debug)]
pub struct SessionRegistry {
    active: Option<ActiveSession>,
    suspended: HashMap<VipId, SessionSnapshot>,
    timings: FlowTimings,
    limits: RegistryLimits,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(FlowTimings::default(), RegistryLimits::default())
    }
}

impl SessionRegistry {
    pub fn new(timings: FlowTimings, limits: RegistryLimits) -> Self {
        Self {
            active: None,
            suspended: HashMap::new(),
            timings,
            limits,
        }
    }

    /// Feed one tick's resolved owner.
    ///
    /// Consecutive guest ticks keep the same guest session. Guests carry no
    /// identity, so two unrecognised people seen back to back share it. A
    /// guest starts fresh only when no session or a VIP session was active.
    pub fn observe(&mut self, owner: Option<Owner>, now: Instant) -> ObserveOutcome {
        let mut outcome = match owner {
            None => match self.active {
                None => ObserveOutcome::new(ReasonCode::R106_SESSION_IDLE),
                Some(_) => ObserveOutcome::new(ReasonCode::R105_SESSION_DEBOUNCED),
            },
            Some(owner) if self.active_owner() == Some(owner) => {
                if let Some(active) = self.active.as_mut() {
                    active.last_seen = now;
                }
                ObserveOutcome::new(ReasonCode::R104_SESSION_MAINTAINED)
            }
            Some(owner) => self.switch_to(owner, now),
        };
        outcome.evicted.extend(self.expire(now));
        outcome
    }

    fn switch_to(&mut self, owner: Owner, now: Instant) -> ObserveOutcome {
        let suspended = self.suspend_active();

        let (engine, mut outcome) = match owner {
            Owner::Guest => {
                debug!("guest session started");
                (
                    FlowEngine::new(self.timings),
                    ObserveOutcome::new(ReasonCode::R103_SESSION_GUEST),
                )
            }
            Owner::Vip(id) => match self.suspended.remove(&id) {
                Some(snapshot) => {
                    info!(vip = %id, state = %snapshot.flow_state, "restoring VIP session");
                    let (engine, events) = FlowEngine::restore(&snapshot, self.timings, now);
                    let mut outcome = ObserveOutcome::new(ReasonCode::R102_SESSION_RESTORED);
                    outcome.events = events;
                    (engine, outcome)
                }
                None => {
                    info!(vip = %id, "new VIP session");
                    (
                        FlowEngine::new(self.timings),
                        ObserveOutcome::new(ReasonCode::R101_SESSION_NEW),
                    )
                }
            },
        };

        if outcome.events.is_empty() {
            outcome.events.push(FlowEvent::StateEntered {
                state: FlowState::Selection,
                reason: ReasonCode::R201_FLOW_RESET,
            });
        }
        outcome.suspended = suspended;
        outcome.evicted = self.enforce_capacity();

        self.active = Some(ActiveSession {
            owner,
            engine,
            last_seen: now,
        });
        outcome
    }

    /// Move the active session out. VIPs are snapshotted, guests dropped.
    fn suspend_active(&mut self) -> Option<VipId> {
        let mut active = self.active.take()?;
        active.engine.cancel_timers();
        match active.owner {
            Owner::Vip(id) => {
                let snapshot = active.engine.snapshot(id, active.last_seen);
                info!(vip = %id, state = %snapshot.flow_state, "saved VIP session");
                self.suspended.insert(id, snapshot);
                Some(id)
            }
            Owner::Guest => {
                debug!("guest session discarded");
                None
            }
        }
    }

    /// Evict least-recently-seen snapshots beyond capacity
    fn enforce_capacity(&mut self) -> Vec<VipId> {
        let mut evicted = Vec::new();
        while self.suspended.len() > self.limits.capacity {
            let oldest = self
                .suspended
                .values()
                .min_by_key(|s| (s.last_seen, s.vip_id))
                .map(|s| s.vip_id);
            match oldest {
                Some(id) => {
                    self.suspended.remove(&id);
                    info!(vip = %id, "suspended session evicted (capacity)");
                    evicted.push(id);
                }
                None => break,
            }
        }
        evicted
    }

    /// Drop snapshots idle for longer than the TTL
    pub fn expire(&mut self, now: Instant) -> Vec<VipId> {
        let Some(ttl) = self.limits.idle_ttl else {
            return Vec::new();
        };
        let mut expired: Vec<VipId> = self
            .suspended
            .values()
            .filter(|s| s.idle_for(now) > ttl)
            .map(|s| s.vip_id)
            .collect();
        expired.sort();
        for id in &expired {
            self.suspended.remove(id);
            info!(vip = %id, "suspended session evicted (idle)");
        }
        expired
    }

    /// Route a touch-screen input to the active session.
    ///
    /// Touching the screen with nobody recognised opens a guest session.
    pub fn handle(&mut self, input: FlowInput, now: Instant) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        if self.active.is_none() {
            events.extend(self.switch_to(Owner::Guest, now).events);
        }
        if let Some(active) = self.active.as_mut() {
            events.extend(active.engine.handle(input, now));
        }
        events
    }

    /// Fire due timers of the active session
    pub fn advance(&mut self, now: Instant) -> Vec<FlowEvent> {
        match self.active.as_mut() {
            Some(active) => active.engine.advance(now),
            None => Vec::new(),
        }
    }

    /// Cancel the active session's timer, keeping its kind for `resume_timers`
    pub fn pause_timers(&mut self) {
        if let Some(active) = self.active.as_mut() {
            if let Some(kind) = active.engine.pause_timers() {
                debug!(?kind, "flow timer paused");
            }
        }
    }

    /// Re-arm a paused timer of the active session from `now`
    pub fn resume_timers(&mut self, now: Instant) {
        if let Some(active) = self.active.as_mut() {
            if let Some(token) = active.engine.resume_timers(now) {
                debug!(kind = ?token.kind, "flow timer resumed");
            }
        }
    }

    /// Deadline of the active session's timer
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.as_ref().and_then(|a| a.engine.next_deadline())
    }

    /// Forget a VIP entirely. Returns true if anything was removed.
    pub fn clear(&mut self, vip_id: VipId) -> bool {
        let mut removed = self.suspended.remove(&vip_id).is_some();
        if self.current_vip() == Some(vip_id) {
            self.active = None;
            removed = true;
        }
        if removed {
            info!(vip = %vip_id, "VIP session cleared");
        }
        removed
    }

    pub fn active_owner(&self) -> Option<Owner> {
        self.active.as_ref().map(|a| a.owner)
    }

    /// Active VIP, `None` for guests and idle
    pub fn current_vip(&self) -> Option<VipId> {
        self.active_owner().and_then(|o| o.vip_id())
    }

    /// Flow of the active session
    pub fn active_flow(&self) -> Option<&FlowEngine> {
        self.active.as_ref().map(|a| &a.engine)
    }

    pub fn suspended_len(&self) -> usize {
        self.suspended.len()
    }

    pub fn suspended_snapshot(&self, vip_id: VipId) -> Option<&SessionSnapshot> {
        self.suspended.get(&vip_id)
    }

    /// Suspended sessions ordered by VIP id
    pub fn suspended(&self) -> Vec<SessionSnapshot> {
        let mut all: Vec<SessionSnapshot> = self.suspended.values().cloned().collect();
        all.sort_by_key(|s| s.vip_id);
        all
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoxId;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn vip(n: u32) -> Option<Owner> {
        Some(Owner::Vip(VipId(n)))
    }

    #[test]
    fn test_idle_until_someone_shows_up() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        let out = reg.observe(None, t0);
        assert_eq!(out.reason, ReasonCode::R106_SESSION_IDLE);
        assert!(reg.active_owner().is_none());
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_new_vip_starts_at_selection() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        let out = reg.observe(vip(1), t0);

        assert_eq!(out.reason, ReasonCode::R101_SESSION_NEW);
        assert!(out.is_switch());
        assert_eq!(reg.current_vip(), Some(VipId(1)));
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::Selection);
    }

    #[test]
    fn test_same_vip_is_maintained() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(vip(1), t0);
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);

        let out = reg.observe(vip(1), t0 + secs(1));
        assert_eq!(out.reason, ReasonCode::R104_SESSION_MAINTAINED);
        assert!(out.events.is_empty());
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::BoxInstruction);
    }

    #[test]
    fn test_no_face_debounces_active_session() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(vip(5), t0);
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
        reg.advance(t0 + secs(7));
        reg.handle(FlowInput::LearnMore { yes: true }, t0 + secs(7));
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::Game);

        let out = reg.observe(None, t0 + secs(8));
        assert_eq!(out.reason, ReasonCode::R105_SESSION_DEBOUNCED);
        assert_eq!(reg.current_vip(), Some(VipId(5)));
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::Game);
        assert_eq!(reg.suspended_len(), 0);
    }

    #[test]
    fn test_switch_saves_and_restores() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(vip(2), t0);
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
        reg.advance(t0 + secs(7));
        reg.handle(FlowInput::LearnMore { yes: false }, t0 + secs(7));
        reg.handle(FlowInput::SetRating { rating: 4 }, t0 + secs(8));

        let out = reg.observe(vip(3), t0 + secs(9));
        assert_eq!(out.suspended, Some(VipId(2)));
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::Selection);

        let saved = reg.suspended_snapshot(VipId(2)).unwrap();
        assert_eq!(saved.flow_state, FlowState::Feedback);
        assert_eq!(saved.selected_rating, 4);
        assert_eq!(saved.selected_box, Some(BoxId::new("1")));

        let out = reg.observe(vip(2), t0 + secs(10));
        assert_eq!(out.reason, ReasonCode::R102_SESSION_RESTORED);
        assert_eq!(out.suspended, Some(VipId(3)));
        let flow = reg.active_flow().unwrap();
        assert_eq!(flow.state(), FlowState::Feedback);
        assert_eq!(flow.selected_rating(), 4);
        assert_eq!(flow.selected_box(), Some(&BoxId::new("1")));
        assert!(reg.suspended_snapshot(VipId(2)).is_none());
    }

    #[test]
    fn test_guest_never_suspended() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(Some(Owner::Guest), t0);
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);

        let out = reg.observe(vip(3), t0 + secs(1));
        assert_eq!(out.suspended, None);
        assert_eq!(reg.suspended_len(), 0);

        let out = reg.observe(Some(Owner::Guest), t0 + secs(2));
        assert_eq!(out.reason, ReasonCode::R103_SESSION_GUEST);
        assert_eq!(out.suspended, Some(VipId(3)));
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::Selection);
        assert_eq!(reg.suspended(), vec![reg.suspended_snapshot(VipId(3)).unwrap().clone()]);
    }

    #[test]
    fn test_consecutive_guest_ticks_keep_progress() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(Some(Owner::Guest), t0);
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);

        let out = reg.observe(Some(Owner::Guest), t0 + secs(1));
        assert_eq!(out.reason, ReasonCode::R104_SESSION_MAINTAINED);
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::BoxInstruction);
    }

    #[test]
    fn test_touch_without_face_opens_guest_session() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("2") }, t0);

        assert_eq!(reg.active_owner(), Some(Owner::Guest));
        assert_eq!(reg.active_flow().unwrap().state(), FlowState::BoxInstruction);
    }

    #[test]
    fn test_switch_cancels_outgoing_timer() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(vip(1), t0);
        reg.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
        assert!(reg.next_deadline().is_some());

        reg.observe(vip(2), t0 + secs(1));
        assert!(reg.next_deadline().is_none());
        assert!(reg.advance(t0 + secs(60)).is_empty());
        assert_eq!(
            reg.suspended_snapshot(VipId(1)).unwrap().flow_state,
            FlowState::BoxInstruction
        );
    }

    #[test]
    fn test_capacity_evicts_least_recently_seen() {
        let t0 = Instant::now();
        let limits = RegistryLimits { capacity: 2, idle_ttl: None };
        let mut reg = SessionRegistry::new(FlowTimings::default(), limits);
        reg.observe(vip(1), t0);
        reg.observe(vip(2), t0 + secs(1));
        reg.observe(vip(3), t0 + secs(2));
        let out = reg.observe(vip(4), t0 + secs(3));

        assert_eq!(out.evicted, vec![VipId(1)]);
        let kept: Vec<_> = reg.suspended().into_iter().map(|s| s.vip_id).collect();
        assert_eq!(kept, vec![VipId(2), VipId(3)]);
    }

    #[test]
    fn test_idle_ttl_expires_snapshots() {
        let t0 = Instant::now();
        let limits = RegistryLimits { capacity: 8, idle_ttl: Some(secs(60)) };
        let mut reg = SessionRegistry::new(FlowTimings::default(), limits);
        reg.observe(vip(1), t0);
        reg.observe(vip(2), t0 + secs(1));

        assert!(reg.observe(vip(2), t0 + secs(30)).evicted.is_empty());
        let out = reg.observe(vip(2), t0 + secs(61));
        assert_eq!(out.evicted, vec![VipId(1)]);
        assert_eq!(reg.suspended_len(), 0);
    }

    #[test]
    fn test_clear_removes_active_and_suspended() {
        let t0 = Instant::now();
        let mut reg = SessionRegistry::default();
        reg.observe(vip(1), t0);
        reg.observe(vip(2), t0);

        assert!(reg.clear(VipId(1)));
        assert_eq!(reg.suspended_len(), 0);
        assert!(reg.clear(VipId(2)));
        assert!(reg.active_owner().is_none());
        assert!(!reg.clear(VipId(9)));
    }
}
