//! Suspended session snapshots
//!
//! A snapshot is taken when a VIP's session is pushed out by another
//! subject, and rehydrated into a fresh flow engine when they return.

use std::time::Instant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BoxId, FlowEvent, FlowState, ReasonCode, VipId};

/// Saved progress of one VIP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub vip_id: VipId,
    pub flow_state: FlowState,
    pub selected_box: Option<BoxId>,
    /// 0 = no star selected
    pub selected_rating: u8,
    /// Wall-clock time of the save
    pub saved_at: DateTime<Utc>,
    /// Last tick this VIP was in view (not serialized)
    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl SessionSnapshot {
    /// How long since the VIP was last in view
    pub fn idle_for(&self, now: Instant) -> std::time::Duration {
        self.last_seen
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default()
    }
}

/// What one `observe` call did to the registry
#[derive(Debug, Clone, PartialEq)]
pub struct ObserveOutcome {
    /// Kind of switch (R1xx)
    pub reason: ReasonCode,
    /// VIP whose session was saved by this observation
    pub suspended: Option<VipId>,
    /// Snapshots dropped by the eviction policy
    pub evicted: Vec<VipId>,
    /// Flow events caused by the switch
    pub events: Vec<FlowEvent>,
}

impl ObserveOutcome {
    pub fn new(reason: ReasonCode) -> Self {
        Self {
            reason,
            suspended: None,
            evicted: Vec::new(),
            events: Vec::new(),
        }
    }

    /// True when the active owner changed
    pub fn is_switch(&self) -> bool {
        matches!(
            self.reason,
            ReasonCode::R101_SESSION_NEW
                | ReasonCode::R102_SESSION_RESTORED
                | ReasonCode::R103_SESSION_GUEST
        )
    }
}
