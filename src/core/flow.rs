//! Flow Engine: the kiosk interaction script as a state machine
//!
//! State transitions:
//! - SELECTION → BOX_INSTRUCTION: box picked
//! - BOX_INSTRUCTION → THANK_YOU: walk timeout (or welcome-back after restore)
//! - THANK_YOU → LEARN_MORE: hold timeout
//! - LEARN_MORE → GAME | FEEDBACK: yes | no
//! - GAME → FEEDBACK: proceed
//! - FEEDBACK → PHOTO_PROMPT | SELECTION: rating 5 | rating 1-4
//! - PHOTO_PROMPT → COUNTDOWN | SELECTION: yes | no
//! - COUNTDOWN → SELECTION: 3-2-1 elapsed, photo requested
//!
//! Time is passed in explicitly; the engine never reads the clock.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::timer::{FlowTimer, TimerKind, TimerToken};
use crate::types::{
    BoxId, FlowEvent, FlowInput, FlowState, ReasonCode, SessionSnapshot, VipId,
};
use crate::{
    BOX_INSTRUCTION_MS, COUNTDOWN_START, COUNTDOWN_STEP_MS, MAX_RATING, PHOTO_RATING,
    THANK_YOU_MS, WELCOME_BACK_MS,
};

/// Durations of the timed transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTimings {
    pub box_instruction: Duration,
    pub thank_you: Duration,
    pub welcome_back: Duration,
    pub countdown_step: Duration,
    pub countdown_start: u8,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            box_instruction: Duration::from_millis(BOX_INSTRUCTION_MS),
            thank_you: Duration::from_millis(THANK_YOU_MS),
            welcome_back: Duration::from_millis(WELCOME_BACK_MS),
            countdown_step: Duration::from_millis(COUNTDOWN_STEP_MS),
            countdown_start: COUNTDOWN_START,
        }
    }
}

/// Flow state machine bound to one session
#[derive(Debug)]
pub struct FlowEngine {
    /// Current panel
    state: FlowState,
    /// Box picked on the selection panel
    selected_box: Option<BoxId>,
    /// Stars selected on the feedback panel (0 = none)
    selected_rating: u8,
    /// Digit on screen while counting down
    countdown: Option<u8>,
    /// The one timer this session may have
    timer: FlowTimer,
    timings: FlowTimings,
    /// Number of state changes
    transition_count: u64,
    /// Timer cancelled by `pause_timers`, re-armed by `resume_timers`
    paused: Option<TimerKind>,
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new(FlowTimings::default())
    }
}

impl FlowEngine {
    /// Create engine at the selection panel
    pub fn new(timings: FlowTimings) -> Self {
        Self {
            state: FlowState::Selection,
            selected_box: None,
            selected_rating: 0,
            countdown: None,
            timer: FlowTimer::new(),
            timings,
            transition_count: 0,
            paused: None,
        }
    }

    /// Rebuild an engine from a suspended snapshot.
    ///
    /// Timed states get their timer re-armed from `now`. A subject restored
    /// in the away state is treated as having come back from the box: a
    /// single welcome-back timer moves them to THANK_YOU.
    pub fn restore(
        snapshot: &SessionSnapshot,
        timings: FlowTimings,
        now: Instant,
    ) -> (Self, Vec<FlowEvent>) {
        let mut engine = Self::new(timings);
        engine.selected_box = snapshot.selected_box.clone();
        engine.selected_rating = snapshot.selected_rating;

        let mut events = Vec::new();
        match snapshot.flow_state {
            FlowState::BoxInstruction => {
                engine.set_state(FlowState::BoxInstruction);
                engine
                    .timer
                    .arm(TimerKind::WelcomeBack, now, timings.welcome_back);
                events.push(FlowEvent::StateEntered {
                    state: FlowState::BoxInstruction,
                    reason: ReasonCode::R214_FLOW_RESTORED,
                });
            }
            state => events.extend(engine.enter(state, ReasonCode::R214_FLOW_RESTORED, now)),
        }
        (engine, events)
    }

    /// Save progress for a VIP who is being pushed out
    pub fn snapshot(&self, vip_id: VipId, last_seen: Instant) -> SessionSnapshot {
        SessionSnapshot {
            vip_id,
            flow_state: self.state,
            selected_box: self.selected_box.clone(),
            selected_rating: self.selected_rating,
            saved_at: chrono::Utc::now(),
            last_seen: Some(last_seen),
        }
    }

    /// Apply a touch-screen input
    pub fn handle(&mut self, input: FlowInput, now: Instant) -> Vec<FlowEvent> {
        match (self.state, input) {
            (FlowState::Selection, FlowInput::SelectBox { box_id }) => {
                self.selected_box = Some(box_id);
                self.enter(FlowState::BoxInstruction, ReasonCode::R202_BOX_SELECTED, now)
            }
            (FlowState::LearnMore, FlowInput::LearnMore { yes: true }) => {
                self.enter(FlowState::Game, ReasonCode::R206_LEARN_MORE_YES, now)
            }
            (FlowState::LearnMore, FlowInput::LearnMore { yes: false }) => {
                self.enter(FlowState::Feedback, ReasonCode::R207_LEARN_MORE_NO, now)
            }
            (FlowState::Game, FlowInput::ProceedToFeedback) => {
                self.enter(FlowState::Feedback, ReasonCode::R208_GAME_DONE, now)
            }
            (FlowState::Feedback, FlowInput::SetRating { rating }) => {
                if (1..=MAX_RATING).contains(&rating) {
                    self.selected_rating = rating;
                } else {
                    debug!(rating, "rating out of range, ignored");
                }
                Vec::new()
            }
            (FlowState::Feedback, FlowInput::SubmitRating) => self.submit_rating(now),
            (FlowState::PhotoPrompt, FlowInput::Photo { yes: true }) => {
                self.enter(FlowState::Countdown, ReasonCode::R211_PHOTO_ACCEPTED, now)
            }
            (FlowState::PhotoPrompt, FlowInput::Photo { yes: false }) => {
                self.enter(FlowState::Selection, ReasonCode::R212_PHOTO_DECLINED, now)
            }
            (state, input) => {
                debug!(%state, input = input.name(), "input does not apply, ignored");
                Vec::new()
            }
        }
    }

    fn submit_rating(&mut self, now: Instant) -> Vec<FlowEvent> {
        let rating = self.selected_rating;
        if rating == 0 {
            return vec![FlowEvent::RatingRequired];
        }

        let mut events = vec![FlowEvent::RatingSubmitted { rating }];
        if rating == PHOTO_RATING {
            events.extend(self.enter(FlowState::PhotoPrompt, ReasonCode::R210_RATING_FIVE_STARS, now));
        } else {
            events.extend(self.enter(FlowState::Selection, ReasonCode::R209_RATING_SUBMITTED, now));
        }
        events
    }

    /// Fire every timer whose deadline is at or before `now`.
    ///
    /// Follow-up timers are armed from the deadline that fired, so one
    /// large step gives the same result as many small ones.
    pub fn advance(&mut self, now: Instant) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        while let Some((token, fired_at)) = self.timer.take_due(now) {
            events.extend(self.on_timer(token.kind, fired_at));
        }
        events
    }

    /// Fire a specific timer. A token from an earlier state is a no-op.
    pub fn fire(&mut self, token: TimerToken, now: Instant) -> Vec<FlowEvent> {
        if !self.timer.is_current(token) || self.timer.armed() != Some(token) {
            debug!(generation = token.generation, "stale timer ignored");
            return Vec::new();
        }
        self.timer.cancel();
        self.on_timer(token.kind, now)
    }

    fn on_timer(&mut self, kind: TimerKind, now: Instant) -> Vec<FlowEvent> {
        match kind {
            TimerKind::WalkToBox => {
                self.enter(FlowState::ThankYou, ReasonCode::R203_BOX_TIMEOUT, now)
            }
            TimerKind::WelcomeBack => {
                self.enter(FlowState::ThankYou, ReasonCode::R204_WELCOME_BACK, now)
            }
            TimerKind::ThankYouHold => {
                self.enter(FlowState::LearnMore, ReasonCode::R205_THANK_YOU_TIMEOUT, now)
            }
            TimerKind::CountdownStep => {
                let remaining = self.countdown.unwrap_or(1).saturating_sub(1);
                if remaining > 0 {
                    self.countdown = Some(remaining);
                    self.timer
                        .arm(TimerKind::CountdownStep, now, self.timings.countdown_step);
                    vec![FlowEvent::CountdownTick { remaining }]
                } else {
                    let mut events = vec![FlowEvent::PhotoRequested];
                    events.extend(self.enter(FlowState::Selection, ReasonCode::R213_PHOTO_TAKEN, now));
                    events
                }
            }
        }
    }

    /// Back to the selection panel, clearing inputs
    pub fn reset(&mut self, now: Instant) -> Vec<FlowEvent> {
        self.enter(FlowState::Selection, ReasonCode::R201_FLOW_RESET, now)
    }

    /// Enter `state`, cancelling the previous state's timer and arming its own
    fn enter(&mut self, state: FlowState, reason: ReasonCode, now: Instant) -> Vec<FlowEvent> {
        self.set_state(state);
        let mut events = vec![FlowEvent::StateEntered { state, reason }];

        match state {
            FlowState::Selection => {
                self.selected_box = None;
                self.selected_rating = 0;
            }
            FlowState::BoxInstruction => {
                self.timer
                    .arm(TimerKind::WalkToBox, now, self.timings.box_instruction);
            }
            FlowState::ThankYou => {
                self.timer
                    .arm(TimerKind::ThankYouHold, now, self.timings.thank_you);
            }
            FlowState::Countdown => {
                let start = self.timings.countdown_start.max(1);
                self.countdown = Some(start);
                self.timer
                    .arm(TimerKind::CountdownStep, now, self.timings.countdown_step);
                events.push(FlowEvent::CountdownTick { remaining: start });
            }
            FlowState::LearnMore | FlowState::Game | FlowState::Feedback | FlowState::PhotoPrompt => {}
        }

        debug!(%state, reason = reason.code(), "flow transition");
        events
    }

    fn set_state(&mut self, state: FlowState) {
        self.timer.bump();
        self.paused = None;
        self.countdown = None;
        self.state = state;
        self.transition_count += 1;
    }

    /// Drop the armed timer (session going inactive)
    pub fn cancel_timers(&mut self) {
        self.timer.bump();
    }

    /// Cancel the armed timer but remember its kind. Returns the kind.
    pub fn pause_timers(&mut self) -> Option<TimerKind> {
        let kind = self.timer.armed().map(|t| t.kind);
        self.timer.bump();
        if kind.is_some() {
            self.paused = kind;
        }
        kind
    }

    /// Re-arm a paused timer with its full delay from `now`
    pub fn resume_timers(&mut self, now: Instant) -> Option<TimerToken> {
        let kind = self.paused.take()?;
        let delay = match kind {
            TimerKind::WalkToBox => self.timings.box_instruction,
            TimerKind::WelcomeBack => self.timings.welcome_back,
            TimerKind::ThankYouHold => self.timings.thank_you,
            TimerKind::CountdownStep => self.timings.countdown_step,
        };
        Some(self.timer.arm(kind, now, delay))
    }

    /// Get current state
    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn selected_box(&self) -> Option<&BoxId> {
        self.selected_box.as_ref()
    }

    pub fn selected_rating(&self) -> u8 {
        self.selected_rating
    }

    pub fn countdown(&self) -> Option<u8> {
        self.countdown
    }

    /// Deadline of the armed timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Token of the armed timer, if any
    pub fn armed_timer(&self) -> Option<TimerToken> {
        self.timer.armed()
    }

    /// Get transition count
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }
}

// =============================================================================
// TESTS
// =============================================================================
