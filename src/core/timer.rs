//! One-shot flow timer with generation-based cancellation
//!
//! Every state transition bumps the generation. A timer armed under an
//! older generation can never fire: `take_due` only hands back the timer
//! currently armed, and `is_current` lets callers holding a token from a
//! previous state detect that it went stale.

use std::time::{Duration, Instant};

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// BoxInstruction → ThankYou
    WalkToBox,
    /// Restored BoxInstruction → ThankYou
    WelcomeBack,
    /// ThankYou → LearnMore
    ThankYouHold,
    /// One countdown digit
    CountdownStep,
}

/// Handle to an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub generation: u64,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    token: TimerToken,
    deadline: Instant,
}

/// Single-slot cooperative timer owned by one flow engine
#[derive(Debug, Default)]
pub struct FlowTimer {
    generation: u64,
    armed: Option<ArmedTimer>,
}

impl FlowTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, cancelling whatever was armed
    pub fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.armed = None;
        self.generation
    }

    /// Arm (or re-arm) the slot under the current generation
    pub fn arm(&mut self, kind: TimerKind, from: Instant, delay: Duration) -> TimerToken {
        let token = TimerToken {
            generation: self.generation,
            kind,
        };
        self.armed = Some(ArmedTimer {
            token,
            deadline: from + delay,
        });
        token
    }

    /// Drop the armed timer without starting a new generation
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    /// Deadline of the armed timer
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|t| t.deadline)
    }

    /// Token of the armed timer
    pub fn armed(&self) -> Option<TimerToken> {
        self.armed.map(|t| t.token)
    }

    /// Disarm and return the timer if its deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Option<(TimerToken, Instant)> {
        match self.armed {
            Some(t) if t.deadline <= now => {
                self.armed = None;
                Some((t.token, t.deadline))
            }
            _ => None,
        }
    }

    /// Was `token` armed in the current generation?
    pub fn is_current(&self, token: TimerToken) -> bool {
        token.generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_before_deadline() {
        let t0 = Instant::now();
        let mut timer = FlowTimer::new();
        timer.bump();
        timer.arm(TimerKind::WalkToBox, t0, Duration::from_secs(5));

        assert!(timer.take_due(t0 + Duration::from_secs(4)).is_none());
        let (token, deadline) = timer.take_due(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(token.kind, TimerKind::WalkToBox);
        assert_eq!(deadline, t0 + Duration::from_secs(5));
        assert!(timer.deadline().is_none());
    }

    #[test]
    fn test_bump_cancels_and_stales_tokens() {
        let t0 = Instant::now();
        let mut timer = FlowTimer::new();
        timer.bump();
        let token = timer.arm(TimerKind::ThankYouHold, t0, Duration::from_secs(2));

        timer.bump();

        assert!(!timer.is_current(token));
        assert!(timer.take_due(t0 + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_rearm_keeps_generation() {
        let t0 = Instant::now();
        let mut timer = FlowTimer::new();
        let generation = timer.bump();
        let first = timer.arm(TimerKind::CountdownStep, t0, Duration::from_secs(1));
        let second = timer.arm(TimerKind::CountdownStep, t0, Duration::from_secs(2));

        assert_eq!(first.generation, generation);
        assert!(timer.is_current(first));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(2)));
        assert_eq!(timer.armed(), Some(second));
    }
}
