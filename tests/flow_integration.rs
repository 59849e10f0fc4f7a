//! Integration tests for the interaction flow
//!
//! Walks whole journeys through the flow engine and the kiosk coordinator

use kioskflow::core::{FlowEngine, FlowTimings, Kiosk, RuleTable, SessionRegistry};
use kioskflow::types::{
    BoxId, Detection, FlowEvent, FlowInput, FlowState, Frame, Gender, ReasonCode, VipId,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn states(events: &[FlowEvent]) -> Vec<FlowState> {
    events
        .iter()
        .filter_map(|e| match e {
            FlowEvent::StateEntered { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

/// Selection → box → thank you → learn more → game → feedback → photo → selection
#[test]
fn test_full_journey_with_photo() {
    let t0 = Instant::now();
    let mut k = Kiosk::new(Box::new(RuleTable::default()), SessionRegistry::default());
    k.on_frame(Frame::jpeg(vec![0xff, 0xd8, 0xff]));

    k.on_detection(Detection::face(Gender::Female, 48), t0);
    assert_eq!(k.view().owner_id, Some(VipId(6)));

    let out = k.on_input(FlowInput::SelectBox { box_id: BoxId::new("3") }, t0);
    assert_eq!(out.view.flow_state, FlowState::BoxInstruction);
    assert_eq!(out.view.selected_box, Some(BoxId::new("3")));

    // Walking to the box: nothing before the deadline
    assert!(k.advance(t0 + ms(4999)).events.is_empty());
    let out = k.advance(t0 + ms(5000));
    assert_eq!(out.view.flow_state, FlowState::ThankYou);
    assert_eq!(out.view.reason, ReasonCode::R203_BOX_TIMEOUT);

    let out = k.advance(t0 + ms(7000));
    assert_eq!(out.view.flow_state, FlowState::LearnMore);

    k.on_input(FlowInput::LearnMore { yes: true }, t0 + ms(8000));
    let out = k.on_input(FlowInput::ProceedToFeedback, t0 + ms(20_000));
    assert_eq!(out.view.flow_state, FlowState::Feedback);

    k.on_input(FlowInput::SetRating { rating: 4 }, t0 + ms(21_000));
    k.on_input(FlowInput::SetRating { rating: 5 }, t0 + ms(21_500));
    let out = k.on_input(FlowInput::SubmitRating, t0 + ms(22_000));
    assert_eq!(out.ratings.len(), 1);
    assert_eq!(out.ratings[0].rating, 5);
    assert_eq!(out.view.flow_state, FlowState::PhotoPrompt);

    let out = k.on_input(FlowInput::Photo { yes: true }, t0 + ms(23_000));
    assert_eq!(out.view.countdown, Some(3));
    assert_eq!(k.advance(t0 + ms(24_000)).view.countdown, Some(2));
    assert_eq!(k.advance(t0 + ms(25_000)).view.countdown, Some(1));

    let out = k.advance(t0 + ms(26_000));
    assert_eq!(out.photos.len(), 1);
    assert_eq!(out.photos[0].vip_id, Some(VipId(6)));
    assert_eq!(
        out.photos[0].frame.as_ref().map(|f| f.to_data_url()),
        Some("data:image/jpeg;base64,/9j/".to_string())
    );
    assert_eq!(out.view.flow_state, FlowState::Selection);
    assert_eq!(out.view.reason, ReasonCode::R213_PHOTO_TAKEN);
    assert_eq!(out.view.selected_box, None);
}

#[test]
fn test_declining_photo_returns_to_selection() {
    let t0 = Instant::now();
    let mut engine = FlowEngine::default();
    engine.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
    engine.advance(t0 + ms(7000));
    engine.handle(FlowInput::LearnMore { yes: false }, t0 + ms(7000));
    engine.handle(FlowInput::SetRating { rating: 5 }, t0 + ms(7000));
    engine.handle(FlowInput::SubmitRating, t0 + ms(7000));

    let events = engine.handle(FlowInput::Photo { yes: false }, t0 + ms(8000));
    assert_eq!(states(&events), vec![FlowState::Selection]);
    assert_eq!(engine.next_deadline(), None);
}

/// One late wake-up yields the same transitions as timely ones
#[test]
fn test_large_step_equals_small_steps() {
    let t0 = Instant::now();

    let mut stepped = FlowEngine::default();
    stepped.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
    let mut small = Vec::new();
    for i in 1..=80 {
        small.extend(stepped.advance(t0 + ms(i * 100)));
    }

    let mut jumped = FlowEngine::default();
    jumped.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
    let large = jumped.advance(t0 + ms(8000));

    assert_eq!(small, large);
    assert_eq!(states(&large), vec![FlowState::ThankYou, FlowState::LearnMore]);
    assert_eq!(stepped.state(), jumped.state());
}

#[test]
fn test_custom_timings() {
    let timings = FlowTimings {
        box_instruction: ms(100),
        thank_you: ms(100),
        welcome_back: ms(50),
        countdown_step: ms(10),
        countdown_start: 5,
    };
    let t0 = Instant::now();
    let mut engine = FlowEngine::new(timings);
    engine.handle(FlowInput::SelectBox { box_id: BoxId::new("1") }, t0);
    engine.advance(t0 + ms(200));
    assert_eq!(engine.state(), FlowState::LearnMore);

    engine.handle(FlowInput::LearnMore { yes: false }, t0 + ms(200));
    engine.handle(FlowInput::SetRating { rating: 5 }, t0 + ms(200));
    engine.handle(FlowInput::SubmitRating, t0 + ms(200));
    let events = engine.handle(FlowInput::Photo { yes: true }, t0 + ms(200));
    assert!(events.contains(&FlowEvent::CountdownTick { remaining: 5 }));

    let events = engine.advance(t0 + ms(250));
    assert!(events.contains(&FlowEvent::PhotoRequested));
    assert_eq!(engine.state(), FlowState::Selection);
}

#[test]
fn test_inputs_out_of_place_are_ignored() {
    let t0 = Instant::now();
    let mut engine = FlowEngine::default();

    assert!(engine.handle(FlowInput::SubmitRating, t0).is_empty());
    assert!(engine.handle(FlowInput::Photo { yes: true }, t0).is_empty());
    assert!(engine.handle(FlowInput::ProceedToFeedback, t0).is_empty());
    assert_eq!(engine.state(), FlowState::Selection);
    assert_eq!(engine.transition_count(), 0);
}
