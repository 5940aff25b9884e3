//! Property-based tests for the session state machine

use super::*;
use crate::error::FailureKind;
use crate::model::{QuizConfig, QuizQuestion};
use proptest::prelude::*;

fn arb_question() -> impl Strategy<Value = QuizQuestion> {
    (1i64..100, 0i64..4, "[a-z ]{1,20}").prop_map(|(id, correct, prompt)| QuizQuestion {
        id,
        prompt,
        options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
        correct_option_index: correct,
        explanation: "because".into(),
    })
}

fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Empty),
        Just(FailureKind::Transport),
        Just(FailureKind::Malformed),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[A-Za-z ]{1,12}".prop_map(|topic| Event::Start(QuizConfig::new(topic))),
        (0usize..6).prop_map(Event::Answer),
        Just(Event::Advance),
        Just(Event::Reset),
        prop::collection::vec(arb_question(), 0..7).prop_map(Event::QuizReady),
        arb_failure_kind().prop_map(Event::QuizFailed),
    ]
}

/// Run events, keeping the previous state whenever one is rejected
fn run(events: Vec<Event>) -> Vec<SessionState> {
    let mut states = vec![SessionState::default()];
    for event in events {
        let current = states.last().cloned().unwrap_or_default();
        let next = transition(&current, event).map(|t| t.state).unwrap_or(current);
        states.push(next);
    }
    states
}

fn check_bounds(state: &SessionState) -> Result<(), TestCaseError> {
    prop_assert!(state.score <= state.total());
    match state.phase {
        Phase::Playing => {
            prop_assert!(state.current_index < state.total());
            prop_assert_eq!(state.explanation_visible, state.is_answered());
        }
        Phase::Finished => {
            prop_assert!(!state.questions.is_empty());
            prop_assert!(!state.is_answered());
        }
        Phase::Idle | Phase::Loading | Phase::Error => {
            prop_assert!(state.questions.is_empty());
            prop_assert_eq!(state.score, 0);
        }
    }
    prop_assert_eq!(state.failure.is_some(), state.phase == Phase::Error);
    Ok(())
}

proptest! {
    #[test]
    fn score_and_index_stay_in_bounds(events in prop::collection::vec(arb_event(), 0..40)) {
        for state in run(events) {
            check_bounds(&state)?;
        }
    }

    #[test]
    fn score_never_decreases_within_a_round(events in prop::collection::vec(arb_event(), 0..40)) {
        let states = run(events);
        for pair in states.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            if before.phase == Phase::Playing && matches!(after.phase, Phase::Playing | Phase::Finished) {
                prop_assert!(after.score >= before.score);
                prop_assert!(after.score <= before.score + 1);
            }
        }
    }

    #[test]
    fn answering_twice_equals_answering_once(
        events in prop::collection::vec(arb_event(), 0..30),
        first in 0usize..4,
        second in 0usize..6,
    ) {
        let state = run(events).pop().unwrap_or_default();
        if let Ok(once) = transition(&state, Event::Answer(first)) {
            let twice = transition(&once.state, Event::Answer(second)).map(|t| t.state);
            prop_assert_eq!(twice, Ok(once.state));
        }
    }

    #[test]
    fn reset_from_anywhere_is_identical_idle(events in prop::collection::vec(arb_event(), 0..40)) {
        let state = run(events).pop().unwrap_or_default();
        let t = transition(&state, Event::Reset).unwrap();
        prop_assert_eq!(t.state, SessionState::default());
        prop_assert!(t.effect.is_none());
    }
}
