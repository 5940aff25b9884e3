//! Pure state transition function
//!
//! Given the same state and event it always produces the same result and performs
//! no I/O. Rejected events leave the caller's state untouched.

use super::{Effect, Event, Phase, SessionState};
use crate::error::{FailureKind, TransitionError};

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub effect: Option<Effect>,
}

impl Transition {
    pub fn new(state: SessionState) -> Self {
        Self { state, effect: None }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

pub fn transition(state: &SessionState, event: Event) -> Result<Transition, TransitionError> {
    match (state.phase, event) {
        // Always permitted, from any phase
        (_, Event::Reset) => Ok(Transition::new(SessionState::default())),

        (Phase::Idle, Event::Start(config)) => {
            let loading = SessionState {
                phase: Phase::Loading,
                topic: Some(config.topic.clone()),
                ..SessionState::default()
            };
            Ok(Transition::new(loading).with_effect(Effect::RequestQuiz(config)))
        }

        // Single flight: a second start while loading is dropped
        (Phase::Loading, Event::Start(_)) => Ok(Transition::new(state.clone())),

        (Phase::Loading, Event::QuizReady(questions)) if questions.is_empty() => {
            Ok(Transition::new(failed(FailureKind::Empty)))
        }

        (Phase::Loading, Event::QuizReady(questions)) => Ok(Transition::new(SessionState {
            phase: Phase::Playing,
            topic: state.topic.clone(),
            questions,
            ..SessionState::default()
        })),

        (Phase::Loading, Event::QuizFailed(kind)) => Ok(Transition::new(failed(kind))),

        // Repeated clicks after answering are ignored, whatever option they name
        (Phase::Playing, Event::Answer(_)) if state.is_answered() => Ok(Transition::new(state.clone())),

        (Phase::Playing, Event::Answer(index)) => {
            let Some(question) = state.current_question() else {
                return Err(TransitionError::InvalidTransition { phase: state.phase, event: "answer" });
            };
            if index >= question.options.len() {
                return Err(TransitionError::OptionOutOfRange { index, len: question.options.len() });
            }

            let mut next = state.clone();
            if question.is_correct(index) {
                next.score += 1;
            }
            next.selected_option_index = Some(index);
            next.explanation_visible = true;
            Ok(Transition::new(next))
        }

        (Phase::Playing, Event::Advance) if !state.is_answered() => Err(TransitionError::NotAnswered),

        (Phase::Playing, Event::Advance) => {
            let mut next = state.clone();
            next.selected_option_index = None;
            next.explanation_visible = false;
            if state.is_last_question() {
                next.phase = Phase::Finished;
            } else {
                next.current_index += 1;
            }
            Ok(Transition::new(next))
        }

        (phase, event) => Err(TransitionError::InvalidTransition { phase, event: event.name() }),
    }
}

fn failed(kind: FailureKind) -> SessionState {
    SessionState {
        phase: Phase::Error,
        failure: Some(kind),
        ..SessionState::default()
    }
}
