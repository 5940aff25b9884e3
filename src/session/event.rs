//! Inputs to the session state machine and the work it asks for

use crate::error::FailureKind;
use crate::model::{QuizConfig, QuizQuestion};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    Start(QuizConfig),
    Answer(usize),
    Advance,
    Reset,

    // Generation outcomes
    QuizReady(Vec<QuizQuestion>),
    QuizFailed(FailureKind),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Answer(_) => "answer",
            Self::Advance => "advance",
            Self::Reset => "reset",
            Self::QuizReady(_) => "quiz ready",
            Self::QuizFailed(_) => "quiz failed",
        }
    }
}

/// Side effects requested by a transition, executed by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RequestQuiz(QuizConfig),
}
