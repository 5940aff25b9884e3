//! Session state types

use crate::error::FailureKind;
use crate::model::QuizQuestion;

/// Top-level discrete state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Playing,
    Finished,
    Error,
}

/// Everything the controller knows about the current round.
///
/// `Default` is the Idle state every reset returns to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: Phase,
    /// Effective topic of the round, fixed at start
    pub topic: Option<String>,
    pub questions: Vec<QuizQuestion>,
    pub current_index: usize,
    pub score: usize,
    pub selected_option_index: Option<usize>,
    pub explanation_visible: bool,
    /// Set only in the Error phase
    pub failure: Option<FailureKind>,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            Phase::Playing => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.selected_option_index.is_some()
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }
}
