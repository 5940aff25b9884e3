//! Read-only figures a front-end shows for a session.

use super::{Phase, SessionState};
use crate::model::QuizQuestion;

/// How an option should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// The question has not been answered yet
    Pending,
    /// The correct option, revealed after answering
    Correct,
    /// The option the user picked, when it was wrong
    Wrong,
    /// Any other option after answering
    Dimmed,
}

pub fn option_mark(question: &QuizQuestion, selected: Option<usize>, index: usize) -> OptionMark {
    match selected {
        None => OptionMark::Pending,
        Some(_) if question.is_correct(index) => OptionMark::Correct,
        Some(picked) if picked == index => OptionMark::Wrong,
        Some(_) => OptionMark::Dimmed,
    }
}

/// Share of the round completed, counting the current question once answered. 0..=100.
pub fn progress_percent(state: &SessionState) -> u8 {
    let total = state.total();
    if total == 0 {
        return 0;
    }
    let done = match state.phase {
        Phase::Finished => total,
        _ => state.current_index + usize::from(state.is_answered()),
    };
    ((done * 100) / total).min(100) as u8
}

/// Rounded percentage of correct answers, `None` without questions.
pub fn accuracy_percent(score: usize, total: usize) -> Option<u8> {
    if total == 0 {
        return None;
    }
    Some(((score as f64 / total as f64) * 100.0).round() as u8)
}

pub fn verdict(score: usize, total: usize) -> &'static str {
    if score == total {
        "Perfect Score!"
    } else if score * 2 > total {
        "Great Job!"
    } else {
        "Keep Learning!"
    }
}

/// Label of the control that moves past an answered question.
pub fn advance_label(state: &SessionState) -> &'static str {
    if state.is_last_question() {
        "Finish"
    } else {
        "Next Question"
    }
}

/// Results of a finished round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub topic: String,
    pub score: usize,
    pub total: usize,
    pub accuracy_percent: u8,
    pub verdict: &'static str,
}

impl QuizSummary {
    /// Summarize a session; only finished rounds have a summary.
    pub fn from_state(state: &SessionState) -> Option<Self> {
        if state.phase != Phase::Finished {
            return None;
        }
        let total = state.total();
        Some(Self {
            topic: state.topic.clone().unwrap_or_default(),
            score: state.score,
            total,
            accuracy_percent: accuracy_percent(state.score, total)?,
            verdict: verdict(state.score, total),
        })
    }
}
