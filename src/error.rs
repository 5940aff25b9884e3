use std::time::Duration;

use thiserror::Error;

use crate::session::Phase;

/// Why a quiz could not be generated.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation service returned no content")]
    Empty,
    #[error("Generation service call failed: {0}")]
    Transport(#[from] AIError),
    #[error("Generated payload does not match the quiz schema: {reason}")]
    Malformed { reason: String, raw: String },
}

impl GenerationError {
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into(), raw: raw.into() }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Empty => FailureKind::Empty,
            Self::Transport(_) => FailureKind::Transport,
            Self::Malformed { .. } => FailureKind::Malformed,
        }
    }
}

/// Payload-free classification of a [`GenerationError`], kept in session state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Empty,
    Transport,
    Malformed,
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("DeepSeek API error: {0}")]
    DeepSeek(#[from] DeepSeekError),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Mock error: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum DeepSeekError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

/// Rejected session input. The state is left untouched when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{event} is not accepted while {phase:?}")]
    InvalidTransition { phase: Phase, event: &'static str },
    #[error("Current question has not been answered yet")]
    NotAnswered,
    #[error("Option {index} is out of range for a question with {len} options")]
    OptionOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API key {0} not found in environment or .env")]
    MissingKey(&'static str),
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
