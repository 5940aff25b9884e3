pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod generator;
pub mod json_utils;
pub mod model;
pub mod session;

// Convenient re-exports
pub use config::AppConfig;
pub use error::{AIError, FailureKind, GenerationError, TransitionError};
pub use generator::{GeneratorConfig, QuizGenerator, QuizSource, ValidationMode};
pub use model::{Difficulty, PresetTopic, QuizConfig, QuizQuestion, TopicSelection};
pub use session::{Phase, QuizController, QuizSummary, SessionState};
