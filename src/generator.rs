//! Quiz generation: one structured request to a model, parsed into questions.
//!
//! [`QuizGenerator`] wraps any [`LowLevelClient`]. It builds the instruction, requests
//! the quiz schema, bounds the call with a timeout and turns the payload into
//! [`QuizQuestion`]s or a [`GenerationError`].

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::core::{LowLevelClient, OutputSchema};
use crate::error::{AIError, GenerationError};
use crate::json_utils::parse_payload;
use crate::model::{QuizConfig, QuizQuestion, OPTIONS_PER_QUESTION, QUESTIONS_PER_ROUND};

/// Anything that can produce the questions for a round.
///
/// The session controller depends on this trait only, so tests and alternative
/// backends can stand in for a real model.
#[async_trait]
pub trait QuizSource: Send + Sync + Debug {
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<QuizQuestion>, GenerationError>;
}

/// How much of the question contract is checked after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Exactly five questions, four options each, correct index in range.
    #[default]
    Strict,
    /// Return whatever parses, uncorrected.
    Lenient,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(format!("Unknown validation mode: '{}'. Supported: strict, lenient", s)),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub timeout: Duration,
    pub validation: ValidationMode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            validation: ValidationMode::default(),
        }
    }
}

/// Natural-language instruction sent to the model.
pub fn build_prompt(config: &QuizConfig) -> String {
    format!(
        "Generate {} multiple-choice questions about \"{}\" at {} difficulty.\n\
         Each question should have {} options.\n\
         Include a brief explanation for the correct answer.",
        QUESTIONS_PER_ROUND, config.topic, config.difficulty, OPTIONS_PER_QUESTION
    )
}

/// The quiz response schema: an array of question objects, all fields required, in order.
pub fn quiz_output_schema() -> OutputSchema {
    let native = json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER" },
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                },
                "correctAnswerIndex": {
                    "type": "INTEGER",
                    "description": "Zero-based index of the correct option (0-3)"
                },
                "explanation": { "type": "STRING" }
            },
            "required": ["id", "question", "options", "correctAnswerIndex", "explanation"],
            "propertyOrdering": ["id", "question", "options", "correctAnswerIndex", "explanation"]
        }
    });
    OutputSchema::for_type::<Vec<QuizQuestion>>(native).with_field("questions")
}

#[derive(Clone)]
pub struct QuizGenerator<C: LowLevelClient> {
    client: C,
    config: GeneratorConfig,
    schema: OutputSchema,
}

impl<C: LowLevelClient> Debug for QuizGenerator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizGenerator")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish()
    }
}

impl<C: LowLevelClient> QuizGenerator<C> {
    pub fn new(client: C, config: GeneratorConfig) -> Self {
        info!(timeout_secs = config.timeout.as_secs(), validation = %config.validation, "Creating new QuizGenerator");
        Self { client, config, schema: quiz_output_schema() }
    }

    /// Request a quiz for `config`. One attempt, no retry.
    #[instrument(target = "topic_quiz::generator", skip(self), fields(topic = %config.topic, difficulty = %config.difficulty))]
    pub async fn generate(&self, config: &QuizConfig) -> Result<Vec<QuizQuestion>, GenerationError> {
        let prompt = build_prompt(config);
        debug!(prompt_len = prompt.len(), "Requesting quiz");

        let call = self.client.ask_structured(prompt, &self.schema);
        let payload = match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(Some(payload))) => payload,
            Ok(Ok(None)) => {
                warn!("Generation service returned no payload");
                return Err(GenerationError::Empty);
            }
            Ok(Err(e)) => {
                error!(error = %e, "Generation request failed");
                return Err(GenerationError::Transport(e));
            }
            Err(_) => {
                error!(timeout_secs = self.config.timeout.as_secs(), "Generation request timed out");
                return Err(GenerationError::Transport(AIError::Timeout(self.config.timeout)));
            }
        };

        if payload.trim().is_empty() {
            warn!("Generation service returned a blank payload");
            return Err(GenerationError::Empty);
        }

        let questions: Vec<QuizQuestion> = parse_payload(&payload).map_err(|e| {
            error!(error = %e, payload_len = payload.len(), "Failed to parse quiz payload");
            GenerationError::malformed(e.to_string(), payload.clone())
        })?;

        if self.config.validation == ValidationMode::Strict {
            validate(&questions).map_err(|reason| {
                warn!(%reason, "Quiz payload violates the question contract");
                GenerationError::malformed(reason, payload.clone())
            })?;
        }

        info!(questions = questions.len(), "Quiz generated");
        Ok(questions)
    }
}

/// Check the full question contract.
pub fn validate(questions: &[QuizQuestion]) -> Result<(), String> {
    if questions.len() != QUESTIONS_PER_ROUND {
        return Err(format!(
            "expected {} questions, got {}",
            QUESTIONS_PER_ROUND,
            questions.len()
        ));
    }
    match questions.iter().find_map(QuizQuestion::contract_violation) {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

#[async_trait]
impl<C: LowLevelClient> QuizSource for QuizGenerator<C> {
    async fn generate(&self, config: &QuizConfig) -> Result<Vec<QuizQuestion>, GenerationError> {
        QuizGenerator::generate(self, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;

    #[test]
    fn prompt_names_topic_difficulty_and_counts() {
        let prompt = build_prompt(&QuizConfig::new("Technology").with_difficulty(Difficulty::Hard));
        assert!(prompt.starts_with("Generate 5 multiple-choice questions about \"Technology\" at hard difficulty."));
        assert!(prompt.contains("Each question should have 4 options."));
        assert!(prompt.contains("brief explanation"));
    }

    #[test]
    fn native_schema_lists_fields_in_order() {
        let schema = quiz_output_schema();
        let items = &schema.native["items"];
        let order: Vec<&str> = items["propertyOrdering"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(order, ["id", "question", "options", "correctAnswerIndex", "explanation"]);
        assert_eq!(items["required"], items["propertyOrdering"]);
        assert_eq!(
            items["properties"]["correctAnswerIndex"]["description"],
            "Zero-based index of the correct option (0-3)"
        );
    }

    #[test]
    fn json_schema_uses_wire_field_names() {
        let text = serde_json::to_string(&quiz_output_schema().json_schema).unwrap();
        assert!(text.contains("correctAnswerIndex"));
        assert!(text.contains("\"question\""));
        assert!(!text.contains("correct_option_index"));
    }

    #[test]
    fn validation_mode_parses() {
        assert_eq!("Lenient".parse::<ValidationMode>(), Ok(ValidationMode::Lenient));
        assert!("loose".parse::<ValidationMode>().is_err());
    }
}
