//! Quiz data types shared by the generator and the session controller.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of questions requested for every round.
pub const QUESTIONS_PER_ROUND: usize = 5;

/// Number of answer options each question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// One generated multiple-choice question.
///
/// Field names on the wire follow the generation schema (`question`, `correctAnswerIndex`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Quiz Question", description = "A multiple-choice question with exactly four options")]
pub struct QuizQuestion {
    /// Identifies the question within its round
    pub id: i64,
    /// The question text
    #[serde(rename = "question")]
    pub prompt: String,
    /// The four answer options, in display order
    #[schemars(length(min = 4, max = 4))]
    pub options: Vec<String>,
    /// Zero-based index of the correct option (0-3)
    #[serde(rename = "correctAnswerIndex")]
    #[schemars(range(min = 0, max = 3), description = "Zero-based index of the correct option (0-3)")]
    pub correct_option_index: i64,
    /// Brief explanation of the correct answer
    pub explanation: String,
}

impl QuizQuestion {
    /// Index of the correct option, if it actually addresses one of `options`.
    pub fn correct_index(&self) -> Option<usize> {
        usize::try_from(self.correct_option_index)
            .ok()
            .filter(|&idx| idx < self.options.len())
    }

    pub fn is_correct(&self, option_index: usize) -> bool {
        self.correct_index() == Some(option_index)
    }

    /// Describe the first way this question breaks the four-option contract.
    pub fn contract_violation(&self) -> Option<String> {
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Some(format!(
                "question {} has {} options, expected {}",
                self.id,
                self.options.len(),
                OPTIONS_PER_QUESTION
            ));
        }
        if self.correct_index().is_none() {
            return Some(format!(
                "question {} has correctAnswerIndex {}, expected 0..{}",
                self.id, self.correct_option_index, OPTIONS_PER_QUESTION
            ));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("Unknown difficulty: '{}'. Supported: easy, medium, hard", s)),
        }
    }
}

/// Parameters of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub topic: String,
    pub difficulty: Difficulty,
}

impl QuizConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), difficulty: Difficulty::default() }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

/// Quick-select topics offered next to the free-text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresetTopic {
    #[default]
    GeneralKnowledge,
    ScienceAndNature,
    HistoryAndCulture,
    Technology,
    ArtAndLiterature,
}

impl PresetTopic {
    pub const ALL: [PresetTopic; 5] = [
        Self::GeneralKnowledge,
        Self::ScienceAndNature,
        Self::HistoryAndCulture,
        Self::Technology,
        Self::ArtAndLiterature,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::GeneralKnowledge => "General Knowledge",
            Self::ScienceAndNature => "Science & Nature",
            Self::HistoryAndCulture => "History & Culture",
            Self::Technology => "Technology",
            Self::ArtAndLiterature => "Art & Literature",
        }
    }

    /// Match a preset by its label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|preset| preset.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for PresetTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The topic inputs as the user left them: a selected preset and an optional custom text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicSelection {
    pub preset: PresetTopic,
    pub custom: String,
}

impl TopicSelection {
    pub fn preset(preset: PresetTopic) -> Self {
        Self { preset, custom: String::new() }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self { preset: PresetTopic::default(), custom: text.into() }
    }

    /// Selecting a preset discards any custom text.
    pub fn select_preset(&mut self, preset: PresetTopic) {
        self.preset = preset;
        self.custom.clear();
    }

    /// Trimmed custom text when there is any, otherwise the preset label.
    pub fn resolve(&self) -> String {
        let custom = self.custom.trim();
        if custom.is_empty() {
            self.preset.label().to_string()
        } else {
            custom.to_string()
        }
    }
}

impl From<&str> for TopicSelection {
    fn from(text: &str) -> Self {
        Self::custom(text)
    }
}

impl From<String> for TopicSelection {
    fn from(text: String) -> Self {
        Self::custom(text)
    }
}

impl From<PresetTopic> for TopicSelection {
    fn from(preset: PresetTopic) -> Self {
        Self::preset(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: usize, correct: i64) -> QuizQuestion {
        QuizQuestion {
            id: 1,
            prompt: "Which planet is largest?".to_string(),
            options: (0..options).map(|i| format!("option {}", i)).collect(),
            correct_option_index: correct,
            explanation: "Jupiter is the largest.".to_string(),
        }
    }

    #[test]
    fn wire_names_follow_generation_schema() {
        let json = r#"{"id":3,"question":"Q?","options":["a","b","c","d"],"correctAnswerIndex":2,"explanation":"because"}"#;
        let q: QuizQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(q.prompt, "Q?");
        assert_eq!(q.correct_option_index, 2);
        assert_eq!(q.correct_index(), Some(2));

        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["question"], "Q?");
        assert_eq!(back["correctAnswerIndex"], 2);
    }

    #[test]
    fn correct_index_rejects_out_of_range_values() {
        assert_eq!(question(4, 3).correct_index(), Some(3));
        assert_eq!(question(4, 4).correct_index(), None);
        assert_eq!(question(4, -1).correct_index(), None);
        assert!(!question(4, -1).is_correct(0));
    }

    #[test]
    fn contract_violation_reports_option_count_first() {
        assert!(question(4, 0).contract_violation().is_none());
        let msg = question(3, 7).contract_violation().unwrap();
        assert!(msg.contains("3 options"), "{msg}");
        let msg = question(4, 9).contract_violation().unwrap();
        assert!(msg.contains("correctAnswerIndex 9"), "{msg}");
    }

    #[test]
    fn blank_custom_topic_falls_back_to_preset() {
        let mut selection = TopicSelection::preset(PresetTopic::ScienceAndNature);
        selection.custom = "   \t".to_string();
        assert_eq!(selection.resolve(), "Science & Nature");

        selection.custom = "  Quantum Physics ".to_string();
        assert_eq!(selection.resolve(), "Quantum Physics");

        selection.select_preset(PresetTopic::Technology);
        assert!(selection.custom.is_empty());
        assert_eq!(selection.resolve(), "Technology");
    }

    #[test]
    fn preset_labels_round_trip() {
        for preset in PresetTopic::ALL {
            assert_eq!(PresetTopic::from_label(preset.label()), Some(preset));
        }
        assert_eq!(PresetTopic::from_label("art & literature"), Some(PresetTopic::ArtAndLiterature));
        assert_eq!(PresetTopic::from_label("Cooking"), None);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(Difficulty::default().to_string(), "medium");
        assert!("extreme".parse::<Difficulty>().is_err());
    }
}
