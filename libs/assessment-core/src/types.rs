//! Core types for the assessment pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of question, decides which grading strategy applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    #[default]
    Short,
    Essay,
    Numeric,
    TrueFalse,
    Matching,
    Diagram,
}

impl QuestionType {
    /// Get the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::FillBlank => "fill_blank",
            Self::Short => "short",
            Self::Essay => "essay",
            Self::Numeric => "numeric",
            Self::TrueFalse => "true_false",
            Self::Matching => "matching",
            Self::Diagram => "diagram",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" | "mcq" => Some(Self::MultipleChoice),
            "fill_blank" => Some(Self::FillBlank),
            "short" => Some(Self::Short),
            "essay" => Some(Self::Essay),
            "numeric" => Some(Self::Numeric),
            "true_false" => Some(Self::TrueFalse),
            "matching" => Some(Self::Matching),
            "diagram" => Some(Self::Diagram),
            _ => None,
        }
    }
}

/// A question with its model answer, as extracted from scanned text or entered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question_text: String,
    pub answer_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

impl QuestionRecord {
    /// Create a record without options or labels.
    pub fn new(
        question_text: impl Into<String>,
        answer_text: impl Into<String>,
        question_type: QuestionType,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            answer_text: answer_text.into(),
            question_type,
            options: None,
            subject: None,
            chapter: None,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Decode a stored option blob (a JSON array).
    ///
    /// Anything that is not a non-empty array yields `None`. Non-string
    /// elements are kept in their JSON text form.
    pub fn options_from_json(json: &str) -> Option<Vec<String>> {
        if json.trim().is_empty() {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        let items = value.as_array()?;
        if items.is_empty() {
            return None;
        }
        Some(
            items
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }

    /// Encode options as a JSON array for storage.
    pub fn options_json(&self) -> Option<String> {
        self.options
            .as_ref()
            .and_then(|opts| serde_json::to_string(opts).ok())
    }
}

/// Rating for a review on the four-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to the 0-3 quality value.
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 1,
            Self::Good => 2,
            Self::Easy => 3,
        }
    }

    /// Create from a 0-3 quality value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Again),
            1 => Some(Self::Hard),
            2 => Some(Self::Good),
            3 => Some(Self::Easy),
            _ => None,
        }
    }

    /// Create from an arbitrary quality, clamped into 0-3.
    pub fn from_quality(quality: i32) -> Self {
        match quality.clamp(0, 3) {
            0 => Self::Again,
            1 => Self::Hard,
            3 => Self::Easy,
            _ => Self::Good,
        }
    }

    /// Map to the SM-2 0-5 response grade.
    pub fn sm2_grade(self) -> u8 {
        match self {
            Self::Again => 0,
            Self::Hard => 3,
            Self::Good => 4,
            Self::Easy => 5,
        }
    }

    /// Map a right/wrong result to a rating.
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Self::Good
        } else {
            Self::Again
        }
    }
}

/// Scheduling state of a record in the review pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review_at: Option<DateTime<Utc>>,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            ease_factor: 2.5,
            interval_days: 0,
            repetitions: 0,
            next_review_at: None,
            last_review_at: None,
        }
    }
}

impl ReviewState {
    /// Whether the card is due at `now`. Never-scheduled cards are not.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.is_some_and(|due| due <= now)
    }

    /// Whether the card has a running streak of successful reviews.
    pub fn is_consolidating(&self) -> bool {
        self.repetitions > 0
    }
}
