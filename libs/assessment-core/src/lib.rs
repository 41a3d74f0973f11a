//! Core assessment library shared by the command-line and app front ends.
//!
//! Provides:
//! - Heuristic extraction of question/answer records from OCR text
//! - Rule-based grading of objective answers
//! - SM-2 spaced repetition scheduling and due-card selection
//! - Shared types (QuestionRecord, ReviewState, Rating, etc.)

pub mod algorithm;
pub mod config;
pub mod error;
pub mod grading;
pub mod parser;
pub mod queue;
pub mod types;

pub use algorithm::{schedule, SchedulingResult, SpacedRepetitionAlgorithm};
pub use config::{AssessConfig, ExtractorConfig, GradingConfig};
pub use error::{AssessError, Result};
pub use grading::{grade, grade_one, grade_with, GradeOutcome, GradingResult, ItemGrade};
pub use parser::{parse, parse_with};
pub use queue::{due_cards, due_count, review_forecast};
pub use types::{QuestionRecord, QuestionType, Rating, ReviewState};
