//! Rule-based grading of objective answers.
//!
//! Each question type has its own notion of "same answer": option letters for
//! multiple choice, boolean tokens for true/false, a tolerance for numbers and
//! token overlap for free text. Nothing in here fails; unparsable input falls
//! back to plain text comparison.

use crate::config::GradingConfig;
use crate::types::{QuestionRecord, QuestionType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const FEEDBACK_CORRECT: &str = "Correct";
pub const FEEDBACK_INCORRECT: &str = "Incorrect";

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-+]?\d+\.?\d*").unwrap());

// Absorbs float error so that e.g. 3.15 - 3.14 still sits on the 0.01 boundary.
const FLOAT_SLACK: f64 = 1e-9;

const TRUE_TOKENS: [&str; 3] = ["true", "t", "yes"];

/// Verdict for a single answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub correct: bool,
    pub feedback: String,
}

impl GradeOutcome {
    fn correct() -> Self {
        Self {
            correct: true,
            feedback: FEEDBACK_CORRECT.to_string(),
        }
    }

    fn incorrect() -> Self {
        Self {
            correct: false,
            feedback: FEEDBACK_INCORRECT.to_string(),
        }
    }

    fn expected(model: &str) -> Self {
        Self {
            correct: false,
            feedback: format!("Expected: {model}"),
        }
    }
}

/// Per-item detail in a grading result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrade {
    pub id: i64,
    /// Leading excerpt of the question.
    pub question_text: String,
    pub correct: bool,
    pub user_answer: Option<String>,
    pub model_answer: String,
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

/// Aggregate result of grading one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub score: f64,
    pub max_score: f64,
    pub percent: f64,
    pub items: Vec<ItemGrade>,
}

impl GradingResult {
    /// Per-item details as a JSON array, for storage next to the score.
    pub fn details_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.items)
    }
}

/// Grade answers with default thresholds.
pub fn grade(answers: &[(i64, Option<String>)], records: &HashMap<i64, QuestionRecord>) -> GradingResult {
    grade_with(answers, records, &GradingConfig::default())
}

/// Grade answers in order against their records.
///
/// Every answer counts toward `max_score`. An answer whose record is missing
/// earns no credit and produces no item.
pub fn grade_with(
    answers: &[(i64, Option<String>)],
    records: &HashMap<i64, QuestionRecord>,
    config: &GradingConfig,
) -> GradingResult {
    let mut score = 0.0;
    let mut items = Vec::with_capacity(answers.len());

    for (id, user_answer) in answers {
        let Some(record) = records.get(id) else {
            warn!(id, "no question record for answer, skipping");
            continue;
        };

        let answer = user_answer.as_deref().map(str::trim).unwrap_or("");
        let outcome = grade_one(record, answer, config);
        if outcome.correct {
            score += 1.0;
        }

        items.push(ItemGrade {
            id: *id,
            question_text: excerpt(&record.question_text, config.question_excerpt_chars),
            correct: outcome.correct,
            user_answer: user_answer.clone(),
            model_answer: record.answer_text.clone(),
            feedback: outcome.feedback,
            subject: record.subject.clone(),
            chapter: record.chapter.clone(),
        });
    }

    let max_score = answers.len() as f64;
    let percent = if max_score > 0.0 {
        score / max_score * 100.0
    } else {
        0.0
    };

    debug!(score, max_score, graded = items.len(), "graded attempt");

    GradingResult {
        score,
        max_score,
        percent,
        items,
    }
}

/// Grade a single answer against its record.
pub fn grade_one(record: &QuestionRecord, user_answer: &str, config: &GradingConfig) -> GradeOutcome {
    match record.question_type {
        QuestionType::MultipleChoice => grade_multiple_choice(record, user_answer),
        QuestionType::TrueFalse => grade_true_false(record, user_answer),
        QuestionType::Numeric => grade_numeric(record, user_answer, config),
        QuestionType::FillBlank
        | QuestionType::Short
        | QuestionType::Essay
        | QuestionType::Matching
        | QuestionType::Diagram => grade_text(record, user_answer, config),
    }
}

fn grade_multiple_choice(record: &QuestionRecord, user_answer: &str) -> GradeOutcome {
    let model = normalize(&record.answer_text);
    let user = normalize(user_answer);
    if model == user {
        return GradeOutcome::correct();
    }

    let model_letter = option_index(&model);
    let user_letter = option_index(&user);
    if let (Some(m), Some(u)) = (model_letter, user_letter) {
        return if m == u {
            GradeOutcome::correct()
        } else {
            GradeOutcome::incorrect()
        };
    }

    let options = record.options.as_deref().unwrap_or_default();
    let option_matches = |idx: Option<usize>, other: &str| {
        idx.and_then(|i| options.get(i))
            .is_some_and(|option| normalize(option) == other)
    };
    if option_matches(user_letter, &model) || option_matches(model_letter, &user) {
        return GradeOutcome::correct();
    }

    GradeOutcome::incorrect()
}

/// Index of a lone option letter such as `c`, `c.`, `c)` or `(c)`.
fn option_index(answer: &str) -> Option<usize> {
    let letter = answer
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .or_else(|| answer.strip_suffix(&['.', ')'][..]))
        .unwrap_or(answer);
    match letter {
        "a" => Some(0),
        "b" => Some(1),
        "c" => Some(2),
        "d" => Some(3),
        _ => None,
    }
}

fn grade_true_false(record: &QuestionRecord, user_answer: &str) -> GradeOutcome {
    let model = normalize(&record.answer_text);
    let user = normalize(user_answer);
    let model_true = TRUE_TOKENS.contains(&model.as_str());
    let user_true = TRUE_TOKENS.contains(&user.as_str()) || user == "1";
    if model_true == user_true {
        GradeOutcome::correct()
    } else {
        GradeOutcome::incorrect()
    }
}

fn grade_numeric(record: &QuestionRecord, user_answer: &str, config: &GradingConfig) -> GradeOutcome {
    if let (Some(model), Some(user)) = (parse_number(&record.answer_text), parse_number(user_answer)) {
        return if (model - user).abs() <= config.numeric_tolerance + FLOAT_SLACK {
            GradeOutcome::correct()
        } else {
            GradeOutcome::expected(&model.to_string())
        };
    }

    if normalize(&record.answer_text) == normalize(user_answer) {
        GradeOutcome::correct()
    } else {
        GradeOutcome::expected(&excerpt(&record.answer_text, config.numeric_expected_excerpt_chars))
    }
}

/// First signed decimal in the text, if any.
pub fn parse_number(text: &str) -> Option<f64> {
    NUMBER
        .find(text.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn grade_text(record: &QuestionRecord, user_answer: &str, config: &GradingConfig) -> GradeOutcome {
    let model = normalize(&record.answer_text);
    let user = normalize(user_answer);
    if model == user {
        return GradeOutcome::correct();
    }

    let model_tokens = tokenize(&model);
    if model_tokens.is_empty() {
        return if user.is_empty() {
            GradeOutcome::correct()
        } else {
            GradeOutcome::expected(&excerpt(&record.answer_text, config.expected_excerpt_chars))
        };
    }

    if token_overlap(&model_tokens, &tokenize(&user)) >= config.overlap_threshold {
        GradeOutcome::correct()
    } else {
        GradeOutcome::expected(&excerpt(&record.answer_text, config.expected_excerpt_chars))
    }
}

/// Share of the model's distinct tokens that also appear in the user's answer.
pub fn token_overlap(model: &HashSet<&str>, user: &HashSet<&str>) -> f64 {
    if model.is_empty() {
        return 0.0;
    }
    let shared = model.intersection(user).count();
    shared as f64 / model.len() as f64
}

/// Distinct whitespace-separated tokens longer than one character.
fn tokenize(s: &str) -> HashSet<&str> {
    s.split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .collect()
}

/// Trim, collapse whitespace and lowercase.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn excerpt(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check(record: &QuestionRecord, answer: &str) -> bool {
        grade_one(record, answer, &GradingConfig::default()).correct
    }

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn multiple_choice_resolves_letters_and_text() {
        let record = QuestionRecord::new("Pick one", "C", QuestionType::MultipleChoice)
            .with_options(options(&["Option A", "Option B", "Option C", "Option D"]));
        assert!(check(&record, "c"));
        assert!(check(&record, "Option C"));
        assert!(check(&record, "(c)"));
        assert!(!check(&record, "B"));
        assert!(!check(&record, "Option B"));
    }

    #[test]
    fn multiple_choice_user_letter_resolves_to_model_text() {
        let record = QuestionRecord::new("Capital of India?", "New Delhi", QuestionType::MultipleChoice)
            .with_options(options(&["Mumbai", "New Delhi", "Chennai"]));
        assert!(check(&record, "b"));
        assert!(check(&record, "new  delhi"));
        assert!(!check(&record, "a"));
        // No option for letter d.
        assert!(!check(&record, "d"));
    }

    #[test]
    fn multiple_choice_without_options_needs_exact_match() {
        let record = QuestionRecord::new("Pick", "Paris", QuestionType::MultipleChoice);
        assert!(check(&record, "paris"));
        assert!(!check(&record, "a"));
    }

    #[test]
    fn multiple_choice_with_malformed_option_blob_degrades() {
        let mut record = QuestionRecord::new("Pick", "B", QuestionType::MultipleChoice);
        record.options = QuestionRecord::options_from_json("[\"Red\", \"Bl");
        assert_eq!(record.options, None);
        assert!(check(&record, "b"));
        assert!(!check(&record, "Blue"));
    }

    #[test]
    fn true_false_equivalence() {
        let record = QuestionRecord::new("Sky is blue", "True", QuestionType::TrueFalse);
        assert!(check(&record, "yes"));
        assert!(check(&record, "T"));
        assert!(check(&record, "1"));
        assert!(!check(&record, "false"));

        let record = QuestionRecord::new("Sun is cold", "False", QuestionType::TrueFalse);
        assert!(check(&record, "no"));
        assert!(!check(&record, "true"));
    }

    #[test]
    fn numeric_tolerance_boundary() {
        let record = QuestionRecord::new("Value of pi?", "3.14", QuestionType::Numeric);
        assert!(check(&record, "3.14"));
        assert!(check(&record, "3.15"));
        assert!(check(&record, "about 3.13 I think"));
        let outcome = grade_one(&record, "3.16", &GradingConfig::default());
        assert!(!outcome.correct);
        assert_eq!(outcome.feedback, "Expected: 3.14");
    }

    #[test]
    fn numeric_handles_signs_and_units() {
        let record = QuestionRecord::new("Temperature?", "-40 C", QuestionType::Numeric);
        assert!(check(&record, "-40"));
        assert!(!check(&record, "40"));
    }

    #[test]
    fn numeric_falls_back_to_text_comparison() {
        let record = QuestionRecord::new("Simplify", "x squared", QuestionType::Numeric);
        assert!(check(&record, "X  Squared"));
        let outcome = grade_one(&record, "2x", &GradingConfig::default());
        assert!(!outcome.correct);
        assert_eq!(outcome.feedback, "Expected: x squared");
    }

    #[test]
    fn text_overlap_threshold() {
        let record = QuestionRecord::new(
            "Count",
            "one two three four five six seven eight nine ten",
            QuestionType::Short,
        );
        assert!(!check(&record, "one two three four five six seven"));
        assert!(check(&record, "ten nine eight seven six five four three two one"));
        assert!(check(&record, "one two three four five six seven eight nine"));
    }

    #[test]
    fn text_is_case_and_space_insensitive() {
        let record = QuestionRecord::new("Capital?", "Paris", QuestionType::FillBlank);
        assert!(check(&record, "  PARIS "));
        let outcome = grade_one(&record, "London", &GradingConfig::default());
        assert_eq!(outcome.feedback, "Expected: Paris");
    }

    #[test]
    fn text_with_only_short_tokens_requires_blank_answer() {
        let record = QuestionRecord::new("Letter?", "x", QuestionType::Short);
        assert!(check(&record, "X"));
        assert!(!check(&record, "y"));
        let record = QuestionRecord::new("Nothing", "", QuestionType::Essay);
        assert!(check(&record, ""));
        assert!(!check(&record, "something"));
    }

    #[test]
    fn missing_records_count_toward_max_score() {
        let mut records = HashMap::new();
        records.insert(1, QuestionRecord::new("Capital?", "Paris", QuestionType::Short));
        let answers = vec![(1, Some("Paris".to_string())), (99, Some("anything".to_string()))];
        let result = grade(&answers, &records);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.max_score, 2.0);
        assert_eq!(result.percent, 50.0);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, 1);
    }

    #[test]
    fn empty_attempt_scores_zero_percent() {
        let result = grade(&[], &HashMap::new());
        assert_eq!(result.max_score, 0.0);
        assert_eq!(result.percent, 0.0);
        assert!(result.items.is_empty());
    }

    #[test]
    fn items_follow_input_order_and_keep_raw_answers() {
        let mut records = HashMap::new();
        records.insert(7, QuestionRecord::new("Is water wet? True/False", "True", QuestionType::TrueFalse));
        records.insert(3, QuestionRecord::new(&"Q".repeat(150), "42", QuestionType::Numeric));
        let answers = vec![(7, Some(" no ".to_string())), (3, None)];
        let result = grade(&answers, &records);

        assert_eq!(result.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![7, 3]);
        assert_eq!(result.items[0].user_answer.as_deref(), Some(" no "));
        assert!(!result.items[0].correct);
        assert_eq!(result.items[1].user_answer, None);
        assert_eq!(result.items[1].question_text.chars().count(), 100);
        assert_eq!(result.items[1].feedback, "Expected: 42");
        assert!((0.0..=100.0).contains(&result.percent));
    }

    #[test]
    fn details_json_uses_camel_case_fields() {
        let mut records = HashMap::new();
        records.insert(5, QuestionRecord::new("Capital?", "Paris", QuestionType::Short));
        let result = grade(&[(5, Some("Paris".to_string()))], &records);
        let json: serde_json::Value = serde_json::from_str(&result.details_json().unwrap()).unwrap();
        let item = &json[0];
        assert_eq!(item["id"], 5);
        assert_eq!(item["questionText"], "Capital?");
        assert_eq!(item["correct"], true);
        assert_eq!(item["userAnswer"], "Paris");
        assert_eq!(item["modelAnswer"], "Paris");
        assert_eq!(item["feedback"], "Correct");
    }

    #[test]
    fn parse_number_reads_first_token() {
        assert_eq!(parse_number("x = -2.5 or 3"), Some(-2.5));
        assert_eq!(parse_number("+7 apples"), Some(7.0));
        assert_eq!(parse_number("3."), Some(3.0));
        assert_eq!(parse_number("none"), None);
    }
}
