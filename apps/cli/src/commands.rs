//! Command implementations. Each takes raw JSON/text and returns JSON text.

use std::collections::HashMap;

use anyhow::Context;
use assessment_core::{
    due_cards, grade_with, parse_with, review_forecast, AssessConfig, QuestionRecord, Rating,
    ReviewState, SpacedRepetitionAlgorithm,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One learner answer as supplied on the command line.
#[derive(Debug, Deserialize)]
pub struct AnswerEntry {
    pub id: i64,
    #[serde(default)]
    pub answer: Option<String>,
}

/// A review state tagged with its record id.
#[derive(Debug, Deserialize)]
pub struct StateEntry {
    pub id: i64,
    #[serde(flatten)]
    pub state: ReviewState,
}

#[derive(Debug, Serialize)]
struct DueReport {
    due: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forecast: Option<Vec<usize>>,
}

pub fn parse_text(text: &str, config: &AssessConfig) -> anyhow::Result<String> {
    let records = parse_with(text, &config.extractor);
    tracing::info!(records = records.len(), "extracted question records");
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn grade_answers(records_json: &str, answers_json: &str, config: &AssessConfig) -> anyhow::Result<String> {
    let records: HashMap<i64, QuestionRecord> =
        serde_json::from_str(records_json).context("parsing question records")?;
    let answers: Vec<AnswerEntry> = serde_json::from_str(answers_json).context("parsing answers")?;
    let answers: Vec<(i64, Option<String>)> = answers.into_iter().map(|a| (a.id, a.answer)).collect();

    let result = grade_with(&answers, &records, &config.grading);
    tracing::info!(score = result.score, max = result.max_score, "graded answers");
    Ok(serde_json::to_string_pretty(&result)?)
}

pub fn review(state_json: &str, quality: i32, now: DateTime<Utc>, config: &AssessConfig) -> anyhow::Result<String> {
    let state = if state_json.trim().is_empty() {
        config.sm2.initial_state()
    } else {
        serde_json::from_str(state_json).context("parsing review state")?
    };
    let result = config.sm2.schedule(&state, Rating::from_quality(quality), now);
    tracing::info!(next_due = %result.next_due, "scheduled review");
    Ok(serde_json::to_string_pretty(&result.new_state)?)
}

pub fn due(states_json: &str, now: DateTime<Utc>, limit: usize, forecast_days: Option<u32>) -> anyhow::Result<String> {
    let entries: Vec<StateEntry> = serde_json::from_str(states_json).context("parsing review states")?;
    let pool: Vec<(i64, ReviewState)> = entries.into_iter().map(|e| (e.id, e.state)).collect();

    let report = DueReport {
        due: due_cards(&pool, now, limit),
        forecast: forecast_days.map(|days| review_forecast(&pool, now, days)),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn parse_text_emits_records() {
        let out = parse_text("1. What is 2 + 3?\nAnswer: 5", &AssessConfig::default()).unwrap();
        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["answer_text"], "5");
        assert_eq!(json[0]["question_type"], "numeric");
    }

    #[test]
    fn grade_answers_reads_keyed_records() {
        let records = r#"{
            "1": {"question_text": "Capital?", "answer_text": "Paris", "question_type": "short"},
            "2": {"question_text": "Pick", "answer_text": "C", "question_type": "multiple_choice",
                  "options": ["A", "B", "Cat", "D"]}
        }"#;
        let answers = r#"[{"id": 1, "answer": "paris"}, {"id": 2, "answer": "Cat"}, {"id": 3}]"#;
        let out = grade_answers(records, answers, &AssessConfig::default()).unwrap();
        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["score"], 2.0);
        assert_eq!(json["max_score"], 3.0);
        assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn grade_answers_rejects_malformed_input() {
        let err = grade_answers("not json", "[]", &AssessConfig::default()).unwrap_err();
        assert!(err.to_string().contains("parsing question records"));
    }

    #[test]
    fn review_starts_from_initial_state_when_empty() {
        let out = review("", 2, now(), &AssessConfig::default()).unwrap();
        let state: ReviewState = serde_json::from_str(&out).unwrap();
        assert_eq!(state.repetitions, 1);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.last_review_at, Some(now()));
    }

    #[test]
    fn review_applies_lapse() {
        let input = r#"{"ease_factor": 2.5, "interval_days": 10, "repetitions": 3}"#;
        let out = review(input, 0, now(), &AssessConfig::default()).unwrap();
        let state: ReviewState = serde_json::from_str(&out).unwrap();
        assert_eq!((state.repetitions, state.interval_days), (0, 1));
    }

    #[test]
    fn due_lists_and_forecasts() {
        let states = r#"[
            {"id": 1, "ease_factor": 2.5, "interval_days": 1, "repetitions": 1,
             "next_review_at": "2026-04-02T09:00:00Z"},
            {"id": 2, "ease_factor": 2.5, "interval_days": 0, "repetitions": 0}
        ]"#;
        let out = due(states, now(), 10, Some(2)).unwrap();
        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["due"], serde_json::json!([]));
        assert_eq!(json["forecast"], serde_json::json!([1, 0]));

        let later = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let out = due(states, later, 10, None).unwrap();
        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["due"], serde_json::json!([1]));
        assert!(json.get("forecast").is_none());
    }
}
