//! Tunable thresholds for extraction, grading and scheduling.
//!
//! Defaults reproduce the stock behaviour. Callers can override them from a
//! JSON document or from `ASSESS_*` environment variables.

use crate::algorithm::sm2::Sm2;
use crate::error::{AssessError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Extractor heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Shortest line that can start a question by ending in `?`.
    pub min_question_line: usize,
    /// Longest line that can start a question by ending in `?`.
    pub max_question_line: usize,
    /// Blocks longer than this are essays.
    pub essay_min_chars: usize,
    /// Blocks longer than this are short answers.
    pub short_min_chars: usize,
    /// Cap on answer text taken after a `?` when no answer marker exists.
    pub max_trailing_answer_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_question_line: 3,
            max_question_line: 200,
            essay_min_chars: 300,
            short_min_chars: 80,
            max_trailing_answer_chars: 500,
        }
    }
}

/// Grading thresholds and feedback excerpt lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Token overlap ratio needed for a text answer to count as correct.
    pub overlap_threshold: f64,
    /// Absolute tolerance for numeric answers.
    pub numeric_tolerance: f64,
    pub question_excerpt_chars: usize,
    pub expected_excerpt_chars: usize,
    pub numeric_expected_excerpt_chars: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.85,
            numeric_tolerance: 0.01,
            question_excerpt_chars: 100,
            expected_excerpt_chars: 80,
            numeric_expected_excerpt_chars: 50,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessConfig {
    pub extractor: ExtractorConfig,
    pub grading: GradingConfig,
    pub sm2: Sm2,
}

impl AssessConfig {
    /// Load from a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overridden by `ASSESS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load defaults overridden by whatever `lookup` returns for each `ASSESS_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_from(&lookup, "ASSESS_MIN_QUESTION_LINE", &mut config.extractor.min_question_line)?;
        override_from(&lookup, "ASSESS_MAX_QUESTION_LINE", &mut config.extractor.max_question_line)?;
        override_from(&lookup, "ASSESS_ESSAY_MIN_CHARS", &mut config.extractor.essay_min_chars)?;
        override_from(&lookup, "ASSESS_SHORT_MIN_CHARS", &mut config.extractor.short_min_chars)?;
        override_from(
            &lookup,
            "ASSESS_MAX_TRAILING_ANSWER_CHARS",
            &mut config.extractor.max_trailing_answer_chars,
        )?;
        override_from(&lookup, "ASSESS_OVERLAP_THRESHOLD", &mut config.grading.overlap_threshold)?;
        override_from(&lookup, "ASSESS_NUMERIC_TOLERANCE", &mut config.grading.numeric_tolerance)?;
        override_from(&lookup, "ASSESS_INITIAL_EASE", &mut config.sm2.initial_ease)?;
        override_from(&lookup, "ASSESS_MINIMUM_EASE", &mut config.sm2.minimum_ease)?;
        override_from(&lookup, "ASSESS_LAPSE_PENALTY", &mut config.sm2.lapse_penalty)?;
        override_from(&lookup, "ASSESS_MAXIMUM_INTERVAL", &mut config.sm2.maximum_interval)?;

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would break the pipeline invariants.
    pub fn validate(&self) -> Result<()> {
        let e = &self.extractor;
        if e.min_question_line > e.max_question_line {
            return Err(AssessError::InvalidConfig {
                key: "min_question_line",
                reason: format!("{} exceeds max_question_line {}", e.min_question_line, e.max_question_line),
            });
        }
        if e.short_min_chars > e.essay_min_chars {
            return Err(AssessError::InvalidConfig {
                key: "short_min_chars",
                reason: format!("{} exceeds essay_min_chars {}", e.short_min_chars, e.essay_min_chars),
            });
        }

        let g = &self.grading;
        if !(0.0..=1.0).contains(&g.overlap_threshold) {
            return Err(AssessError::InvalidConfig {
                key: "overlap_threshold",
                reason: format!("{} is outside 0..=1", g.overlap_threshold),
            });
        }
        if !g.numeric_tolerance.is_finite() || g.numeric_tolerance < 0.0 {
            return Err(AssessError::InvalidConfig {
                key: "numeric_tolerance",
                reason: format!("{} must be a non-negative number", g.numeric_tolerance),
            });
        }

        let s = &self.sm2;
        if s.minimum_ease <= 0.0 {
            return Err(AssessError::InvalidConfig {
                key: "minimum_ease",
                reason: format!("{} must be positive", s.minimum_ease),
            });
        }
        if s.initial_ease < s.minimum_ease {
            return Err(AssessError::InvalidConfig {
                key: "initial_ease",
                reason: format!("{} is below minimum_ease {}", s.initial_ease, s.minimum_ease),
            });
        }
        if s.lapse_penalty < 0.0 {
            return Err(AssessError::InvalidConfig {
                key: "lapse_penalty",
                reason: format!("{} must not be negative", s.lapse_penalty),
            });
        }
        if s.maximum_interval == 0 {
            return Err(AssessError::InvalidConfig {
                key: "maximum_interval",
                reason: "must be at least one day".to_string(),
            });
        }
        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, var: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(var) {
        *slot = raw.trim().parse().map_err(|_| AssessError::InvalidEnv {
            var: var.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = AssessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grading.overlap_threshold, 0.85);
        assert_eq!(config.sm2.minimum_ease, 1.3);
    }

    #[test]
    fn env_overrides_apply() {
        let config = AssessConfig::from_lookup(lookup_from(&[
            ("ASSESS_OVERLAP_THRESHOLD", "0.9"),
            ("ASSESS_ESSAY_MIN_CHARS", " 400 "),
        ]))
        .unwrap();
        assert_eq!(config.grading.overlap_threshold, 0.9);
        assert_eq!(config.extractor.essay_min_chars, 400);
        assert_eq!(config.grading.numeric_tolerance, 0.01);
    }

    #[test]
    fn unparsable_env_value_is_rejected() {
        let result = AssessConfig::from_lookup(lookup_from(&[("ASSESS_NUMERIC_TOLERANCE", "tiny")]));
        assert!(matches!(result, Err(AssessError::InvalidEnv { .. })));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let result = AssessConfig::from_lookup(lookup_from(&[("ASSESS_OVERLAP_THRESHOLD", "1.5")]));
        assert!(matches!(
            result,
            Err(AssessError::InvalidConfig { key: "overlap_threshold", .. })
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AssessConfig::from_json(r#"{"grading": {"numeric_tolerance": 0.5}}"#).unwrap();
        assert_eq!(config.grading.numeric_tolerance, 0.5);
        assert_eq!(config.grading.overlap_threshold, 0.85);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn initial_ease_below_minimum_is_rejected() {
        let result = AssessConfig::from_json(r#"{"sm2": {"initial_ease": 1.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn maximum_interval_comes_from_env_and_must_be_positive() {
        let config = AssessConfig::from_lookup(lookup_from(&[("ASSESS_MAXIMUM_INTERVAL", "365")])).unwrap();
        assert_eq!(config.sm2.maximum_interval, 365);

        let result = AssessConfig::from_lookup(lookup_from(&[("ASSESS_MAXIMUM_INTERVAL", "0")]));
        assert!(matches!(
            result,
            Err(AssessError::InvalidConfig { key: "maximum_interval", .. })
        ));
    }
}
