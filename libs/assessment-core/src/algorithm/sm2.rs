//! SM-2 spaced repetition algorithm.
//!
//! Ratings on the 0-3 scale map onto SM-2 response grades 0, 3, 4 and 5. Only
//! grades below 3 count as a lapse, so "Hard" keeps the streak going.

use super::{SchedulingResult, SpacedRepetitionAlgorithm};
use crate::types::{Rating, ReviewState};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    /// Ease subtracted on a lapse.
    pub lapse_penalty: f64,
    /// Interval after the first successful review.
    pub first_interval: u32,
    /// Interval after the second successful review.
    pub second_interval: u32,
    pub lapse_interval: u32,
    /// Upper bound on any interval, in days.
    pub maximum_interval: u32,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            minimum_ease: 1.3,
            lapse_penalty: 0.2,
            first_interval: 1,
            second_interval: 6,
            lapse_interval: 1,
            maximum_interval: 36_500,
        }
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self) -> ReviewState {
        ReviewState {
            ease_factor: self.initial_ease,
            ..Default::default()
        }
    }

    fn schedule(&self, state: &ReviewState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult {
        let grade = rating.sm2_grade();

        let (ease_factor, interval_days, repetitions) = if grade < 3 {
            self.schedule_lapse(state)
        } else {
            self.schedule_pass(state, grade)
        };

        let interval_days = interval_days.min(self.maximum_interval);
        // Saturate rather than overflow past chrono's last representable instant.
        let next_due = now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        trace!(?rating, ease_factor, interval_days, repetitions, "scheduled review");

        SchedulingResult {
            new_state: ReviewState {
                ease_factor,
                interval_days,
                repetitions,
                next_review_at: Some(next_due),
                last_review_at: Some(now),
            },
            next_due,
        }
    }
}

impl Sm2 {
    fn schedule_lapse(&self, state: &ReviewState) -> (f64, u32, u32) {
        let ease = (state.ease_factor - self.lapse_penalty).max(self.minimum_ease);
        (ease, self.lapse_interval, 0)
    }

    fn schedule_pass(&self, state: &ReviewState, grade: u8) -> (f64, u32, u32) {
        let distance = f64::from(5 - grade);
        let ease = (state.ease_factor + (0.1 - distance * (0.08 + distance * 0.02)))
            .max(self.minimum_ease);

        // Interval depends on the streak before this review.
        let interval = match state.repetitions {
            0 => self.first_interval,
            1 => self.second_interval,
            _ => ((f64::from(state.interval_days) * ease).round() as u32).max(1),
        };
        (ease, interval, state.repetitions.saturating_add(1))
    }
}
