//! Spaced repetition scheduling.

pub mod sm2;

use crate::types::{Rating, ReviewState};
use chrono::{DateTime, Utc};

/// Result of scheduling a card after review.
#[derive(Debug, Clone)]
pub struct SchedulingResult {
    pub new_state: ReviewState,
    pub next_due: DateTime<Utc>,
}

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate next review state after a review.
    fn schedule(&self, state: &ReviewState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult;

    /// Initial state for a record entering the review pool.
    fn initial_state(&self) -> ReviewState;
}

/// Schedule one review with default SM-2 parameters.
///
/// `quality` is on the 0-3 scale (Again, Hard, Good, Easy); anything outside
/// is clamped.
pub fn schedule(quality: i32, state: &ReviewState, now: DateTime<Utc>) -> ReviewState {
    sm2::Sm2::default()
        .schedule(state, Rating::from_quality(quality), now)
        .new_state
}
