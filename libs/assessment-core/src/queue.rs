//! Due-card selection and review forecasts over a set of scheduled records.

use crate::types::ReviewState;
use chrono::{DateTime, Duration, Utc};

/// Ids of records due at `now`, oldest due date first, at most `limit` of them.
///
/// Records that were never scheduled are not due. Ties keep input order.
pub fn due_cards(items: &[(i64, ReviewState)], now: DateTime<Utc>, limit: usize) -> Vec<i64> {
    let mut due: Vec<&(i64, ReviewState)> = items.iter().filter(|(_, state)| state.is_due(now)).collect();
    due.sort_by_key(|(_, state)| state.next_review_at);
    due.into_iter().take(limit).map(|(id, _)| *id).collect()
}

/// Number of records due at `now`.
pub fn due_count(items: &[(i64, ReviewState)], now: DateTime<Utc>) -> usize {
    items.iter().filter(|(_, state)| state.is_due(now)).count()
}

/// Count of records falling due on each of the next `days` days.
///
/// Day `d` covers `(now + d days, now + d + 1 days]`. Records already due and
/// records never scheduled are not counted. The forecast stops early if a day
/// would run past the last representable date.
pub fn review_forecast(items: &[(i64, ReviewState)], now: DateTime<Utc>, days: u32) -> Vec<usize> {
    let mut day_start = now;
    (0..days)
        .map_while(|_| {
            let day_end = day_start.checked_add_signed(Duration::days(1))?;
            let count = items
                .iter()
                .filter(|(_, state)| {
                    state
                        .next_review_at
                        .is_some_and(|due| due > day_start && due <= day_end)
                })
                .count();
            day_start = day_end;
            Some(count)
        })
        .collect()
}
