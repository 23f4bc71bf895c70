// src/scoring/recency.rs
//! Freshness in `0..=100`: flat inside the grace window, then exponential
//! decay with a configurable half-life.

use chrono::{DateTime, Utc};
use std::f64::consts::LN_2;

use crate::config::RankingConfig;

pub const MAX_RECENCY: f64 = 100.0;

/// Signed age in fractional hours. Negative for timestamps in the future.
pub fn age_hours(posted_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - posted_at).num_milliseconds() as f64 / 3_600_000.0
}

/// Recency of a post. A missing timestamp counts as infinitely old.
pub fn recency_score(
    posted_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cfg: &RankingConfig,
) -> f64 {
    match posted_at {
        Some(ts) => score_for_age(age_hours(ts, now), cfg),
        None => 0.0,
    }
}

/// `100 * exp(-ln2/half_life * (age - grace))` past the grace window, 100 inside it.
pub fn score_for_age(age_hours: f64, cfg: &RankingConfig) -> f64 {
    if age_hours.is_nan() {
        return 0.0;
    }
    // covers clock skew too: future posts are simply "fresh"
    if age_hours <= cfg.recency_grace_hours {
        return MAX_RECENCY;
    }
    let k = LN_2 / cfg.recency_half_life_hours;
    (MAX_RECENCY * (-k * (age_hours - cfg.recency_grace_hours)).exp()).clamp(0.0, MAX_RECENCY)
}
