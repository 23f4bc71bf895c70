// src/scoring/engagement.rs
//! Popularity in `0..=100` from votes and comments, each capped so one viral
//! thread cannot swamp the feed.
//!
//! With defaults: `min(score/50, 10) * 6 + min(comments/30, 10) * 4`.

use crate::config::RankingConfig;

pub const MAX_ENGAGEMENT: f64 = 100.0;

/// Capped units for one signal. Negative vote totals stay negative here and
/// are absorbed by the final clamp.
fn units(raw: f64, scale: f64, cap: f64) -> f64 {
    (raw / scale).min(cap)
}

pub fn engagement_score(score: i64, num_comments: u64, cfg: &RankingConfig) -> f64 {
    let cap = cfg.engagement_unit_cap;
    let votes = units(score as f64, cfg.engagement_score_scale, cap);
    let comments = units(num_comments as f64, cfg.engagement_comment_scale, cap);

    let combined = votes * cfg.engagement_vote_weight + comments * cfg.engagement_comment_weight;
    (combined * (MAX_ENGAGEMENT / cap)).clamp(0.0, MAX_ENGAGEMENT)
}
