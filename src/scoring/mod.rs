// src/scoring/mod.rs
//! Per-post scoring: recency, engagement, ticker bonus, quality gate and the
//! heat aggregate that combines them.
//!
//! Every function here is pure; `now` and the config are always passed in.

pub mod bonus;
pub mod engagement;
pub mod heat;
pub mod quality;
pub mod recency;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RankingConfig;
use crate::post::{PostRecord, Ticker};

pub use bonus::stock_bonus;
pub use engagement::engagement_score;
pub use heat::aggregate;
pub use quality::passes;
pub use recency::recency_score;

/// A post with its heat and the sub-scores it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPost<'a> {
    pub post: &'a PostRecord,
    pub heat: f64,
    pub recency_score: f64,
    pub engagement_score: f64,
    pub stock_bonus: f64,
}

/// Score one post. The quality gate is not applied here; see [`crate::rank`].
pub fn score_post<'a>(
    post: &'a PostRecord,
    viewer: Option<&Ticker>,
    now: DateTime<Utc>,
    cfg: &RankingConfig,
) -> ScoredPost<'a> {
    let recency = recency_score(post.posted_at, now, cfg);
    let engagement = engagement_score(post.score, post.num_comments, cfg);
    let bonus = stock_bonus(
        &post.mentioned_stocks,
        post.primary_stock.as_ref(),
        viewer,
        cfg,
    );

    ScoredPost {
        post,
        heat: aggregate(recency, engagement, bonus, cfg),
        recency_score: recency,
        engagement_score: engagement,
        stock_bonus: bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn sub_scores_are_retained() {
        let now = Utc::now();
        let p = PostRecord::new("x", 3, 1, Some(now - Duration::hours(10)))
            .with_stocks(&["AAPL"], Some("AAPL"));
        let viewer = Ticker::parse("aapl");
        let s = score_post(&p, viewer.as_ref(), now, &RankingConfig::default());

        assert!((s.recency_score - 50.0).abs() < 1e-6);
        assert!((s.engagement_score - (0.36 + 4.0 / 30.0)).abs() < 1e-9);
        assert_eq!(s.stock_bonus, 10.0);
        let want = 0.6 * s.recency_score + 0.4 * s.engagement_score + 10.0;
        assert!((s.heat - want).abs() < 1e-12);
    }

    #[test]
    fn serializes_camel_case() {
        let p = PostRecord::new("x", 3, 1, None);
        let s = score_post(&p, None, Utc::now(), &RankingConfig::default());
        let v = serde_json::to_value(&s).unwrap();
        assert!(v.get("recencyScore").is_some());
        assert!(v.get("stockBonus").is_some());
        assert_eq!(v["post"]["numComments"], 1);
    }
}
