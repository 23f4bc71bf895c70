// src/rank.rs
//! # Ranker
//! Pure, testable feed assembly: gate → score → sort → truncate.
//! No I/O and no clock reads; `now` is an argument so repeated polls against
//! the same input produce the same order.
//!
//! Ordering is total: heat desc, then `posted_at` desc (undated last), then
//! `id` asc.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::debug;

use crate::config::RankingConfig;
use crate::error::RankError;
use crate::metrics;
use crate::post::{PostBatch, PostRecord, Ticker};
use crate::scoring::{passes, score_post, ScoredPost};

/// Per-call diagnostics. Never shown to end users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankReport {
    pub received: usize,
    pub malformed: usize,
    pub degraded_timestamps: usize,
    pub degraded_stocks: usize,
    pub undated: usize,
    pub gated_out: usize,
    pub returned: usize,
}

/// Ranked feed plus its report, ready to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFeed<'a> {
    pub posts: Vec<ScoredPost<'a>>,
    pub report: RankReport,
}

/// Total order used by the feed.
pub fn compare(a: &ScoredPost<'_>, b: &ScoredPost<'_>) -> Ordering {
    b.heat
        .total_cmp(&a.heat)
        .then_with(|| b.post.posted_at.cmp(&a.post.posted_at))
        .then_with(|| a.post.id.cmp(&b.post.id))
}

/// Sort, then truncate. Truncating first could drop a hotter post.
pub fn rank<'a>(mut scored: Vec<ScoredPost<'a>>, limit: usize) -> Vec<ScoredPost<'a>> {
    scored.sort_by(compare);
    scored.truncate(limit);
    scored
}

/// Rank typed records. Fails with [`RankError::Config`] before scoring
/// anything when `cfg` is out of range.
pub fn rank_feed<'a>(
    posts: &'a [PostRecord],
    viewer: Option<&Ticker>,
    now: DateTime<Utc>,
    limit: usize,
    cfg: &RankingConfig,
) -> Result<Vec<ScoredPost<'a>>, RankError> {
    Ok(rank_feed_with_report(posts, viewer, now, limit, cfg)?.0)
}

/// Same as [`rank_feed`] but also returns the call's diagnostics.
pub fn rank_feed_with_report<'a>(
    posts: &'a [PostRecord],
    viewer: Option<&Ticker>,
    now: DateTime<Utc>,
    limit: usize,
    cfg: &RankingConfig,
) -> Result<(Vec<ScoredPost<'a>>, RankReport), RankError> {
    cfg.validate()?;
    let started = Instant::now();
    let mut report = RankReport {
        received: posts.len(),
        ..RankReport::default()
    };

    let mut scored = Vec::with_capacity(posts.len());
    for post in posts {
        if post.posted_at.is_none() {
            report.undated += 1;
        }
        if !passes(post.score, post.num_comments, cfg) {
            report.gated_out += 1;
            continue;
        }
        scored.push(score_post(post, viewer, now, cfg));
    }

    let ranked = rank(scored, limit);
    report.returned = ranked.len();

    debug!(
        target: "feed",
        received = report.received,
        gated_out = report.gated_out,
        returned = report.returned,
        personalized = viewer.is_some(),
        "feed ranked"
    );
    metrics::record_rank(&report, started.elapsed());

    Ok((ranked, report))
}

/// Rank a parsed batch, folding the boundary diagnostics into the report.
pub fn rank_batch<'a>(
    batch: &'a PostBatch,
    viewer: Option<&Ticker>,
    now: DateTime<Utc>,
    limit: usize,
    cfg: &RankingConfig,
) -> Result<RankedFeed<'a>, RankError> {
    let (posts, mut report) = rank_feed_with_report(&batch.posts, viewer, now, limit, cfg)?;
    report.received += batch.malformed;
    report.malformed = batch.malformed;
    report.degraded_timestamps = batch.degraded_timestamps;
    report.degraded_stocks = batch.degraded_stocks;
    metrics::record_degraded(&report);
    Ok(RankedFeed { posts, report })
}
