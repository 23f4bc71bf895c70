// src/scoring/bonus.rs
//! Ticker relevance bonus for personalized feeds.

use std::collections::BTreeSet;

use crate::config::RankingConfig;
use crate::post::Ticker;

/// 0 when the viewer's ticker is absent (or there is no viewer ticker),
/// `mention_bonus` when mentioned, plus `primary_bonus` when it is also the
/// post's primary ticker.
pub fn stock_bonus(
    mentioned: &BTreeSet<Ticker>,
    primary: Option<&Ticker>,
    viewer: Option<&Ticker>,
    cfg: &RankingConfig,
) -> f64 {
    let Some(viewer) = viewer else {
        return 0.0;
    };
    if !mentioned.contains(viewer) {
        return 0.0;
    }
    if primary == Some(viewer) {
        cfg.mention_bonus + cfg.primary_bonus
    } else {
        cfg.mention_bonus
    }
}
