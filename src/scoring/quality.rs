// src/scoring/quality.rs
//! Binary engagement floor applied before scoring.

use crate::config::RankingConfig;

/// Eligible when either signal reaches its configured minimum.
pub fn passes(score: i64, num_comments: u64, cfg: &RankingConfig) -> bool {
    score >= cfg.quality_min_score || num_comments >= cfg.quality_min_comments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_signal_is_enough() {
        let c = RankingConfig::default();
        assert!(passes(2, 0, &c));
        assert!(passes(0, 2, &c));
        assert!(passes(-50, 3, &c));
        assert!(!passes(1, 1, &c));
        assert!(!passes(0, 1, &c));
        assert!(!passes(-5, 0, &c));
    }

    #[test]
    fn thresholds_come_from_config() {
        let c = RankingConfig {
            quality_min_score: 10,
            quality_min_comments: 10,
            ..RankingConfig::default()
        };
        assert!(!passes(9, 9, &c));
        assert!(passes(10, 0, &c));
    }
}
