// src/scoring/heat.rs
use crate::config::RankingConfig;

/// Weighted base plus the additive ticker bonus.
pub fn aggregate(recency: f64, engagement: f64, bonus: f64, cfg: &RankingConfig) -> f64 {
    cfg.recency_weight * recency + cfg.engagement_weight * engagement + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights() {
        let c = RankingConfig::default();
        assert!((aggregate(100.0, 100.0, 0.0, &c) - 100.0).abs() < 1e-9);
        assert!((aggregate(50.0, 0.0, 10.0, &c) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn bonus_is_not_weighted() {
        let c = RankingConfig {
            recency_weight: 0.0,
            engagement_weight: 0.0,
            ..RankingConfig::default()
        };
        assert_eq!(aggregate(80.0, 80.0, 5.0, &c), 5.0);
    }
}
