// src/config.rs
//! Ranking configuration: every tunable of the heat formula, with documented
//! defaults, loaded from TOML or JSON, optionally overridden from env, and
//! validated before any ranking call sees it.
//!
//! Load order:
//! 1) `$RANKING_CONFIG_PATH` (must exist if set)
//! 2) `config/ranking.toml`
//! 3) `config/ranking.json`
//! 4) built-in defaults

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const ENV_RANKING_CONFIG_PATH: &str = "RANKING_CONFIG_PATH";
pub const ENV_RECENCY_WEIGHT: &str = "RANKING_RECENCY_WEIGHT";
pub const ENV_ENGAGEMENT_WEIGHT: &str = "RANKING_ENGAGEMENT_WEIGHT";
pub const ENV_DEFAULT_LIMIT: &str = "RANKING_DEFAULT_LIMIT";
pub const ENV_HOT_RELOAD: &str = "RANKING_HOT_RELOAD";

pub const DEFAULT_TOML_PATH: &str = "config/ranking.toml";
pub const DEFAULT_JSON_PATH: &str = "config/ranking.json";

/// All tunables of the heat formula. Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Posts younger than this keep full recency.
    pub recency_grace_hours: f64,
    /// Hours past the grace window for recency to halve.
    pub recency_half_life_hours: f64,
    /// Votes per engagement unit.
    pub engagement_score_scale: f64,
    /// Comments per engagement unit.
    pub engagement_comment_scale: f64,
    pub engagement_vote_weight: f64,
    pub engagement_comment_weight: f64,
    /// Cap per signal, in units; the combined range maps onto 0..=100.
    pub engagement_unit_cap: f64,
    pub recency_weight: f64,
    pub engagement_weight: f64,
    pub mention_bonus: f64,
    pub primary_bonus: f64,
    pub quality_min_score: i64,
    pub quality_min_comments: u64,
    /// Feed size when the caller does not ask for one.
    pub default_limit: usize,
    /// Upper bound on a requested feed size.
    pub max_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recency_grace_hours: 4.0,
            recency_half_life_hours: 6.0,
            engagement_score_scale: 50.0,
            engagement_comment_scale: 30.0,
            engagement_vote_weight: 0.6,
            engagement_comment_weight: 0.4,
            engagement_unit_cap: 10.0,
            recency_weight: 0.6,
            engagement_weight: 0.4,
            mention_bonus: 5.0,
            primary_bonus: 5.0,
            quality_min_score: 2,
            quality_min_comments: 2,
            default_limit: 50,
            max_limit: 200,
        }
    }
}

impl RankingConfig {
    /// Reject values that would break the scorers (division by zero, NaN, negative weights).
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("recency_half_life_hours", self.recency_half_life_hours)?;
        positive("engagement_score_scale", self.engagement_score_scale)?;
        positive("engagement_comment_scale", self.engagement_comment_scale)?;
        positive("engagement_unit_cap", self.engagement_unit_cap)?;

        for (field, value) in [
            ("recency_grace_hours", self.recency_grace_hours),
            ("engagement_vote_weight", self.engagement_vote_weight),
            ("engagement_comment_weight", self.engagement_comment_weight),
            ("recency_weight", self.recency_weight),
            ("engagement_weight", self.engagement_weight),
            ("mention_bonus", self.mention_bonus),
            ("primary_bonus", self.primary_bonus),
        ] {
            non_negative(field, value)?;
        }

        if self.default_limit == 0 {
            return Err(ConfigError::OutOfRange {
                field: "default_limit",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.max_limit < self.default_limit {
            return Err(ConfigError::OutOfRange {
                field: "max_limit",
                value: self.max_limit as f64,
                reason: "must be >= default_limit",
            });
        }
        Ok(())
    }

    /// Caller-requested feed size, `default_limit` when absent, capped at `max_limit`.
    /// Zero is honored and yields an empty feed.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }

    /// Parse from a string; `hint_ext` picks the format ("json" or anything else → TOML).
    pub fn from_str_with_hint(s: &str, hint_ext: &str, path: &Path) -> Result<Self, ConfigError> {
        let parsed = if hint_ext.eq_ignore_ascii_case("json") {
            serde_json::from_str::<Self>(s).map_err(|e| e.to_string())
        } else {
            toml::from_str::<Self>(s).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Load from an explicit path and validate. No env overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = Self::from_str_with_hint(&content, &ext, path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply the env knobs on top of whatever was loaded. Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(w) = parse_env_f64(std::env::var(ENV_RECENCY_WEIGHT).ok()) {
            self.recency_weight = w;
        }
        if let Some(w) = parse_env_f64(std::env::var(ENV_ENGAGEMENT_WEIGHT).ok()) {
            self.engagement_weight = w;
        }
        if let Some(n) = std::env::var(ENV_DEFAULT_LIMIT)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            self.default_limit = n;
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            reason: "must be finite and > 0",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            reason: "must be finite and >= 0",
        })
    }
}

fn parse_env_f64(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
}

/// Resolve which file to load, following the documented fallbacks.
pub fn resolve_config_path() -> Result<Option<PathBuf>, ConfigError> {
    if let Ok(p) = std::env::var(ENV_RANKING_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(ConfigError::MissingPath(pb));
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return Ok(Some(pb));
        }
    }
    Ok(None)
}

/// Resolve, load, apply env overrides and validate.
pub fn load_default() -> Result<RankingConfig, ConfigError> {
    let mut cfg = match resolve_config_path()? {
        Some(path) => {
            let cfg = RankingConfig::load_from_file(&path)?;
            info!(target: "config", path = %path.display(), "ranking config loaded");
            cfg
        }
        None => {
            info!(target: "config", "no ranking config file, using defaults");
            RankingConfig::default()
        }
    };
    cfg.apply_env_overrides();
    cfg.validate()?;
    Ok(cfg)
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// Shared, swappable config. Each ranking call works on its own snapshot.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<RankingConfig>>,
}

impl ConfigHandle {
    pub fn new(cfg: RankingConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cfg)),
        }
    }

    pub fn snapshot(&self) -> RankingConfig {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a new config after validating it; the old one stays on error.
    pub fn replace(&self, cfg: RankingConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        match self.inner.write() {
            Ok(mut g) => *g = cfg,
            Err(poisoned) => *poisoned.into_inner() = cfg,
        }
        Ok(())
    }

    /// Reload from `path`, reapplying env overrides.
    pub fn reload_from(&self, path: &Path) -> Result<(), ConfigError> {
        let mut cfg = RankingConfig::load_from_file(path)?;
        cfg.apply_env_overrides();
        self.replace(cfg)
    }
}

fn hot_reload_enabled() -> bool {
    std::env::var(ENV_HOT_RELOAD)
        .ok()
        .is_some_and(|v| v.trim() == "1")
}

/// Poll `path` every 2s and swap the config when its mtime moves forward.
/// No-op unless RANKING_HOT_RELOAD=1.
pub fn start_hot_reload_thread(handle: ConfigHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }
    info!(target: "config", path = %path.display(), "ranking config hot reload enabled");

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = match last_mtime {
                    None => false,
                    Some(prev) => mtime > prev,
                };
                if changed {
                    match handle.reload_from(&path) {
                        Ok(()) => info!(target: "config", "ranking config reloaded"),
                        Err(e) => warn!(target: "config", error = %e, "reload rejected, keeping previous config"),
                    }
                }
                last_mtime = Some(mtime);
            }
            thread::sleep(poll);
        }
    });
}
