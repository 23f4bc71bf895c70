// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod post;
pub mod rank;
pub mod telemetry;

// Per-post scorers (recency, engagement, bonus, quality gate, heat)
pub mod scoring;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::{ConfigHandle, RankingConfig};
pub use crate::error::{ConfigError, RankError};
pub use crate::post::{parse_batch, PostBatch, PostRecord, Ticker};
pub use crate::rank::{rank_batch, rank_feed, rank_feed_with_report, RankReport, RankedFeed};
pub use crate::scoring::ScoredPost;
