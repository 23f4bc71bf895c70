// src/api.rs
//! HTTP surface for the feed service.
//!
//! - `GET  /health`
//! - `POST /feed/rank`            body: `{ posts, viewer_ticker?, now?, limit? }`
//! - `GET  /debug/config`         current ranking config
//! - `POST /admin/reload-config`  reload from disk (validated)
//!
//! The handler is the only place that reads the wall clock, and only when the
//! caller did not pin `now`.

use std::path::PathBuf;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ConfigHandle;
use crate::error::RankError;
use crate::post::{parse_batch, parse_timestamp, Ticker};
use crate::rank::rank_batch;

#[derive(Clone)]
pub struct AppState {
    pub config: ConfigHandle,
    /// File behind `/admin/reload-config`; `None` when running on defaults.
    pub config_path: Option<PathBuf>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/feed/rank", post(rank_feed_handler))
        .route("/debug/config", get(debug_config))
        .route("/admin/reload-config", post(admin_reload_config))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RankReq {
    #[serde(default)]
    posts: Value,
    #[serde(default, alias = "viewerTicker")]
    viewer_ticker: Option<String>,
    #[serde(default)]
    now: Option<Value>,
    #[serde(default)]
    limit: Option<Value>,
}

/// Maps engine errors onto HTTP status codes.
pub struct ApiError(RankError);

impl From<RankError> for ApiError {
    fn from(e: RankError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RankError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RankError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn viewer_from(raw: Option<&str>) -> Result<Option<Ticker>, RankError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Ticker::parse(s)
            .map(Some)
            .ok_or_else(|| RankError::InvalidInput(format!("invalid viewer ticker `{s}`"))),
    }
}

fn now_from(raw: Option<&Value>) -> Result<DateTime<Utc>, RankError> {
    match raw {
        None | Some(Value::Null) => Ok(Utc::now()),
        Some(v) => parse_timestamp(v)
            .ok_or_else(|| RankError::InvalidInput("unparsable `now` timestamp".into())),
    }
}

/// `limit` must be a non-negative integer when present.
fn limit_from(raw: Option<&Value>) -> Result<Option<usize>, RankError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(usize::try_from(n).unwrap_or(usize::MAX)))
            .ok_or_else(|| {
                RankError::InvalidInput(format!("`limit` must be a non-negative integer, got {v}"))
            }),
    }
}

async fn rank_feed_handler(
    State(state): State<AppState>,
    Json(body): Json<RankReq>,
) -> Result<Response, ApiError> {
    let cfg = state.config.snapshot();
    let viewer = viewer_from(body.viewer_ticker.as_deref())?;
    let now = now_from(body.now.as_ref())?;
    let limit = cfg.effective_limit(limit_from(body.limit.as_ref())?);

    let batch = parse_batch(body.posts)?;
    let feed = rank_batch(&batch, viewer.as_ref(), now, limit, &cfg)?;
    Ok(Json(feed).into_response())
}

async fn debug_config(State(state): State<AppState>) -> Response {
    Json(state.config.snapshot()).into_response()
}

async fn admin_reload_config(State(state): State<AppState>) -> Response {
    let Some(path) = state.config_path.clone() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "no config file in use" })),
        )
            .into_response();
    };

    // file read + parse stays off the async workers
    let handle = state.config.clone();
    let reload_path = path.clone();
    let task = tokio::task::spawn_blocking(move || handle.reload_from(&reload_path));
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(target: "config", error = %e, "admin reload task failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "reload task failed" })),
            )
                .into_response();
        }
    };

    match outcome {
        Ok(()) => {
            info!(target: "config", path = %path.display(), "ranking config reloaded via admin");
            Json(json!({ "status": "reloaded" })).into_response()
        }
        Err(e) => {
            warn!(target: "config", error = %e, "admin reload rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_viewer_means_generic_feed() {
        assert_eq!(viewer_from(None).unwrap(), None);
        assert_eq!(viewer_from(Some("  ")).unwrap(), None);
        assert_eq!(viewer_from(Some("$amd")).unwrap().unwrap().as_str(), "AMD");
        assert!(viewer_from(Some("not a ticker")).is_err());
    }

    #[test]
    fn now_is_pinned_when_given() {
        let t = now_from(Some(&json!("2025-01-02T03:04:05Z"))).unwrap();
        assert_eq!(t.to_rfc3339(), "2025-01-02T03:04:05+00:00");
        assert!(now_from(Some(&json!("soon"))).is_err());
    }

    #[test]
    fn limit_must_be_a_non_negative_integer() {
        assert_eq!(limit_from(None).unwrap(), None);
        assert_eq!(limit_from(Some(&Value::Null)).unwrap(), None);
        assert_eq!(limit_from(Some(&json!(0))).unwrap(), Some(0));
        assert_eq!(limit_from(Some(&json!(25))).unwrap(), Some(25));
        for bad in [json!(-1), json!(2.5), json!("10")] {
            assert!(matches!(limit_from(Some(&bad)), Err(RankError::InvalidInput(_))), "{bad}");
        }
    }
}
