//! Feed ranking service: binary entrypoint.
//! Loads the ranking config, wires the Axum router and Prometheus metrics.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;

use feed_heat_ranker::{
    api::{self, AppState},
    config::{self, start_hot_reload_thread, ConfigHandle},
    metrics::Metrics,
    telemetry::{self, LogFormat},
};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    if !telemetry::init_tracing(LogFormat::from_env()) {
        eprintln!("tracing subscriber already installed; keeping it");
    }

    let config_path = config::resolve_config_path().context("resolving ranking config path")?;
    let cfg = config::load_default().context("loading ranking config")?;
    info!(
        target: "config",
        recency_weight = cfg.recency_weight,
        engagement_weight = cfg.engagement_weight,
        default_limit = cfg.default_limit,
        "ranking config ready"
    );

    let handle = ConfigHandle::new(cfg);
    if let Some(path) = config_path.clone() {
        start_hot_reload_thread(handle.clone(), path);
    }

    let metrics = Metrics::install()?;

    let state = AppState {
        config: handle,
        config_path,
    };
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
