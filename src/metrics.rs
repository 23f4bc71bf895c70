// src/metrics.rs
//! Prometheus exposition for ranking diagnostics.
//!
//! The `metrics` macros are no-ops until a recorder is installed, so the pure
//! engine can call them unconditionally (tests included).

use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::rank::RankReport;

pub const RANK_REQUESTS_TOTAL: &str = "feed_rank_requests_total";
pub const GATE_REJECTED_TOTAL: &str = "feed_gate_rejected_total";
pub const DEGRADED_RECORDS_TOTAL: &str = "feed_degraded_records_total";
pub const RANK_DURATION_MS: &str = "feed_rank_duration_ms";
pub const LAST_BATCH_SIZE: &str = "feed_last_batch_size";

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder (once); later calls reuse it.
    pub fn install() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub(crate) fn record_rank(report: &RankReport, elapsed: Duration) {
    counter!(RANK_REQUESTS_TOTAL).increment(1);
    counter!(GATE_REJECTED_TOTAL).increment(report.gated_out as u64);
    gauge!(LAST_BATCH_SIZE).set(report.received as f64);
    histogram!(RANK_DURATION_MS).record(elapsed.as_secs_f64() * 1_000.0);
}

/// Boundary-level degradations, labelled by cause.
pub(crate) fn record_degraded(report: &RankReport) {
    for (reason, n) in [
        ("malformed", report.malformed),
        ("timestamp", report.degraded_timestamps),
        ("stocks", report.degraded_stocks),
    ] {
        if n > 0 {
            counter!(DEGRADED_RECORDS_TOTAL, "reason" => reason).increment(n as u64);
        }
    }
}
