//! Application metrics using the metrics crate.

use axum::{http::StatusCode, response::IntoResponse};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Clone)]
pub struct MetricsState {
    handle: Option<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { handle: None };
        }

        let handle = PROMETHEUS_HANDLE.get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("Failed to install Prometheus recorder")
        });

        Self {
            handle: Some(handle.clone()),
        }
    }

    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(|h| h.render())
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }
}

pub async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<MetricsState>,
) -> impl IntoResponse {
    match state.render() {
        Some(metrics) => (StatusCode::OK, metrics),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not enabled".to_string(),
        ),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ClaimOutcome {
    Won,
    Conflict,
    NotFound,
    Invalid,
    Replayed,
    Error,
}

impl ClaimOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Won => "won",
            ClaimOutcome::Conflict => "conflict",
            ClaimOutcome::NotFound => "not_found",
            ClaimOutcome::Invalid => "invalid",
            ClaimOutcome::Replayed => "replayed",
            ClaimOutcome::Error => "error",
        }
    }
}

pub fn record_claim_attempt(outcome: ClaimOutcome) {
    counter!(
        "claim_attempts_total",
        "outcome" => outcome.as_str().to_string()
    )
    .increment(1);
}

pub fn record_cancel(reason: &str) {
    counter!(
        "claim_cancellations_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_delivery(outcome: &str) {
    counter!(
        "outbox_deliveries_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// `route` is the bounded label produced by the metrics middleware, not the
/// raw request path.
pub fn record_request_latency(
    method: &str,
    route: &str,
    status: u16,
    duration: std::time::Duration,
) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_outcome_as_str() {
        assert_eq!(ClaimOutcome::Won.as_str(), "won");
        assert_eq!(ClaimOutcome::Conflict.as_str(), "conflict");
        assert_eq!(ClaimOutcome::Replayed.as_str(), "replayed");
    }

    #[test]
    fn test_metrics_state_disabled() {
        let state = MetricsState::disabled();
        assert!(!state.is_enabled());
        assert!(state.render().is_none());
    }
}
