//! Telemetry: tracing, OTLP export, Prometheus metrics.

pub mod metrics;
pub mod tracing;

pub use metrics::MetricsState;
pub use tracing::init_telemetry;
