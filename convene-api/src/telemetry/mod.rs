//! Convene Telemetry
//!
//! Structured JSON logging and Prometheus metrics for the procedure endpoint.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, ConveneMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig};
