//! # Observability Module
//!
//! Structured logging, request tracking and metrics for the Parley node:
//!
//! - **Structured Logging**: pretty or JSON output filtered by `RUST_LOG`
//! - **Request Tracing**: an `x-request-id` carried on every request span
//! - **Metrics**: Prometheus counters, gauges and histograms on `/metrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axum::{middleware, Router};
//! use parley_node::observability::{init_logging, request_id_middleware};
//!
//! init_logging("info", true);
//!
//! let app: Router<()> = Router::new().layer(middleware::from_fn(request_id_middleware));
//! ```

mod logging;
pub mod metrics;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use metrics::{metrics_handler, HttpLabels, MetricsState};
pub use middleware::{metrics_middleware, request_id_middleware, RequestId, REQUEST_ID_HEADER};
