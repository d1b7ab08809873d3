//! SQS Gateway - REST façade over Amazon SQS.
//!
//! Exposes queue creation (optionally with a dead-letter queue), listing,
//! inspection and deletion, plus message publishing, consuming and deletion,
//! as JSON endpoints. Every operation is a short chain of async SQS calls.
//!
//! ## Architecture
//!
//! ```text
//! HTTP → web handlers → QueueManager / Publisher / Consumer → SqsBackend → SQS
//!                                    ↓
//!                           PrometheusMetrics (/metrics)
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{BackendError, GatewayError, Operation};
pub use metrics::{MetricsSink, NoopMetrics, PrometheusMetrics};
pub use queue::{Consumer, Publisher, QueueBackend, QueueManager, SqsBackend};
pub use web::AppState;
