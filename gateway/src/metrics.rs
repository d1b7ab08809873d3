//! Queue operation metrics.
//!
//! Operations report into a [`MetricsSink`]. Recording is fire-and-forget:
//! a sink never fails the operation it observes.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tracing::warn;

use crate::error::Operation;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// Counters keyed by queue name and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    MessagesSent,
    MessagesReceived,
    QueuesCreated,
}

/// Receiver of queue operation metrics.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: Counter, queue: &str, status: &str);

    fn record_duration(&self, queue: &str, operation: Operation, elapsed: Duration);

    /// Last observed batch size for a queue.
    fn set_gauge(&self, queue: &str, value: i64);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: Counter, _queue: &str, _status: &str) {}

    fn record_duration(&self, _queue: &str, _operation: Operation, _elapsed: Duration) {}

    fn set_gauge(&self, _queue: &str, _value: i64) {}
}

/// Prometheus-backed sink with its own registry.
#[derive(Debug)]
pub struct PrometheusMetrics {
    registry: Registry,
    messages_sent: IntCounterVec,
    messages_received: IntCounterVec,
    queues_created: IntCounterVec,
    processing_duration: HistogramVec,
    queue_size: IntGaugeVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let messages_sent = IntCounterVec::new(
            Opts::new("sqs_messages_sent_total", "Messages published per queue"),
            &["queue_name", "status"],
        )?;
        let messages_received = IntCounterVec::new(
            Opts::new("sqs_messages_received_total", "Consume calls per queue"),
            &["queue_name", "status"],
        )?;
        let queues_created = IntCounterVec::new(
            Opts::new("sqs_queue_created_total", "Queues created"),
            &["queue_name", "status"],
        )?;
        let processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "sqs_message_processing_duration_seconds",
                "Queue operation latency",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 20.0]),
            &["queue_name", "operation"],
        )?;
        let queue_size = IntGaugeVec::new(
            Opts::new("sqs_queue_size", "Messages returned by the last consume call"),
            &["queue_name"],
        )?;

        registry.register(Box::new(messages_sent.clone()))?;
        registry.register(Box::new(messages_received.clone()))?;
        registry.register(Box::new(queues_created.clone()))?;
        registry.register(Box::new(processing_duration.clone()))?;
        registry.register(Box::new(queue_size.clone()))?;

        Ok(Self {
            registry,
            messages_sent,
            messages_received,
            queues_created,
            processing_duration,
            queue_size,
        })
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn counter(&self, counter: Counter) -> &IntCounterVec {
        match counter {
            Counter::MessagesSent => &self.messages_sent,
            Counter::MessagesReceived => &self.messages_received,
            Counter::QueuesCreated => &self.queues_created,
        }
    }
}

impl MetricsSink for PrometheusMetrics {
    fn increment(&self, counter: Counter, queue: &str, status: &str) {
        match self.counter(counter).get_metric_with_label_values(&[queue, status]) {
            Ok(c) => c.inc(),
            Err(e) => warn!(queue = %queue, counter = ?counter, error = %e, "metrics_increment_failed"),
        }
    }

    fn record_duration(&self, queue: &str, operation: Operation, elapsed: Duration) {
        match self
            .processing_duration
            .get_metric_with_label_values(&[queue, operation.as_str()])
        {
            Ok(h) => h.observe(elapsed.as_secs_f64()),
            Err(e) => warn!(queue = %queue, operation = %operation, error = %e, "metrics_duration_failed"),
        }
    }

    fn set_gauge(&self, queue: &str, value: i64) {
        match self.queue_size.get_metric_with_label_values(&[queue]) {
            Ok(g) => g.set(value),
            Err(e) => warn!(queue = %queue, error = %e, "metrics_gauge_failed"),
        }
    }
}
