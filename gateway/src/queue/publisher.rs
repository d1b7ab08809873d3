//! Async publisher for enqueueing JSON messages.
//!
//! The publisher is cheap to clone and can be shared across request tasks;
//! the underlying backend client handles connection reuse.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use super::backend::{resolve_queue_url, QueueBackend};
use super::types::OutboundMessage;
use crate::error::{error_chain, GatewayError, Operation};
use crate::metrics::{Counter, MetricsSink, STATUS_ERROR, STATUS_SUCCESS};

#[derive(Clone)]
pub struct Publisher {
    backend: Arc<dyn QueueBackend>,
    metrics: Arc<dyn MetricsSink>,
}

impl Publisher {
    pub fn new(backend: Arc<dyn QueueBackend>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { backend, metrics }
    }

    /// Publish a message to the named queue and return its message id.
    ///
    /// An unencodable body fails with [`GatewayError::Serialization`], a
    /// failed send with [`GatewayError::Backend`]. Metrics are recorded only
    /// once the queue name has resolved.
    pub async fn publish(
        &self,
        queue_name: &str,
        message: &OutboundMessage,
    ) -> Result<String, GatewayError> {
        info!(queue = %queue_name, "message_publishing");
        let started = Instant::now();

        let resolved =
            resolve_queue_url(self.backend.as_ref(), queue_name, Operation::Publish).await;
        let url = match resolved {
            Ok(url) => url,
            Err(e) => {
                error!(queue = %queue_name, error = %error_chain(&e), "message_publish_failed");
                return Err(e);
            }
        };

        let result = self.send(queue_name, &url, message).await;

        match &result {
            Ok(message_id) => {
                self.metrics
                    .increment(Counter::MessagesSent, queue_name, STATUS_SUCCESS);
                info!(queue = %queue_name, message_id = %message_id, "message_published");
            }
            Err(e) => {
                self.metrics
                    .increment(Counter::MessagesSent, queue_name, STATUS_ERROR);
                error!(queue = %queue_name, error = %error_chain(e), "message_publish_failed");
            }
        }
        self.metrics
            .record_duration(queue_name, Operation::Publish, started.elapsed());

        result
    }

    async fn send(
        &self,
        queue_name: &str,
        url: &str,
        message: &OutboundMessage,
    ) -> Result<String, GatewayError> {
        let body = serde_json::to_string(message)
            .map_err(|e| GatewayError::serialization(queue_name, Operation::Publish, e))?;

        self.backend
            .send_message(url, &body)
            .await
            .map_err(|e| GatewayError::backend(queue_name, Operation::Publish, e))
    }
}
