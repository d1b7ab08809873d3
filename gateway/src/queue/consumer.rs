//! Receiving and acknowledging messages.
//!
//! A consume call decodes every body in the received batch as JSON. One
//! undecodable body fails the whole call; the batch is not partially returned.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info};

use super::backend::{resolve_queue_url, QueueBackend, RawMessage, ReceiveOptions};
use super::types::{ConsumeSpec, InboundMessage};
use crate::error::{error_chain, GatewayError, Operation};
use crate::metrics::{Counter, MetricsSink, STATUS_ERROR, STATUS_SUCCESS};

#[derive(Clone)]
pub struct Consumer {
    backend: Arc<dyn QueueBackend>,
    metrics: Arc<dyn MetricsSink>,
}

impl Consumer {
    pub fn new(backend: Arc<dyn QueueBackend>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { backend, metrics }
    }

    /// Receive up to `spec.max_messages` messages, in backend order.
    ///
    /// Metrics are recorded only once the queue name has resolved.
    pub async fn consume(
        &self,
        queue_name: &str,
        spec: ConsumeSpec,
    ) -> Result<Vec<InboundMessage>, GatewayError> {
        info!(
            queue = %queue_name,
            max_messages = spec.max_messages,
            wait_time_seconds = spec.wait_time_seconds,
            "messages_consuming"
        );
        let started = Instant::now();

        let resolved =
            resolve_queue_url(self.backend.as_ref(), queue_name, Operation::Consume).await;
        let url = match resolved {
            Ok(url) => url,
            Err(e) => {
                error!(queue = %queue_name, error = %error_chain(&e), "messages_consume_failed");
                return Err(e);
            }
        };

        let result = self.receive(queue_name, &url, spec).await;

        match &result {
            Ok(messages) => {
                self.metrics
                    .increment(Counter::MessagesReceived, queue_name, STATUS_SUCCESS);
                if !messages.is_empty() {
                    self.metrics.set_gauge(queue_name, messages.len() as i64);
                }
                info!(queue = %queue_name, count = messages.len(), "messages_consumed");
            }
            Err(e) => {
                self.metrics
                    .increment(Counter::MessagesReceived, queue_name, STATUS_ERROR);
                error!(queue = %queue_name, error = %error_chain(e), "messages_consume_failed");
            }
        }
        self.metrics
            .record_duration(queue_name, Operation::Consume, started.elapsed());

        result
    }

    async fn receive(
        &self,
        queue_name: &str,
        url: &str,
        spec: ConsumeSpec,
    ) -> Result<Vec<InboundMessage>, GatewayError> {
        let options = ReceiveOptions {
            max_messages: spec.max_messages,
            wait_time_seconds: spec.wait_time_seconds,
            all_attributes: true,
        };
        let raw = self
            .backend
            .receive_messages(url, options)
            .await
            .map_err(|e| GatewayError::backend(queue_name, Operation::Consume, e))?;

        raw.into_iter()
            .map(|message| {
                decode(message)
                    .map_err(|e| GatewayError::serialization(queue_name, Operation::Consume, e))
            })
            .collect()
    }

    /// Delete a received message by its receipt handle.
    ///
    /// Stale or already-used handles are rejected by the backend, not here.
    pub async fn delete_message(
        &self,
        queue_name: &str,
        receipt_handle: &str,
    ) -> Result<(), GatewayError> {
        info!(queue = %queue_name, "message_deleting");

        let result = async {
            let url =
                resolve_queue_url(self.backend.as_ref(), queue_name, Operation::DeleteMessage)
                    .await?;
            self.backend
                .delete_message(&url, receipt_handle)
                .await
                .map_err(|e| GatewayError::backend(queue_name, Operation::DeleteMessage, e))
        }
        .await;

        match &result {
            Ok(()) => info!(queue = %queue_name, "message_deleted"),
            Err(e) => error!(queue = %queue_name, error = %error_chain(e), "message_delete_failed"),
        }
        result
    }
}

fn decode(message: RawMessage) -> Result<InboundMessage, serde_json::Error> {
    let body = serde_json::from_str(&message.body)?;
    Ok(InboundMessage {
        message_id: message.message_id,
        receipt_handle: message.receipt_handle,
        body,
        attributes: message.attributes,
        received_at: Utc::now(),
    })
}
