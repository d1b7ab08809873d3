//! Queue lifecycle: create (with optional dead-letter queue), list, inspect
//! and delete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use serde_json::json;
use tracing::{error, info};

use super::backend::{resolve_queue_url, QueueAttribute, QueueBackend, DESCRIPTOR_ATTRIBUTES};
use super::types::{QueueCreateSpec, QueueDescriptor};
use crate::error::{error_chain, BackendError, GatewayError, Operation};
use crate::metrics::{Counter, MetricsSink, STATUS_SUCCESS};

/// Orchestrates queue-level operations against the backend.
#[derive(Clone)]
pub struct QueueManager {
    backend: Arc<dyn QueueBackend>,
    metrics: Arc<dyn MetricsSink>,
}

impl QueueManager {
    pub fn new(backend: Arc<dyn QueueBackend>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { backend, metrics }
    }

    /// Create a queue and return its descriptor.
    ///
    /// With a dead-letter queue enabled, `<name>-dlq` is created first so its
    /// ARN can go into the primary queue's redrive policy at creation time.
    /// A dead-letter queue is left in place if the primary creation fails.
    pub async fn create_queue(
        &self,
        spec: &QueueCreateSpec,
    ) -> Result<QueueDescriptor, GatewayError> {
        info!(
            queue = %spec.name,
            dlq_enabled = spec.enable_dead_letter_queue,
            "queue_creating"
        );
        let started = Instant::now();

        let result = self
            .create_queue_chain(spec)
            .await
            .map_err(|e| GatewayError::backend(&spec.name, Operation::Create, e));

        match &result {
            Ok(descriptor) => {
                self.metrics
                    .increment(Counter::QueuesCreated, &spec.name, STATUS_SUCCESS);
                info!(queue = %spec.name, url = %descriptor.url, "queue_created");
            }
            Err(e) => error!(queue = %spec.name, error = %error_chain(e), "queue_create_failed"),
        }
        self.metrics
            .record_duration(&spec.name, Operation::Create, started.elapsed());

        result
    }

    async fn create_queue_chain(
        &self,
        spec: &QueueCreateSpec,
    ) -> Result<QueueDescriptor, BackendError> {
        let mut attributes = HashMap::from([
            (
                QueueAttribute::VisibilityTimeout,
                spec.visibility_timeout_seconds.to_string(),
            ),
            (
                QueueAttribute::MessageRetentionPeriod,
                spec.message_retention_seconds.to_string(),
            ),
        ]);

        if spec.enable_dead_letter_queue {
            let dlq_arn = self.create_dead_letter_queue(&spec.dlq_name()).await?;
            attributes.insert(
                QueueAttribute::RedrivePolicy,
                redrive_policy(&dlq_arn, spec.max_receive_count),
            );
        }

        let url = self.backend.create_queue(&spec.name, attributes).await?;
        self.describe(url).await
    }

    /// Create the dead-letter queue and return its ARN.
    async fn create_dead_letter_queue(&self, dlq_name: &str) -> Result<String, BackendError> {
        info!(queue = %dlq_name, "dlq_creating");

        let url = self.backend.create_queue(dlq_name, HashMap::new()).await?;
        let mut attributes = self
            .backend
            .get_queue_attributes(&url, &[QueueAttribute::QueueArn])
            .await?;

        attributes
            .remove(QueueAttribute::QueueArn.as_str())
            .ok_or_else(|| {
                BackendError::service("GetQueueAttributes", format!("no QueueArn returned for {url}"))
            })
    }

    /// List every queue, fetching all attributes concurrently.
    ///
    /// Descriptors keep the backend's URL order. Any failed fetch fails the
    /// whole listing.
    pub async fn list_queues(&self) -> Result<Vec<QueueDescriptor>, GatewayError> {
        info!("queues_listing");

        let result = async {
            let urls = self.backend.list_queues().await?;
            try_join_all(urls.into_iter().map(|url| self.describe(url))).await
        }
        .await
        .map_err(|e| GatewayError::backend("*", Operation::List, e));

        match &result {
            Ok(queues) => info!(count = queues.len(), "queues_listed"),
            Err(e) => error!(error = %error_chain(e), "queues_list_failed"),
        }
        result
    }

    pub async fn get_queue_attributes(
        &self,
        queue_name: &str,
    ) -> Result<HashMap<String, String>, GatewayError> {
        info!(queue = %queue_name, "queue_attributes_fetching");

        let result = async {
            let url =
                resolve_queue_url(self.backend.as_ref(), queue_name, Operation::GetAttributes).await?;
            self.backend
                .get_queue_attributes(&url, &DESCRIPTOR_ATTRIBUTES)
                .await
                .map_err(|e| GatewayError::backend(queue_name, Operation::GetAttributes, e))
        }
        .await;

        if let Err(e) = &result {
            error!(queue = %queue_name, error = %error_chain(e), "queue_attributes_failed");
        }
        result
    }

    pub async fn delete_queue(&self, queue_name: &str) -> Result<(), GatewayError> {
        info!(queue = %queue_name, "queue_deleting");

        let result = async {
            let url =
                resolve_queue_url(self.backend.as_ref(), queue_name, Operation::DeleteQueue).await?;
            self.backend
                .delete_queue(&url)
                .await
                .map_err(|e| GatewayError::backend(queue_name, Operation::DeleteQueue, e))
        }
        .await;

        match &result {
            Ok(()) => info!(queue = %queue_name, "queue_deleted"),
            Err(e) => error!(queue = %queue_name, error = %error_chain(e), "queue_delete_failed"),
        }
        result
    }

    async fn describe(&self, url: String) -> Result<QueueDescriptor, BackendError> {
        let attributes = self
            .backend
            .get_queue_attributes(&url, &DESCRIPTOR_ATTRIBUTES)
            .await?;
        Ok(QueueDescriptor::new(url, attributes))
    }
}

/// Backend-side link from a queue to its dead-letter queue.
fn redrive_policy(dlq_arn: &str, max_receive_count: u32) -> String {
    json!({
        "deadLetterTargetArn": dlq_arn,
        "maxReceiveCount": max_receive_count,
    })
    .to_string()
}
