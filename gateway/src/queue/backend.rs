//! Boundary between the gateway and the managed queue service.
//!
//! [`QueueBackend`] lists the only operations the gateway issues. Queues are
//! addressed by name on creation and lookup, and by URL everywhere else.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{BackendError, GatewayError, Operation};

/// Queue attribute names understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueAttribute {
    QueueArn,
    ApproximateNumberOfMessages,
    ApproximateNumberOfMessagesNotVisible,
    ApproximateNumberOfMessagesDelayed,
    CreatedTimestamp,
    VisibilityTimeout,
    MessageRetentionPeriod,
    RedrivePolicy,
}

impl QueueAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAttribute::QueueArn => "QueueArn",
            QueueAttribute::ApproximateNumberOfMessages => "ApproximateNumberOfMessages",
            QueueAttribute::ApproximateNumberOfMessagesNotVisible => {
                "ApproximateNumberOfMessagesNotVisible"
            }
            QueueAttribute::ApproximateNumberOfMessagesDelayed => {
                "ApproximateNumberOfMessagesDelayed"
            }
            QueueAttribute::CreatedTimestamp => "CreatedTimestamp",
            QueueAttribute::VisibilityTimeout => "VisibilityTimeout",
            QueueAttribute::MessageRetentionPeriod => "MessageRetentionPeriod",
            QueueAttribute::RedrivePolicy => "RedrivePolicy",
        }
    }
}

/// Attributes fetched for every queue descriptor and attribute lookup.
pub const DESCRIPTOR_ATTRIBUTES: [QueueAttribute; 5] = [
    QueueAttribute::QueueArn,
    QueueAttribute::ApproximateNumberOfMessages,
    QueueAttribute::ApproximateNumberOfMessagesNotVisible,
    QueueAttribute::ApproximateNumberOfMessagesDelayed,
    QueueAttribute::CreatedTimestamp,
];

/// Parameters of a single receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_messages: i32,
    pub wait_time_seconds: i32,
    /// Request every system attribute of each message.
    pub all_attributes: bool,
}

/// A message as returned by the backend, body still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

/// Async operations against the queue service.
///
/// Implementations must be safe for concurrent use by many requests.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Create a queue and return its URL.
    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<QueueAttribute, String>,
    ) -> Result<String, BackendError>;

    /// Fails with [`BackendError::QueueNotFound`] if no such queue exists.
    async fn get_queue_url(&self, name: &str) -> Result<String, BackendError>;

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        names: &[QueueAttribute],
    ) -> Result<HashMap<String, String>, BackendError>;

    /// All queue URLs in backend order.
    async fn list_queues(&self) -> Result<Vec<String>, BackendError>;

    async fn delete_queue(&self, queue_url: &str) -> Result<(), BackendError>;

    /// Send a message body and return the backend-assigned message id.
    async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError>;

    async fn receive_messages(
        &self,
        queue_url: &str,
        options: ReceiveOptions,
    ) -> Result<Vec<RawMessage>, BackendError>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str)
        -> Result<(), BackendError>;
}

/// Resolve a queue name to its URL. Not cached: every call asks the backend.
pub async fn resolve_queue_url(
    backend: &dyn QueueBackend,
    queue_name: &str,
    operation: Operation,
) -> Result<String, GatewayError> {
    backend
        .get_queue_url(queue_name)
        .await
        .map_err(|e| GatewayError::backend(queue_name, operation, e))
}
