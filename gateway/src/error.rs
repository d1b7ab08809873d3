//! Error types for the gateway.
//!
//! Backend calls fail with [`BackendError`]. The orchestration layer wraps
//! each failure exactly once into a [`GatewayError`] carrying the queue name
//! and the [`Operation`] that failed.

use std::fmt;

use thiserror::Error;

/// Orchestrated operations, also used as the `operation` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    List,
    GetAttributes,
    DeleteQueue,
    Publish,
    Consume,
    DeleteMessage,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::GetAttributes => "get_attributes",
            Operation::DeleteQueue => "delete_queue",
            Operation::Publish => "publish",
            Operation::Consume => "consume",
            Operation::DeleteMessage => "delete_message",
        }
    }

    /// Read paths report an unresolvable queue name as not found.
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::GetAttributes | Operation::Consume)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the queue backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("queue does not exist: {0}")]
    QueueNotFound(String),

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
}

impl BackendError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        BackendError::Service {
            operation,
            message: message.into(),
        }
    }
}

/// Failure surfaced by the orchestrator, publisher and consumer.
///
/// The `Display` output names the operation and queue only; backend details
/// stay in the source chain for logging.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or out-of-range input, rejected before any backend call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The queue name did not resolve to a URL on a read path.
    #[error("queue not found: {queue}")]
    NotFound { queue: String },

    /// A message body could not be encoded or decoded as JSON.
    #[error("{operation} failed for queue {queue}: message body is not valid JSON")]
    Serialization {
        queue: String,
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} failed for queue {queue}")]
    Backend {
        queue: String,
        operation: Operation,
        #[source]
        source: BackendError,
    },
}

impl GatewayError {
    /// Wrap a backend failure with its queue and operation context.
    ///
    /// On read paths an unresolvable queue name becomes
    /// [`GatewayError::NotFound`]; writes keep it as a backend failure.
    pub fn backend(queue: impl Into<String>, operation: Operation, source: BackendError) -> Self {
        let queue = queue.into();
        match source {
            BackendError::QueueNotFound(_) if operation.is_read() => {
                GatewayError::NotFound { queue }
            }
            source => GatewayError::Backend {
                queue,
                operation,
                source,
            },
        }
    }

    pub fn serialization(
        queue: impl Into<String>,
        operation: Operation,
        source: serde_json::Error,
    ) -> Self {
        GatewayError::Serialization {
            queue: queue.into(),
            operation,
            source,
        }
    }
}

/// Render an error together with its full source chain.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
