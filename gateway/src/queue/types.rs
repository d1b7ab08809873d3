//! Request and response value objects.
//!
//! Inbound requests arrive as partial, loosely-typed structs
//! ([`CreateQueueRequest`], [`ConsumeRequest`]). `normalize` fills omitted
//! fields with their defaults, validates ranges and produces the immutable
//! value object the orchestration layer works with.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::GatewayError;

/// Suffix appended to a queue name to form its dead-letter queue name.
pub const DLQ_SUFFIX: &str = "-dlq";

pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 3;
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u32 = 30;
/// Four days.
pub const DEFAULT_MESSAGE_RETENTION_SECONDS: u32 = 345_600;

pub const DEFAULT_MAX_MESSAGES: i32 = 1;
pub const DEFAULT_WAIT_TIME_SECONDS: i32 = 0;
pub const MAX_MESSAGES_LIMIT: i32 = 10;
pub const WAIT_TIME_LIMIT_SECONDS: i32 = 20;

// =============================================================================
// Queue Creation
// =============================================================================

/// Create-queue request as received over HTTP. Every field except the name
/// is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueRequest {
    #[serde(alias = "name")]
    pub queue_name: Option<String>,
    #[serde(alias = "enableDeadLetterQueue")]
    pub enable_dlq: Option<bool>,
    pub max_receive_count: Option<i64>,
    pub visibility_timeout_seconds: Option<i64>,
    #[serde(alias = "messageRetentionSeconds")]
    pub message_retention_period_seconds: Option<i64>,
}

impl CreateQueueRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            queue_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Apply defaults and validate.
    ///
    /// Explicit values are kept as given, including `false` and `0`.
    pub fn normalize(self) -> Result<QueueCreateSpec, GatewayError> {
        let name = match self.queue_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(GatewayError::Validation("queue name is required".to_string())),
        };

        let max_receive_count = match self.max_receive_count {
            None => DEFAULT_MAX_RECEIVE_COUNT,
            Some(n) if n >= 1 => to_u32("maxReceiveCount", n)?,
            Some(n) => {
                return Err(GatewayError::Validation(format!(
                    "maxReceiveCount must be at least 1, got {n}"
                )))
            }
        };

        let visibility_timeout_seconds = match self.visibility_timeout_seconds {
            None => DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
            Some(n) => to_u32("visibilityTimeoutSeconds", n)?,
        };

        let message_retention_seconds = match self.message_retention_period_seconds {
            None => DEFAULT_MESSAGE_RETENTION_SECONDS,
            Some(n) => to_u32("messageRetentionPeriodSeconds", n)?,
        };

        Ok(QueueCreateSpec {
            name,
            enable_dead_letter_queue: self.enable_dlq.unwrap_or(false),
            max_receive_count,
            visibility_timeout_seconds,
            message_retention_seconds,
        })
    }
}

fn to_u32(field: &str, value: i64) -> Result<u32, GatewayError> {
    u32::try_from(value).map_err(|_| {
        GatewayError::Validation(format!("{field} must be a non-negative 32-bit value, got {value}"))
    })
}

/// Fully-defaulted, validated queue creation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueCreateSpec {
    pub name: String,
    pub enable_dead_letter_queue: bool,
    /// Only meaningful when `enable_dead_letter_queue` is set.
    pub max_receive_count: u32,
    pub visibility_timeout_seconds: u32,
    pub message_retention_seconds: u32,
}

impl QueueCreateSpec {
    pub fn dlq_name(&self) -> String {
        format!("{}{}", self.name, DLQ_SUFFIX)
    }
}

/// A queue and its attributes as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDescriptor {
    #[serde(rename = "queueUrl")]
    pub url: String,
    #[serde(rename = "queueName")]
    pub name: String,
    pub attributes: HashMap<String, String>,
    /// Stamped when the descriptor is built, not read from the backend.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl QueueDescriptor {
    pub fn new(url: String, attributes: HashMap<String, String>) -> Self {
        Self {
            name: queue_name_from_url(&url),
            url,
            attributes,
            created_at: Utc::now(),
        }
    }
}

/// The queue name is the final path segment of its URL.
pub fn queue_name_from_url(queue_url: &str) -> String {
    let from_path = Url::parse(queue_url).ok().and_then(|url| {
        url.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|segment| !segment.is_empty())
    });

    from_path.unwrap_or_else(|| {
        queue_url
            .rsplit('/')
            .next()
            .unwrap_or(queue_url)
            .to_string()
    })
}

// =============================================================================
// Consumption
// =============================================================================

/// Consume request as received over HTTP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub max_messages: Option<i64>,
    pub wait_time_seconds: Option<i64>,
}

impl ConsumeRequest {
    pub fn normalize(self) -> Result<ConsumeSpec, GatewayError> {
        let max_messages = match self.max_messages {
            None => DEFAULT_MAX_MESSAGES,
            Some(n) if (1..=MAX_MESSAGES_LIMIT as i64).contains(&n) => n as i32,
            Some(n) => {
                return Err(GatewayError::Validation(format!(
                    "maxMessages must be between 1 and {MAX_MESSAGES_LIMIT}, got {n}"
                )))
            }
        };

        let wait_time_seconds = match self.wait_time_seconds {
            None => DEFAULT_WAIT_TIME_SECONDS,
            Some(n) if (0..=WAIT_TIME_LIMIT_SECONDS as i64).contains(&n) => n as i32,
            Some(n) => {
                return Err(GatewayError::Validation(format!(
                    "waitTimeSeconds must be between 0 and {WAIT_TIME_LIMIT_SECONDS}, got {n}"
                )))
            }
        };

        Ok(ConsumeSpec {
            max_messages,
            wait_time_seconds,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeSpec {
    /// 1..=10
    pub max_messages: i32,
    /// 0..=20
    pub wait_time_seconds: i32,
}

impl Default for ConsumeSpec {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Message to publish. Its keys are the top-level keys of the JSON text sent
/// to the queue; there is no wrapping `body` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboundMessage {
    pub body: Map<String, Value>,
}

impl From<Map<String, Value>> for OutboundMessage {
    fn from(body: Map<String, Value>) -> Self {
        Self { body }
    }
}

/// A received message with its body decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub message_id: String,
    /// Single-use token required to delete this receipt of the message.
    pub receipt_handle: String,
    pub body: Value,
    pub attributes: HashMap<String, String>,
    pub received_at: DateTime<Utc>,
}

/// Response body for a successful publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub message_id: String,
}
