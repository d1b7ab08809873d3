//! REST endpoint handlers.
//!
//! Handlers normalize the request, hand it to the queue manager, publisher or
//! consumer, and map the outcome to a status code. Validation failures are
//! answered before any queue service call is made.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info};

use crate::error::GatewayError;
use crate::metrics::{MetricsSink, PrometheusMetrics};
use crate::queue::{
    ConsumeRequest, Consumer, CreateQueueRequest, InboundMessage, OutboundMessage,
    PublishResponse, Publisher, QueueBackend, QueueDescriptor, QueueManager,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queues: QueueManager,
    pub publisher: Publisher,
    pub consumer: Consumer,
    pub metrics: Arc<PrometheusMetrics>,
}

impl AppState {
    pub fn new(backend: Arc<dyn QueueBackend>, metrics: Arc<PrometheusMetrics>) -> Self {
        let sink: Arc<dyn MetricsSink> = metrics.clone();
        Self {
            queues: QueueManager::new(backend.clone(), sink.clone()),
            publisher: Publisher::new(backend.clone(), sink.clone()),
            consumer: Consumer::new(backend, sink),
            metrics,
        }
    }
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Serialization { .. } | GatewayError::Backend { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                status: "error",
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Decode an optional JSON request body. An empty body yields the default.
fn json_body<T>(body: &Bytes) -> Result<T, GatewayError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::Validation(format!("malformed request body: {e}")))
}

// =============================================================================
// Health & Metrics
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics_render_failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Queues
// =============================================================================

/// `POST /api/queues`
pub async fn create_queue(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<QueueDescriptor>), GatewayError> {
    let spec = json_body::<CreateQueueRequest>(&body)?.normalize()?;
    info!(queue = %spec.name, "create_queue_requested");

    let descriptor = state.queues.create_queue(&spec).await?;
    Ok((StatusCode::CREATED, Json(descriptor)))
}

/// `GET /api/queues`
pub async fn list_queues(
    State(state): State<AppState>,
) -> Result<Json<Vec<QueueDescriptor>>, GatewayError> {
    Ok(Json(state.queues.list_queues().await?))
}

/// `GET /api/queues/:queue_name/attributes`
pub async fn get_queue_attributes(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
) -> Result<Json<HashMap<String, String>>, GatewayError> {
    Ok(Json(state.queues.get_queue_attributes(&queue_name).await?))
}

/// `DELETE /api/queues/:queue_name`
pub async fn delete_queue(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
) -> Result<StatusCode, GatewayError> {
    state.queues.delete_queue(&queue_name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Messages
// =============================================================================

/// `POST /api/queues/:queue_name/messages`
///
/// The request body is the message itself, any JSON object.
pub async fn publish_message(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishResponse>), GatewayError> {
    let message = json_body::<OutboundMessage>(&body)?;

    let message_id = state.publisher.publish(&queue_name, &message).await?;
    Ok((StatusCode::CREATED, Json(PublishResponse { message_id })))
}

/// `POST /api/queues/:queue_name/consume`
///
/// The body is optional; omitted fields take their defaults.
pub async fn consume_messages(
    State(state): State<AppState>,
    Path(queue_name): Path<String>,
    body: Bytes,
) -> Result<Json<Vec<InboundMessage>>, GatewayError> {
    let spec = json_body::<ConsumeRequest>(&body)?.normalize()?;

    Ok(Json(state.consumer.consume(&queue_name, spec).await?))
}

/// `DELETE /api/queues/:queue_name/messages/:receipt_handle`
///
/// Receipt handles must be percent-encoded in the path.
pub async fn delete_message(
    State(state): State<AppState>,
    Path((queue_name, receipt_handle)): Path<(String, String)>,
) -> Result<StatusCode, GatewayError> {
    state
        .consumer
        .delete_message(&queue_name, &receipt_handle)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
