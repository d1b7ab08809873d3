//! HTTP surface of the gateway.
//!
//! All queue routes live under `/api/queues`. Every handler is a thin
//! translation onto the queue manager, publisher or consumer in
//! [`crate::queue`].

pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    consume_messages, create_queue, delete_message, delete_queue, get_queue_attributes, health,
    list_queues, metrics, publish_message, AppState, ErrorResponse, HealthResponse,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/queues", post(create_queue).get(list_queues))
        .route("/api/queues/:queue_name", delete(delete_queue))
        .route("/api/queues/:queue_name/attributes", get(get_queue_attributes))
        .route("/api/queues/:queue_name/messages", post(publish_message))
        .route(
            "/api/queues/:queue_name/messages/:receipt_handle",
            delete(delete_message),
        )
        .route("/api/queues/:queue_name/consume", post(consume_messages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
