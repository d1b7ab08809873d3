//! Queue operations over the managed queue service.
//!
//! This module provides:
//! - Request/response value objects and their normalization
//! - The [`QueueBackend`] boundary and its SQS implementation
//! - Queue management, publishing and consuming on top of the backend
//!
//! ## Flow
//!
//! ```text
//! request → normalize → QueueManager / Publisher / Consumer → QueueBackend → SQS
//! ```

pub mod backend;
pub mod consumer;
pub mod management;
pub mod publisher;
pub mod sqs;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{QueueAttribute, QueueBackend, RawMessage, ReceiveOptions};
pub use consumer::Consumer;
pub use management::QueueManager;
pub use publisher::Publisher;
pub use sqs::SqsBackend;
pub use types::{
    ConsumeRequest, ConsumeSpec, CreateQueueRequest, InboundMessage, OutboundMessage,
    PublishResponse, QueueCreateSpec, QueueDescriptor,
};
