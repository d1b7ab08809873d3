//! In-memory test doubles for the queue backend and metrics sink.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use super::backend::{QueueAttribute, QueueBackend, RawMessage, ReceiveOptions};
use crate::error::{BackendError, Operation};
use crate::metrics::{Counter, MetricsSink};

const URL_PREFIX: &str = "http://sqs.test.local/000000000000/";

/// A backend call as seen by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateQueue {
        name: String,
        attributes: HashMap<QueueAttribute, String>,
    },
    GetQueueUrl(String),
    GetQueueAttributes {
        url: String,
        names: Vec<QueueAttribute>,
    },
    ListQueues,
    DeleteQueue(String),
    SendMessage {
        url: String,
        body: String,
    },
    ReceiveMessages {
        url: String,
        options: ReceiveOptions,
    },
    DeleteMessage {
        url: String,
        receipt_handle: String,
    },
}

#[derive(Default)]
struct QueueState {
    attributes: HashMap<QueueAttribute, String>,
    available: VecDeque<(String, String)>,
    in_flight: HashMap<String, (String, String)>,
}

#[derive(Default)]
struct State {
    queues: Vec<(String, QueueState)>,
    calls: Vec<Call>,
    next_id: u64,
}

impl State {
    fn queue_mut(&mut self, url: &str) -> Result<&mut QueueState, BackendError> {
        self.queues
            .iter_mut()
            .find(|(u, _)| u == url)
            .map(|(_, q)| q)
            .ok_or_else(|| BackendError::service("Lookup", format!("NonExistentQueue: {url}")))
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Backend double that keeps queues in memory and records every call.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    fail_attributes_for: Mutex<Option<String>>,
    fail_create_for: Mutex<Option<String>>,
    fail_sends: Mutex<bool>,
    attribute_barrier: Mutex<Option<Arc<Barrier>>>,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn url_for(name: &str) -> String {
        format!("{URL_PREFIX}{name}")
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make attribute fetches for `url` fail.
    pub fn fail_attributes_for(&self, url: &str) {
        *self.fail_attributes_for.lock().unwrap() = Some(url.to_string());
    }

    /// Make creation of the queue called `name` fail.
    pub fn fail_create_for(&self, name: &str) {
        *self.fail_create_for.lock().unwrap() = Some(name.to_string());
    }

    /// Make every send fail.
    pub fn fail_sends(&self) {
        *self.fail_sends.lock().unwrap() = true;
    }

    /// Hold every attribute fetch until `parties` fetches are waiting.
    pub fn gate_attribute_fetches(&self, parties: usize) {
        *self.attribute_barrier.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    /// Enqueue a body verbatim, bypassing JSON encoding.
    pub fn inject_raw(&self, queue_name: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        let id = format!("msg-{}", state.next_id());
        state
            .queue_mut(&Self::url_for(queue_name))
            .expect("queue exists")
            .available
            .push_back((id, body.to_string()));
    }

    pub fn queue_attributes(&self, queue_name: &str) -> HashMap<QueueAttribute, String> {
        let mut state = self.state.lock().unwrap();
        state
            .queue_mut(&Self::url_for(queue_name))
            .expect("queue exists")
            .attributes
            .clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl QueueBackend for InMemoryBackend {
    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<QueueAttribute, String>,
    ) -> Result<String, BackendError> {
        self.record(Call::CreateQueue {
            name: name.to_string(),
            attributes: attributes.clone(),
        });

        if self.fail_create_for.lock().unwrap().as_deref() == Some(name) {
            return Err(BackendError::service("CreateQueue", "QueueDeletedRecently"));
        }

        let url = Self::url_for(name);
        let mut state = self.state.lock().unwrap();
        if !state.queues.iter().any(|(u, _)| *u == url) {
            let mut queue = QueueState {
                attributes,
                ..Default::default()
            };
            queue.attributes.insert(
                QueueAttribute::QueueArn,
                format!("arn:aws:sqs:us-east-1:000000000000:{name}"),
            );
            queue
                .attributes
                .insert(QueueAttribute::CreatedTimestamp, "1700000000".to_string());
            state.queues.push((url.clone(), queue));
        }
        Ok(url)
    }

    async fn get_queue_url(&self, name: &str) -> Result<String, BackendError> {
        self.record(Call::GetQueueUrl(name.to_string()));

        let url = Self::url_for(name);
        let state = self.state.lock().unwrap();
        if state.queues.iter().any(|(u, _)| *u == url) {
            Ok(url)
        } else {
            Err(BackendError::QueueNotFound(name.to_string()))
        }
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        names: &[QueueAttribute],
    ) -> Result<HashMap<String, String>, BackendError> {
        self.record(Call::GetQueueAttributes {
            url: queue_url.to_string(),
            names: names.to_vec(),
        });

        let barrier = self.attribute_barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        if self.fail_attributes_for.lock().unwrap().as_deref() == Some(queue_url) {
            return Err(BackendError::service("GetQueueAttributes", "Throttling"));
        }

        let mut state = self.state.lock().unwrap();
        let queue = state.queue_mut(queue_url)?;
        let mut attributes: HashMap<String, String> = names
            .iter()
            .filter_map(|n| queue.attributes.get(n).map(|v| (n.as_str().to_string(), v.clone())))
            .collect();

        for name in names {
            let count = match name {
                QueueAttribute::ApproximateNumberOfMessages => Some(queue.available.len()),
                QueueAttribute::ApproximateNumberOfMessagesNotVisible => {
                    Some(queue.in_flight.len())
                }
                QueueAttribute::ApproximateNumberOfMessagesDelayed => Some(0),
                _ => None,
            };
            if let Some(count) = count {
                attributes.insert(name.as_str().to_string(), count.to_string());
            }
        }
        Ok(attributes)
    }

    async fn list_queues(&self) -> Result<Vec<String>, BackendError> {
        self.record(Call::ListQueues);
        let state = self.state.lock().unwrap();
        Ok(state.queues.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<(), BackendError> {
        self.record(Call::DeleteQueue(queue_url.to_string()));
        let mut state = self.state.lock().unwrap();
        state.queues.retain(|(u, _)| u != queue_url);
        Ok(())
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError> {
        self.record(Call::SendMessage {
            url: queue_url.to_string(),
            body: body.to_string(),
        });

        if *self.fail_sends.lock().unwrap() {
            return Err(BackendError::service("SendMessage", "KmsThrottled"));
        }

        let mut state = self.state.lock().unwrap();
        let id = format!("msg-{}", state.next_id());
        state
            .queue_mut(queue_url)?
            .available
            .push_back((id.clone(), body.to_string()));
        Ok(id)
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        options: ReceiveOptions,
    ) -> Result<Vec<RawMessage>, BackendError> {
        self.record(Call::ReceiveMessages {
            url: queue_url.to_string(),
            options,
        });

        let mut state = self.state.lock().unwrap();
        let mut received = Vec::new();
        for _ in 0..options.max_messages {
            let handle = format!("rh-{}", state.next_id());
            let queue = state.queue_mut(queue_url)?;
            let Some((id, body)) = queue.available.pop_front() else {
                break;
            };
            queue
                .in_flight
                .insert(handle.clone(), (id.clone(), body.clone()));

            let attributes = if options.all_attributes {
                HashMap::from([("ApproximateReceiveCount".to_string(), "1".to_string())])
            } else {
                HashMap::new()
            };
            received.push(RawMessage {
                message_id: id,
                receipt_handle: handle,
                body,
                attributes,
            });
        }
        Ok(received)
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), BackendError> {
        self.record(Call::DeleteMessage {
            url: queue_url.to_string(),
            receipt_handle: receipt_handle.to_string(),
        });

        let mut state = self.state.lock().unwrap();
        match state.queue_mut(queue_url)?.in_flight.remove(receipt_handle) {
            Some(_) => Ok(()),
            None => Err(BackendError::service(
                "DeleteMessage",
                "ReceiptHandleIsInvalid: the receipt handle has expired or was already used",
            )),
        }
    }
}

/// A metric event as seen by [`RecordingMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    Increment {
        counter: Counter,
        queue: String,
        status: String,
    },
    Duration {
        queue: String,
        operation: Operation,
    },
    Gauge {
        queue: String,
        value: i64,
    },
}

#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn increment(&self, counter: Counter, queue: &str, status: &str) {
        self.events.lock().unwrap().push(MetricEvent::Increment {
            counter,
            queue: queue.to_string(),
            status: status.to_string(),
        });
    }

    fn record_duration(&self, queue: &str, operation: Operation, _elapsed: Duration) {
        self.events.lock().unwrap().push(MetricEvent::Duration {
            queue: queue.to_string(),
            operation,
        });
    }

    fn set_gauge(&self, queue: &str, value: i64) {
        self.events.lock().unwrap().push(MetricEvent::Gauge {
            queue: queue.to_string(),
            value,
        });
    }
}
