//! Amazon SQS backend built on the AWS SDK.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sqs::config::{Credentials, Region};
use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use aws_sdk_sqs::types::{MessageSystemAttributeName, QueueAttributeName};
use aws_sdk_sqs::Client;
use tracing::{debug, info};

use super::backend::{QueueAttribute, QueueBackend, RawMessage, ReceiveOptions};
use crate::error::BackendError;
use crate::Config;

/// SQS client wrapper. Cloning shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct SqsBackend {
    client: Client,
}

impl SqsBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the region, endpoint override and credentials in
    /// `config`. Without static credentials the default provider chain is used.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));

        if let Some(endpoint) = &config.aws_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(key_id), Some(secret)) = (&config.aws_access_key_id, &config.aws_secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "sqs-gateway",
            ));
        }

        let sdk_config = loader.load().await;
        info!(
            region = %config.aws_region,
            endpoint = ?config.aws_endpoint_url,
            static_credentials = config.has_static_credentials(),
            "sqs_client_created"
        );

        Self::new(Client::new(&sdk_config))
    }
}

fn sdk_error<E>(operation: &'static str, err: SdkError<E>) -> BackendError
where
    E: std::error::Error + 'static,
{
    BackendError::service(operation, DisplayErrorContext(&err).to_string())
}

fn attribute_name(attribute: QueueAttribute) -> QueueAttributeName {
    QueueAttributeName::from(attribute.as_str())
}

fn missing(operation: &'static str, field: &str) -> BackendError {
    BackendError::service(operation, format!("response is missing {field}"))
}

#[async_trait]
impl QueueBackend for SqsBackend {
    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<QueueAttribute, String>,
    ) -> Result<String, BackendError> {
        let attributes: HashMap<QueueAttributeName, String> = attributes
            .into_iter()
            .map(|(k, v)| (attribute_name(k), v))
            .collect();

        let output = self
            .client
            .create_queue()
            .queue_name(name)
            .set_attributes((!attributes.is_empty()).then_some(attributes))
            .send()
            .await
            .map_err(|e| sdk_error("CreateQueue", e))?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| missing("CreateQueue", "QueueUrl"))
    }

    async fn get_queue_url(&self, name: &str) -> Result<String, BackendError> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_queue_does_not_exist())
                    .unwrap_or(false)
                {
                    BackendError::QueueNotFound(name.to_string())
                } else {
                    sdk_error("GetQueueUrl", e)
                }
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| missing("GetQueueUrl", "QueueUrl"))
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        names: &[QueueAttribute],
    ) -> Result<HashMap<String, String>, BackendError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .set_attribute_names(Some(names.iter().copied().map(attribute_name).collect()))
            .send()
            .await
            .map_err(|e| sdk_error("GetQueueAttributes", e))?;

        Ok(output
            .attributes()
            .map(|attributes| {
                attributes
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_queues(&self) -> Result<Vec<String>, BackendError> {
        let mut urls = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_queues()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListQueues", e))?;

            urls.extend(output.queue_urls().iter().cloned());

            match output.next_token() {
                Some(token) if !token.is_empty() => {
                    debug!(fetched = urls.len(), "sqs_list_queues_next_page");
                    next_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(urls)
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<(), BackendError> {
        self.client
            .delete_queue()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteQueue", e))?;
        Ok(())
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError> {
        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| sdk_error("SendMessage", e))?;

        output
            .message_id()
            .map(str::to_string)
            .ok_or_else(|| missing("SendMessage", "MessageId"))
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        options: ReceiveOptions,
    ) -> Result<Vec<RawMessage>, BackendError> {
        let mut request = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(options.max_messages)
            .wait_time_seconds(options.wait_time_seconds);
        if options.all_attributes {
            request = request.message_system_attribute_names(MessageSystemAttributeName::All);
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("ReceiveMessage", e))?;

        output
            .messages()
            .iter()
            .map(|message| {
                Ok(RawMessage {
                    message_id: message
                        .message_id()
                        .ok_or_else(|| missing("ReceiveMessage", "MessageId"))?
                        .to_string(),
                    receipt_handle: message
                        .receipt_handle()
                        .ok_or_else(|| missing("ReceiveMessage", "ReceiptHandle"))?
                        .to_string(),
                    body: message.body().unwrap_or_default().to_string(),
                    attributes: message
                        .attributes()
                        .map(|attributes| {
                            attributes
                                .iter()
                                .map(|(k, v)| (k.as_str().to_string(), v.clone()))
                                .collect()
                        })
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), BackendError> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteMessage", e))?;
        Ok(())
    }
}
