use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sqs::{
    error::SdkError,
    operation::{
        send_message::{SendMessageError, SendMessageOutput},
        send_message_batch::{SendMessageBatchError, SendMessageBatchOutput},
    },
    types::{BatchResultErrorEntry, SendMessageBatchRequestEntry, SendMessageBatchResultEntry},
};
use fractic_server_error::ServerError;
use futures::future::try_join_all;
use mockall::automock;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::{InvalidMessageId, PayloadSerializationError, SqsCalloutError},
};

/// Max entries accepted by a single SendMessageBatch call.
pub const MAX_BATCH_SIZE: usize = 10;

#[automock]
#[async_trait]
pub trait SqsBackend: Send + Sync {
    async fn send_message(
        &self,
        queue_url: String,
        message_body: String,
    ) -> Result<SendMessageOutput, SdkError<SendMessageError>>;

    async fn send_message_batch(
        &self,
        queue_url: String,
        entries: Vec<SendMessageBatchRequestEntry>,
    ) -> Result<SendMessageBatchOutput, SdkError<SendMessageBatchError>>;
}

#[async_trait]
impl SqsBackend for aws_sdk_sqs::Client {
    async fn send_message(
        &self,
        queue_url: String,
        message_body: String,
    ) -> Result<SendMessageOutput, SdkError<SendMessageError>> {
        self.send_message()
            .queue_url(queue_url)
            .message_body(message_body)
            .send()
            .await
    }

    async fn send_message_batch(
        &self,
        queue_url: String,
        entries: Vec<SendMessageBatchRequestEntry>,
    ) -> Result<SendMessageBatchOutput, SdkError<SendMessageBatchError>> {
        self.send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
    }
}

/// Per-entry outcome of a bulk send, aggregated across all batches. Entries
/// are passed through from SQS as-is.
#[derive(Debug, Default)]
pub struct BulkSendResult {
    pub failed_messages: Vec<BatchResultErrorEntry>,
    pub successful_messages: Vec<SendMessageBatchResultEntry>,
}

#[derive(Clone)]
pub struct QueueManager {
    backend: Arc<dyn SqsBackend>,
}

impl QueueManager {
    pub async fn new(ctx: &impl AwsCtxView) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(Arc::new(aws_sdk_sqs::Client::new(
            &shared_config,
        ))))
    }

    pub fn with_backend(backend: Arc<dyn SqsBackend>) -> Self {
        Self { backend }
    }

    pub async fn send_message<T: Serialize>(
        &self,
        queue_url: &str,
        message: &T,
    ) -> Result<SendMessageOutput, ServerError> {
        let message_body = serialize_message(message)?;
        self.backend
            .send_message(queue_url.to_string(), message_body)
            .await
            .map_err(|e| {
                error!(error = ?e, queue_url, "failed to send SQS message");
                SqsCalloutError::with_debug(&e)
            })
    }

    /// Sends any number of messages, in batches of `MAX_BATCH_SIZE` sent
    /// concurrently. Each entry's batch ID is taken from the message's
    /// `message_index_name` field, which must be a string or number.
    ///
    /// If any batch call fails outright, the whole operation fails. Otherwise,
    /// per-entry failures reported by SQS are returned alongside successes.
    pub async fn send_bulk_messages<T: Serialize>(
        &self,
        queue_url: &str,
        messages: &[T],
        message_index_name: &str,
    ) -> Result<BulkSendResult, ServerError> {
        let entries = messages
            .iter()
            .map(|message| build_batch_entry(message, message_index_name))
            .collect::<Result<Vec<_>, _>>()?;

        let outputs = try_join_all(entries.chunks(MAX_BATCH_SIZE).map(|chunk| {
            let backend = &self.backend;
            async move {
                backend
                    .send_message_batch(queue_url.to_string(), chunk.to_vec())
                    .await
                    .map_err(|e| {
                        error!(error = ?e, queue_url, "failed to send SQS message batch");
                        SqsCalloutError::with_debug(&e)
                    })
            }
        }))
        .await?;

        Ok(outputs
            .iter()
            .fold(BulkSendResult::default(), |mut result, output| {
                result
                    .failed_messages
                    .extend(output.failed().iter().cloned());
                result
                    .successful_messages
                    .extend(output.successful().iter().cloned());
                result
            }))
    }
}

fn serialize_message<T: Serialize>(message: &T) -> Result<String, ServerError> {
    serde_json::to_string(message)
        .map_err(|e| PayloadSerializationError::with_debug("SQS message body", &e))
}

fn build_batch_entry<T: Serialize>(
    message: &T,
    message_index_name: &str,
) -> Result<SendMessageBatchRequestEntry, ServerError> {
    let value = serde_json::to_value(message)
        .map_err(|e| PayloadSerializationError::with_debug("SQS message body", &e))?;
    let id = match value.get(message_index_name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(InvalidMessageId::new(message_index_name)),
    };
    SendMessageBatchRequestEntry::builder()
        .id(id)
        .message_body(serialize_message(message)?)
        .build()
        .map_err(|e| InvalidMessageId::with_debug(message_index_name, &e))
}
