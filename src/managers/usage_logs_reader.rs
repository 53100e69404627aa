use std::sync::Arc;

use fractic_server_error::ServerError;
use tracing::{error, info};

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::S3CalloutError,
    schema::usage_log::{decode_usage_log_batch, UsageLog},
};

use super::{s3::S3Backend, split_object_path};

/// Reads usage log batches delivered to S3 by the Firehose stream.
#[derive(Clone)]
pub struct UsageLogsReadManager {
    backend: Arc<dyn S3Backend>,
}

impl UsageLogsReadManager {
    pub async fn new(ctx: &impl AwsCtxView) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(Arc::new(aws_sdk_s3::Client::new(
            &shared_config,
        ))))
    }

    pub fn with_backend(backend: Arc<dyn S3Backend>) -> Self {
        Self { backend }
    }

    /// Fetches and decodes the batch stored at `bucket/key`.
    pub async fn get_usage_logs(&self, path: &str) -> Result<Vec<UsageLog>, ServerError> {
        let (bucket, key) = split_object_path(path)?;
        let output = self
            .backend
            .get_object(bucket.to_string(), key.to_string())
            .await
            .map_err(|e| {
                error!(error = ?e, bucket, key, "failed to fetch usage log batch");
                S3CalloutError::with_debug(&e)
            })?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| S3CalloutError::with_debug(&e))?
            .into_bytes();
        let usage_logs = self.serialize_usage_logs(&String::from_utf8_lossy(&body))?;
        info!(bucket, key, count = usage_logs.len(), "read usage log batch");
        Ok(usage_logs)
    }

    pub fn serialize_usage_logs(&self, data: &str) -> Result<Vec<UsageLog>, ServerError> {
        decode_usage_log_batch(data)
    }
}
