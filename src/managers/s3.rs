use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use aws_sdk_s3::{
    error::SdkError,
    operation::{
        get_object::{GetObjectError, GetObjectOutput},
        list_objects_v2::{ListObjectsV2Error, ListObjectsV2Output},
    },
    presigning::PresigningConfig,
};
use fractic_server_error::ServerError;
use mockall::automock;
use tracing::error;

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::S3CalloutError,
};

use super::split_object_path;

/// Expiry used for shareable links (the SigV4 maximum).
pub const PRESIGNED_URL_EXPIRY: Duration = Duration::from_secs(60 * 60 * 24 * 7);
pub const DEFAULT_LIST_DELIMITER: &str = "/";

// Underlying backend, kept as close as possible to aws_sdk_s3::Client so it
// can be swapped with a mock for testing.
#[automock]
#[async_trait]
pub trait S3Backend: Send + Sync {
    async fn presigned_get_object(
        &self,
        bucket: String,
        key: String,
        expires_in: Duration,
    ) -> Result<String, SdkError<GetObjectError>>;

    async fn list_objects_v2(
        &self,
        bucket: String,
        prefix: String,
        delimiter: String,
    ) -> Result<ListObjectsV2Output, SdkError<ListObjectsV2Error>>;

    async fn get_object(
        &self,
        bucket: String,
        key: String,
    ) -> Result<GetObjectOutput, SdkError<GetObjectError>>;
}

#[async_trait]
impl S3Backend for aws_sdk_s3::Client {
    async fn presigned_get_object(
        &self,
        bucket: String,
        key: String,
        expires_in: Duration,
    ) -> Result<String, SdkError<GetObjectError>> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| -> SdkError<GetObjectError> { SdkError::construction_failure(e) })?;
        let request = self
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await?;
        Ok(request.uri().to_string())
    }

    async fn list_objects_v2(
        &self,
        bucket: String,
        prefix: String,
        delimiter: String,
    ) -> Result<ListObjectsV2Output, SdkError<ListObjectsV2Error>> {
        self.list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .delimiter(delimiter)
            .send()
            .await
    }

    async fn get_object(
        &self,
        bucket: String,
        key: String,
    ) -> Result<GetObjectOutput, SdkError<GetObjectError>> {
        self.get_object().bucket(bucket).key(key).send().await
    }
}

#[derive(Clone)]
pub struct S3Manager {
    backend: Arc<dyn S3Backend>,
}

impl S3Manager {
    pub async fn new(ctx: &impl AwsCtxView) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(Arc::new(aws_sdk_s3::Client::new(
            &shared_config,
        ))))
    }

    pub fn with_backend(backend: Arc<dyn S3Backend>) -> Self {
        Self { backend }
    }

    /// Presigned GET URL for the object, valid for `expires_in`.
    pub async fn get_signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ServerError> {
        self.backend
            .presigned_get_object(bucket.to_string(), key.to_string(), expires_in)
            .await
            .map_err(|e| {
                error!(error = ?e, bucket, key, "failed to presign S3 URL");
                S3CalloutError::with_debug(&e)
            })
    }

    /// Lists objects under `prefix`, grouping by `delimiter` (defaults to
    /// "/").
    pub async fn query_sentinel_bucket(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<ListObjectsV2Output, ServerError> {
        self.backend
            .list_objects_v2(
                bucket.to_string(),
                prefix.to_string(),
                delimiter.unwrap_or(DEFAULT_LIST_DELIMITER).to_string(),
            )
            .await
            .map_err(|e| S3CalloutError::with_debug(&e))
    }

    /// Week-long presigned URL for a `bucket/key` location.
    pub async fn presigned_s3_url(&self, file_location: &str) -> Result<String, ServerError> {
        let (bucket, key) = split_object_path(file_location)?;
        self.get_signed_url(bucket, key, PRESIGNED_URL_EXPIRY).await
    }
}
