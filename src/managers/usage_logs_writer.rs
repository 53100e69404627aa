use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use aws_sdk_firehose::{
    error::SdkError,
    operation::put_record::{PutRecordError, PutRecordOutput},
    primitives::Blob,
    types::Record,
};
use chrono::Utc;
use fractic_server_error::ServerError;
use mockall::automock;
use tracing::{debug, error, info};

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::FirehoseCalloutError,
    schema::usage_log::{
        encode_usage_log, NewPolygonPayload, PartialDrPayload, RequestContext, UsageLog,
    },
};

#[automock]
#[async_trait]
pub trait FirehoseBackend: Send + Sync {
    async fn put_record(
        &self,
        delivery_stream_name: String,
        data: Vec<u8>,
    ) -> Result<PutRecordOutput, SdkError<PutRecordError>>;
}

#[async_trait]
impl FirehoseBackend for aws_sdk_firehose::Client {
    async fn put_record(
        &self,
        delivery_stream_name: String,
        data: Vec<u8>,
    ) -> Result<PutRecordOutput, SdkError<PutRecordError>> {
        let record = Record::builder()
            .data(Blob::new(data))
            .build()
            .map_err(|e| -> SdkError<PutRecordError> { SdkError::construction_failure(e) })?;
        self.put_record()
            .delivery_stream_name(delivery_stream_name)
            .record(record)
            .send()
            .await
    }
}

/// Appends usage logs to the Firehose delivery stream, one record per log.
#[derive(Clone)]
pub struct UsageLogsWriterManager {
    backend: Arc<dyn FirehoseBackend>,
    delivery_stream_name: String,
}

impl UsageLogsWriterManager {
    pub async fn new(
        ctx: &impl AwsCtxView,
        delivery_stream_name: String,
    ) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(
            Arc::new(aws_sdk_firehose::Client::new(&shared_config)),
            delivery_stream_name,
        ))
    }

    pub fn with_backend(backend: Arc<dyn FirehoseBackend>, delivery_stream_name: String) -> Self {
        Self {
            backend,
            delivery_stream_name,
        }
    }

    pub async fn write_usage_log(&self, usage_log: &UsageLog) -> Result<(), ServerError> {
        info!(?usage_log, "input to usagelogs");
        let record = encode_usage_log(usage_log)?;
        let response = self
            .backend
            .put_record(self.delivery_stream_name.clone(), record.into_bytes())
            .await
            .map_err(|e| {
                error!(
                    error = ?e,
                    delivery_stream = %self.delivery_stream_name,
                    request_id = %usage_log.request_id,
                    "failed to write usage log"
                );
                FirehoseCalloutError::with_debug(&e)
            })?;
        info!(record_id = response.record_id(), "Successfully logged usage");
        Ok(())
    }

    pub async fn write_usage_log_for_get_delineated_fields(
        &self,
        request: &RequestContext,
        features: Vec<NewPolygonPayload>,
    ) -> Result<(), ServerError> {
        debug!(?features, "features for logging");
        self.write_timed(UsageLog::delineated_fields(request, features, Utc::now()))
            .await
    }

    pub async fn write_usage_log_for_get_delineated_fields_by_location(
        &self,
        request: &RequestContext,
        features: Vec<NewPolygonPayload>,
    ) -> Result<(), ServerError> {
        debug!(?features, "features for logging");
        self.write_timed(UsageLog::delineated_fields_count(request, features, Utc::now()))
            .await
    }

    pub async fn write_usage_log_for_get_delineated_fields_by_id(
        &self,
        request: &RequestContext,
        features: Vec<NewPolygonPayload>,
    ) -> Result<(), ServerError> {
        debug!(?features, "features for logging");
        self.write_timed(UsageLog::delineated_fields_count(request, features, Utc::now()))
            .await
    }

    pub async fn write_usage_log_for_pdr_imagery(
        &self,
        features: Vec<PartialDrPayload>,
        organization_id: &str,
    ) -> Result<(), ServerError> {
        debug!(?features, organization_id, "features for logging");
        self.write_timed(UsageLog::partial_dr_imagery(
            features,
            organization_id,
            Utc::now(),
        ))
        .await
    }

    async fn write_timed(&self, usage_log: UsageLog) -> Result<(), ServerError> {
        let start = Instant::now();
        self.write_usage_log(&usage_log).await?;
        let ttc = start.elapsed().as_millis() as u64;
        info!(
            ttc,
            request_id = %usage_log.request_id,
            "Completion time for usagelog insertion"
        );
        Ok(())
    }
}
