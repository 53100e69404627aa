use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_ses::{
    error::SdkError,
    operation::send_templated_email::{SendTemplatedEmailError, SendTemplatedEmailOutput},
    types::Destination,
};
use fractic_server_error::ServerError;
use mockall::automock;
use serde::Serialize;
use tracing::error;

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::{PayloadSerializationError, SesCalloutError},
};

#[automock]
#[async_trait]
pub trait SesBackend: Send + Sync {
    async fn send_templated_email(
        &self,
        source: String,
        to_address: String,
        template: String,
        template_data: String,
    ) -> Result<SendTemplatedEmailOutput, SdkError<SendTemplatedEmailError>>;
}

#[async_trait]
impl SesBackend for aws_sdk_ses::Client {
    async fn send_templated_email(
        &self,
        source: String,
        to_address: String,
        template: String,
        template_data: String,
    ) -> Result<SendTemplatedEmailOutput, SdkError<SendTemplatedEmailError>> {
        self.send_templated_email()
            .source(source)
            .destination(Destination::builder().to_addresses(to_address).build())
            .template(template)
            .template_data(template_data)
            .send()
            .await
    }
}

#[derive(Clone)]
pub struct SesManager {
    backend: Arc<dyn SesBackend>,
}

impl SesManager {
    pub async fn new(ctx: &impl AwsCtxView) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(Arc::new(aws_sdk_ses::Client::new(
            &shared_config,
        ))))
    }

    pub fn with_backend(backend: Arc<dyn SesBackend>) -> Self {
        Self { backend }
    }

    /// Renders the SES `template` with `template_data` (serialized to JSON) and
    /// sends it from `source` to a single recipient.
    pub async fn send_email_using_template<T: Serialize>(
        &self,
        source: &str,
        destination: &str,
        template: &str,
        template_data: &T,
    ) -> Result<SendTemplatedEmailOutput, ServerError> {
        let template_data = serde_json::to_string(template_data)
            .map_err(|e| PayloadSerializationError::with_debug("SES template data", &e))?;
        self.backend
            .send_templated_email(
                source.to_string(),
                destination.to_string(),
                template.to_string(),
                template_data,
            )
            .await
            .map_err(|e| {
                error!(error = ?e, template, "failed to send templated email");
                SesCalloutError::with_debug(&e)
            })
    }
}
