use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_lambda::{
    error::SdkError,
    operation::invoke::{InvokeError, InvokeOutput},
    primitives::Blob,
    types::InvocationType,
};
use fractic_server_error::ServerError;
use mockall::automock;
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::{LambdaCalloutError, LambdaResponseParsingError, PayloadSerializationError},
};

#[automock]
#[async_trait]
pub trait LambdaBackend: Send + Sync {
    async fn invoke(
        &self,
        function_name: String,
        payload: Vec<u8>,
    ) -> Result<InvokeOutput, SdkError<InvokeError>>;
}

#[async_trait]
impl LambdaBackend for aws_sdk_lambda::Client {
    async fn invoke(
        &self,
        function_name: String,
        payload: Vec<u8>,
    ) -> Result<InvokeOutput, SdkError<InvokeError>> {
        self.invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload))
            .send()
            .await
    }
}

#[derive(Clone)]
pub struct LambdaManager {
    backend: Arc<dyn LambdaBackend>,
}

impl LambdaManager {
    pub async fn new(ctx: &impl AwsCtxView) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(Arc::new(aws_sdk_lambda::Client::new(
            &shared_config,
        ))))
    }

    pub fn with_backend(backend: Arc<dyn LambdaBackend>) -> Self {
        Self { backend }
    }

    /// Invokes the function synchronously with `payload` as its JSON event.
    pub async fn get_response<T: Serialize>(
        &self,
        function_name: &str,
        payload: &T,
    ) -> Result<InvokeOutput, ServerError> {
        let payload = serde_json::to_vec(payload)
            .map_err(|e| PayloadSerializationError::with_debug("Lambda payload", &e))?;
        self.backend
            .invoke(function_name.to_string(), payload)
            .await
            .map_err(|e| {
                error!(error = ?e, function_name, "failed to invoke Lambda function");
                LambdaCalloutError::with_debug(&e)
            })
    }

    /// Like `get_response`, but parses the function's returned payload as `R`.
    pub async fn get_response_json<T: Serialize, R: DeserializeOwned>(
        &self,
        function_name: &str,
        payload: &T,
    ) -> Result<R, ServerError> {
        let output = self.get_response(function_name, payload).await?;
        let bytes = output
            .payload()
            .map(|blob| blob.as_ref())
            .ok_or_else(|| LambdaResponseParsingError::new())?;
        serde_json::from_slice(bytes).map_err(|e| LambdaResponseParsingError::with_debug(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct AreaResponse {
        area: f64,
        unit: String,
    }

    #[tokio::test]
    async fn test_get_response() {
        let mut backend = MockLambdaBackend::new();
        backend
            .expect_invoke()
            .with(
                eq("compute-area".to_string()),
                eq(br#"{"polygonId":"p-1"}"#.to_vec()),
            )
            .times(1)
            .returning(|_, _| {
                Ok(InvokeOutput::builder()
                    .status_code(200)
                    .payload(Blob::new(br#"{"area":12.5,"unit":"ha"}"#.to_vec()))
                    .build())
            });
        let manager = LambdaManager::with_backend(Arc::new(backend));

        let output = manager
            .get_response("compute-area", &json!({ "polygonId": "p-1" }))
            .await
            .unwrap();
        assert_eq!(output.status_code(), 200);
    }

    #[tokio::test]
    async fn test_get_response_json() {
        let mut backend = MockLambdaBackend::new();
        backend.expect_invoke().times(1).returning(|_, _| {
            Ok(InvokeOutput::builder()
                .status_code(200)
                .payload(Blob::new(br#"{"area":12.5,"unit":"ha"}"#.to_vec()))
                .build())
        });
        let manager = LambdaManager::with_backend(Arc::new(backend));

        let response: AreaResponse = manager
            .get_response_json("compute-area", &json!({ "polygonId": "p-1" }))
            .await
            .unwrap();
        assert_eq!(
            response,
            AreaResponse {
                area: 12.5,
                unit: "ha".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_get_response_json_missing_payload() {
        let mut backend = MockLambdaBackend::new();
        backend
            .expect_invoke()
            .times(1)
            .returning(|_, _| Ok(InvokeOutput::builder().status_code(200).build()));
        let manager = LambdaManager::with_backend(Arc::new(backend));

        let result = manager
            .get_response_json::<_, AreaResponse>("compute-area", &json!({}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_response_error() {
        let mut backend = MockLambdaBackend::new();
        backend
            .expect_invoke()
            .times(1)
            .returning(|_, _| Err(SdkError::construction_failure("function not found")));
        let manager = LambdaManager::with_backend(Arc::new(backend));

        let result = manager.get_response("missing", &json!({})).await;
        assert!(result.is_err());
    }
}
