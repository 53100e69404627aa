use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::{
    error::SdkError,
    operation::admin_get_user::{AdminGetUserError, AdminGetUserOutput},
    types::AttributeType,
};
use fractic_server_error::ServerError;
use mockall::automock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::{CognitoAttributesParsingError, CognitoCalloutError},
    schema::JsonMap,
};

#[automock]
#[async_trait]
pub trait CognitoBackend: Send + Sync {
    async fn admin_get_user(
        &self,
        user_pool_id: String,
        username: String,
    ) -> Result<AdminGetUserOutput, SdkError<AdminGetUserError>>;
}

#[async_trait]
impl CognitoBackend for aws_sdk_cognitoidentityprovider::Client {
    async fn admin_get_user(
        &self,
        user_pool_id: String,
        username: String,
    ) -> Result<AdminGetUserOutput, SdkError<AdminGetUserError>> {
        self.admin_get_user()
            .user_pool_id(user_pool_id)
            .username(username)
            .send()
            .await
    }
}

#[derive(Clone)]
pub struct CognitoManager {
    backend: Arc<dyn CognitoBackend>,
    user_pool_id: String,
}

impl CognitoManager {
    pub async fn new(ctx: &impl AwsCtxView, user_pool_id: String) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(
            Arc::new(aws_sdk_cognitoidentityprovider::Client::new(
                &shared_config,
            )),
            user_pool_id,
        ))
    }

    pub fn with_backend(backend: Arc<dyn CognitoBackend>, user_pool_id: String) -> Self {
        Self {
            backend,
            user_pool_id,
        }
    }

    /// Fetches the user and folds its attribute list into a `{name: value}`
    /// object, deserialized as `T`. Attributes without a value are left out.
    pub async fn get_user_by_username<T: DeserializeOwned>(
        &self,
        username: &str,
    ) -> Result<T, ServerError> {
        let output = self
            .backend
            .admin_get_user(self.user_pool_id.clone(), username.to_string())
            .await
            .map_err(|e| {
                error!(error = ?e, username, "failed to fetch Cognito user");
                CognitoCalloutError::with_debug(&e)
            })?;
        serde_json::from_value(Value::Object(fold_attributes(output.user_attributes())))
            .map_err(|e| CognitoAttributesParsingError::with_debug(&e))
    }
}

fn fold_attributes(attributes: &[AttributeType]) -> JsonMap {
    attributes
        .iter()
        .filter_map(|attribute| {
            attribute
                .value()
                .map(|value| (attribute.name().to_string(), Value::String(value.to_string())))
        })
        .collect()
}
