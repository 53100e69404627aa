use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::query::{QueryError, QueryOutput},
    types::AttributeValue,
};
use fractic_server_error::ServerError;
use mockall::automock;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{error, info};

use crate::{
    context::{load_aws_config, AwsCtxView},
    errors::{DynamoCalloutError, DynamoItemParsingError},
    schema::{parsing::dynamo_map_to_json, schema_unmarshal, DynamoMap},
};

pub const SORT_KEY_INDEX: &str = "SK-index";

#[automock]
#[async_trait]
pub trait UserOrganizationBackend: Send + Sync {
    async fn query(
        &self,
        table_name: String,
        index: Option<String>,
        condition: String,
        attribute_values: HashMap<String, AttributeValue>,
    ) -> Result<QueryOutput, SdkError<QueryError>>;
}

#[async_trait]
impl UserOrganizationBackend for aws_sdk_dynamodb::Client {
    async fn query(
        &self,
        table_name: String,
        index: Option<String>,
        condition: String,
        attribute_values: HashMap<String, AttributeValue>,
    ) -> Result<QueryOutput, SdkError<QueryError>> {
        self.query()
            .set_table_name(Some(table_name))
            .set_index_name(index)
            .set_key_condition_expression(Some(condition))
            .set_expression_attribute_values(Some(attribute_values))
            .send()
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UserOrganization {
    #[serde(rename = "Token")]
    pub token: Option<String>,
    #[serde(rename = "Type")]
    pub organization_type: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "organizationId")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUser {
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Clone)]
pub struct UserOrganizationRepository {
    backend: Arc<dyn UserOrganizationBackend>,
    table: String,
}

impl UserOrganizationRepository {
    pub async fn new(ctx: &impl AwsCtxView, table: String) -> Result<Self, ServerError> {
        let shared_config = load_aws_config(ctx).await;
        Ok(Self::with_backend(
            Arc::new(aws_sdk_dynamodb::Client::new(&shared_config)),
            table,
        ))
    }

    pub fn with_backend(backend: Arc<dyn UserOrganizationBackend>, table: String) -> Self {
        Self { backend, table }
    }

    /// First organization membership of the user.
    pub async fn get_user_organizations_by_id(
        &self,
        user_id: &str,
    ) -> Result<Option<UserOrganization>, ServerError> {
        let user_orgs: Vec<UserOrganization> = self
            .query(
                None,
                "PK = :pk and begins_with(SK, :sk)",
                HashMap::from([
                    (":pk".to_string(), AttributeValue::S(format!("USERID#{user_id}"))),
                    (":sk".to_string(), AttributeValue::S("ORG#".to_string())),
                ]),
            )
            .await?;
        info!(?user_orgs, "User organizations");
        Ok(user_orgs.into_iter().next())
    }

    /// First organization owning the API token.
    pub async fn get_organizations_by_token(
        &self,
        token_id: &str,
    ) -> Result<Option<UserOrganization>, ServerError> {
        let user_orgs: Vec<UserOrganization> = self
            .query(
                Some(SORT_KEY_INDEX),
                "SK = :sk",
                HashMap::from([(
                    ":sk".to_string(),
                    AttributeValue::S(format!("TOKENID#V0#{token_id}")),
                )]),
            )
            .await?;
        info!(?user_orgs, "User organizations");
        Ok(user_orgs.into_iter().next())
    }

    /// All members of the organization.
    pub async fn get_user_by_organization_id(
        &self,
        organization_id: &str,
    ) -> Result<Vec<OrganizationUser>, ServerError> {
        let users: Vec<OrganizationUser> = self
            .query(
                Some(SORT_KEY_INDEX),
                "SK = :sk",
                HashMap::from([(
                    ":sk".to_string(),
                    AttributeValue::S(format!("ORG#{organization_id}")),
                )]),
            )
            .await?;
        info!(?users, "Users");
        Ok(users)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        index: Option<&str>,
        condition: &str,
        attribute_values: HashMap<String, AttributeValue>,
    ) -> Result<Vec<T>, ServerError> {
        let output = self
            .backend
            .query(
                self.table.clone(),
                index.map(str::to_string),
                condition.to_string(),
                attribute_values,
            )
            .await
            .map_err(|e| {
                error!(error = ?e, table = %self.table, condition, "DynamoDB query failed");
                DynamoCalloutError::with_debug(&e)
            })?;
        output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(unmarshal_item)
            .collect()
    }
}

fn unmarshal_item<T: DeserializeOwned>(item: DynamoMap) -> Result<T, ServerError> {
    let unmarshalled = schema_unmarshal(Some(dynamo_map_to_json(item)?)).unwrap_or_default();
    serde_json::from_value(Value::Object(unmarshalled))
        .map_err(|e| DynamoItemParsingError::with_debug("unexpected item shape", &e))
}
