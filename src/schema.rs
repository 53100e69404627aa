use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

pub mod key_schema;
pub mod parsing;
pub mod usage_log;

pub use key_schema::schema_unmarshal;

/// Raw item as returned by the DynamoDB client.
pub type DynamoMap = HashMap<String, AttributeValue>;

/// Item after conversion into plain JSON (see `parsing`), which is the shape
/// `schema_unmarshal` operates on.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

pub const PARTITION_KEY: &str = "PK";
pub const SORT_KEY: &str = "SK";

/// Marker and field names used to represent DynamoDB sets in JSON, matching
/// the document-client convention.
pub const SET_WRAPPER_FIELD: &str = "wrapperName";
pub const SET_WRAPPER_NAME: &str = "Set";
pub const SET_VALUES_FIELD: &str = "values";
pub const SET_TYPE_FIELD: &str = "type";
