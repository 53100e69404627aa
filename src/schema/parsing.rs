use aws_sdk_dynamodb::types::AttributeValue;
use fractic_server_error::ServerError;
use serde_json::Value;

use crate::errors::DynamoItemParsingError;

use super::{
    DynamoMap, JsonMap, SET_TYPE_FIELD, SET_VALUES_FIELD, SET_WRAPPER_FIELD, SET_WRAPPER_NAME,
};

// Converting raw DynamoDB items into plain JSON.
// --------------------------------------------------

pub fn dynamo_map_to_json(map: DynamoMap) -> Result<JsonMap, ServerError> {
    map.into_iter()
        .map(|(key, value)| -> Result<(String, Value), ServerError> {
            Ok((key, attribute_value_to_serde_value(value)?))
        })
        .collect()
}

// Inner recursive functions.
// --------------------------------------------------

fn attribute_value_to_serde_value(value: AttributeValue) -> Result<Value, ServerError> {
    match value {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(b) => Ok(Value::Bool(b)),
        AttributeValue::S(s) => Ok(Value::String(s)),
        AttributeValue::N(n) => Ok(Value::Number(parse_number(&n)?)),
        AttributeValue::M(map) => Ok(Value::Object(dynamo_map_to_json(map)?)),
        AttributeValue::L(array) => Ok(Value::Array(
            array
                .into_iter()
                .map(attribute_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        // Sets are kept distinguishable from lists, using the same wrapper
        // shape as the JS document client.
        AttributeValue::Ss(strings) => Ok(set_wrapper(
            "String",
            strings.into_iter().map(Value::String).collect(),
        )),
        AttributeValue::Ns(numbers) => Ok(set_wrapper(
            "Number",
            numbers
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        unsupported => Err(DynamoItemParsingError::with_debug(
            "unsupported AttributeValue type",
            &unsupported,
        )),
    }
}

fn parse_number(n: &str) -> Result<serde_json::Number, ServerError> {
    n.parse()
        .map_err(|e| DynamoItemParsingError::with_debug("failed to parse number", &e))
}

fn set_wrapper(set_type: &str, values: Vec<Value>) -> Value {
    let mut wrapper = JsonMap::new();
    wrapper.insert(
        SET_WRAPPER_FIELD.to_string(),
        Value::String(SET_WRAPPER_NAME.to_string()),
    );
    wrapper.insert(SET_TYPE_FIELD.to_string(), Value::String(set_type.to_string()));
    wrapper.insert(SET_VALUES_FIELD.to_string(), Value::Array(values));
    Value::Object(wrapper)
}

// Tests.
// --------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::schema_unmarshal;
    use aws_sdk_dynamodb::primitives::Blob;
    use fractic_core::collection;
    use serde_json::json;

    #[test]
    fn test_dynamo_map_to_json() {
        let input: DynamoMap = collection!(
            "PK".to_string() => AttributeValue::S("USERID#123".to_string()),
            "num".to_string() => AttributeValue::N("42".to_string()),
            "float".to_string() => AttributeValue::N("3.14".to_string()),
            "flag".to_string() => AttributeValue::Bool(true),
            "empty".to_string() => AttributeValue::Null(true),
            "nested_map".to_string() => AttributeValue::M(collection!(
                "key".to_string() => AttributeValue::S("value".to_string())
            )),
            "nested_vec".to_string() => AttributeValue::L(vec![
                AttributeValue::S("elem1".to_string()),
                AttributeValue::N("2".to_string()),
            ]),
        );

        let output = Value::Object(dynamo_map_to_json(input).unwrap());

        assert_eq!(
            output,
            json!({
                "PK": "USERID#123",
                "num": 42,
                "float": 3.14,
                "flag": true,
                "empty": null,
                "nested_map": { "key": "value" },
                "nested_vec": ["elem1", 2],
            })
        );
    }

    #[test]
    fn test_sets_are_wrapped() {
        let input: DynamoMap = collection!(
            "tags".to_string() => AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]),
            "ids".to_string() => AttributeValue::Ns(vec!["1".to_string(), "2".to_string()]),
        );

        let output = Value::Object(dynamo_map_to_json(input).unwrap());

        assert_eq!(
            output,
            json!({
                "tags": { "wrapperName": "Set", "type": "String", "values": ["a", "b"] },
                "ids": { "wrapperName": "Set", "type": "Number", "values": [1, 2] },
            })
        );
    }

    #[test]
    fn test_sets_unwrapped_by_schema_unmarshal() {
        let input: DynamoMap = collection!(
            "PK".to_string() => AttributeValue::S("USERID#u-1".to_string()),
            "SK".to_string() => AttributeValue::S("ORG#o-1".to_string()),
            "tags".to_string() => AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]),
        );

        let output = schema_unmarshal(Some(dynamo_map_to_json(input).unwrap())).unwrap();

        assert_eq!(
            Value::Object(output),
            json!({
                "userId": "u-1",
                "organizationId": "o-1",
                "tags": ["a", "b"],
            })
        );
    }

    #[test]
    fn test_binary_unsupported() {
        let input: DynamoMap = collection!(
            "blob".to_string() => AttributeValue::B(Blob::new(vec![1, 2, 3])),
        );
        assert!(dynamo_map_to_json(input).is_err());
    }

    #[test]
    fn test_invalid_number() {
        let input: DynamoMap = collection!(
            "num".to_string() => AttributeValue::N("not-a-number".to_string()),
        );
        assert!(dynamo_map_to_json(input).is_err());
    }
}
