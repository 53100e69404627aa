use fractic_server_error::{define_client_error, define_internal_error};

// Usage logs.
define_internal_error!(
    UsageLogParseError,
    "Usage log batch contained an unparsable segment."
);
define_internal_error!(
    UsageLogSerializationError,
    "Failed to serialize usage log."
);

// Inputs.
define_client_error!(
    InvalidObjectPath,
    "Invalid object path: {details}.",
    { details: &str }
);
define_client_error!(
    InvalidMessageId,
    "Invalid queue message ID: {details}.",
    { details: &str }
);
define_internal_error!(
    PayloadSerializationError,
    "Failed to serialize outbound payload: {details}.",
    { details: &str }
);

// AWS callouts.
define_internal_error!(S3CalloutError, "Generic S3 error.");
define_internal_error!(SqsCalloutError, "Generic SQS error.");
define_internal_error!(SesCalloutError, "Generic SES error.");
define_internal_error!(CognitoCalloutError, "Generic Cognito error.");
define_internal_error!(LambdaCalloutError, "Generic Lambda error.");
define_internal_error!(FirehoseCalloutError, "Generic Firehose error.");
define_internal_error!(DynamoCalloutError, "Generic DynamoDB error.");
define_internal_error!(
    DynamoItemParsingError,
    "DynamoDB item parsing error: {details}.",
    { details: &str }
);
define_internal_error!(
    CognitoAttributesParsingError,
    "Failed to parse Cognito user attributes."
);
define_internal_error!(
    LambdaResponseParsingError,
    "Failed to parse Lambda response payload."
);

// Slack.
define_internal_error!(SlackCalloutError, "Generic Slack error.");
define_internal_error!(
    SlackApiError,
    "Slack API rejected request: {details}.",
    { details: &str }
);
