mod context;
pub mod errors;
pub mod logging;
pub mod managers;
pub mod schema;

pub use context::*;
pub use managers::{
    cognito::CognitoManager,
    lambda::LambdaManager,
    s3::S3Manager,
    ses::SesManager,
    slack::{SlackManager, SlackNotificationPayload},
    sqs::{BulkSendResult, QueueManager},
    usage_logs_reader::UsageLogsReadManager,
    usage_logs_writer::UsageLogsWriterManager,
    user_organization::{OrganizationUser, UserOrganization, UserOrganizationRepository},
};
pub use schema::{
    schema_unmarshal,
    usage_log::{decode_usage_log_batch, encode_usage_log, RequestContext, UsageLog},
};
