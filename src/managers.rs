use fractic_server_error::ServerError;

use crate::errors::InvalidObjectPath;

pub mod cognito;
pub mod lambda;
pub mod s3;
pub mod ses;
pub mod slack;
pub mod sqs;
pub mod usage_logs_reader;
pub mod usage_logs_writer;
pub mod user_organization;

/// Splits a `bucket/path/to/key` location into its bucket and key. Both parts
/// must be non-empty.
pub(crate) fn split_object_path(path: &str) -> Result<(&str, &str), ServerError> {
    match path.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(InvalidObjectPath::new(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_object_path() {
        assert_eq!(
            split_object_path("bucket/file.json").unwrap(),
            ("bucket", "file.json")
        );
        assert_eq!(
            split_object_path("bucket/2024/03/01/logs-1").unwrap(),
            ("bucket", "2024/03/01/logs-1")
        );
    }

    #[test]
    fn test_split_object_path_invalid() {
        assert!(split_object_path("").is_err());
        assert!(split_object_path("bucket").is_err());
        assert!(split_object_path("bucket/").is_err());
        assert!(split_object_path("/key").is_err());
    }
}
