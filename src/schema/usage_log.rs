//! Usage logs: one metering event per billable API operation.
//!
//! Usage logs are appended to a Firehose delivery stream as JSON, each record
//! followed by the `$_$` delimiter. Firehose concatenates records into S3
//! objects, which are read back by splitting on the same delimiter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fractic_server_error::ServerError;
use serde::{Deserialize, Serialize};

use crate::errors::{UsageLogParseError, UsageLogSerializationError};

pub const USAGE_LOG_DELIMITER: &str = "$_$";

/// Billing flag (query parameter `billing`) requesting area-based billing.
pub const BILLING_BY_AREA_FLAG: &str = "by_haa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageLogMetricFamily {
    Sum,
    NewPolygonsFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageLogBillingType {
    Count,
    Area,
    ZoningArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageLogMetricType {
    DfLowRes,
    DfHighRes,
    DfCoverage,
    DrCoverage,
    DrXyz,
    DrBbox,
    DrPreWmtsCap,
    DrPreWmtsTile,
    Zoning,
}

/// Which API produced the log, and how it should be metered.
///
/// On the wire this is `{"type": ..., "metric": ..., "billingType"?: ...}`.
/// The metric family is fixed per type, and only high-res and zoning logs
/// carry a billing type, so for the known combinations those are derived
/// rather than stored. Any other combination decodes as `Irregular` and is
/// written back exactly as it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UsageLogSourceFields", into = "UsageLogSourceFields")]
pub enum UsageLogSource {
    DfLowRes,
    DfHighRes { billing_type: UsageLogBillingType },
    DfCoverage,
    DrCoverage,
    DrXyz,
    DrBbox,
    DrPreWmtsCap,
    DrPreWmtsTile,
    Zoning,
    Irregular(UsageLogSourceFields),
}

impl UsageLogSource {
    pub fn metric_type(&self) -> UsageLogMetricType {
        match self {
            UsageLogSource::DfLowRes => UsageLogMetricType::DfLowRes,
            UsageLogSource::DfHighRes { .. } => UsageLogMetricType::DfHighRes,
            UsageLogSource::DfCoverage => UsageLogMetricType::DfCoverage,
            UsageLogSource::DrCoverage => UsageLogMetricType::DrCoverage,
            UsageLogSource::DrXyz => UsageLogMetricType::DrXyz,
            UsageLogSource::DrBbox => UsageLogMetricType::DrBbox,
            UsageLogSource::DrPreWmtsCap => UsageLogMetricType::DrPreWmtsCap,
            UsageLogSource::DrPreWmtsTile => UsageLogMetricType::DrPreWmtsTile,
            UsageLogSource::Zoning => UsageLogMetricType::Zoning,
            UsageLogSource::Irregular(fields) => fields.metric_type,
        }
    }

    pub fn metric(&self) -> UsageLogMetricFamily {
        match self {
            UsageLogSource::DfHighRes { .. } | UsageLogSource::Zoning => {
                UsageLogMetricFamily::NewPolygonsFilter
            }
            UsageLogSource::Irregular(fields) => fields.metric,
            _ => UsageLogMetricFamily::Sum,
        }
    }

    pub fn billing_type(&self) -> Option<UsageLogBillingType> {
        match self {
            UsageLogSource::DfHighRes { billing_type } => Some(*billing_type),
            UsageLogSource::Zoning => Some(UsageLogBillingType::ZoningArea),
            UsageLogSource::Irregular(fields) => fields.billing_type,
            _ => None,
        }
    }

    pub fn is_irregular(&self) -> bool {
        matches!(self, UsageLogSource::Irregular(_))
    }

    /// The typed source for a well-formed field combination.
    fn known(fields: &UsageLogSourceFields) -> Option<Self> {
        let source = match (fields.metric_type, fields.billing_type) {
            (
                UsageLogMetricType::DfHighRes,
                Some(billing_type @ (UsageLogBillingType::Count | UsageLogBillingType::Area)),
            ) => UsageLogSource::DfHighRes { billing_type },
            (UsageLogMetricType::Zoning, Some(UsageLogBillingType::ZoningArea)) => {
                UsageLogSource::Zoning
            }
            (UsageLogMetricType::DfLowRes, None) => UsageLogSource::DfLowRes,
            (UsageLogMetricType::DfCoverage, None) => UsageLogSource::DfCoverage,
            (UsageLogMetricType::DrCoverage, None) => UsageLogSource::DrCoverage,
            (UsageLogMetricType::DrXyz, None) => UsageLogSource::DrXyz,
            (UsageLogMetricType::DrBbox, None) => UsageLogSource::DrBbox,
            (UsageLogMetricType::DrPreWmtsCap, None) => UsageLogSource::DrPreWmtsCap,
            (UsageLogMetricType::DrPreWmtsTile, None) => UsageLogSource::DrPreWmtsTile,
            _ => return None,
        };
        (source.metric() == fields.metric).then_some(source)
    }
}

/// Wire form of `UsageLogSource`, field for field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLogSourceFields {
    #[serde(rename = "type")]
    pub metric_type: UsageLogMetricType,
    pub metric: UsageLogMetricFamily,
    #[serde(
        rename = "billingType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub billing_type: Option<UsageLogBillingType>,
}

impl From<UsageLogSource> for UsageLogSourceFields {
    fn from(source: UsageLogSource) -> Self {
        match source {
            UsageLogSource::Irregular(fields) => fields,
            known => UsageLogSourceFields {
                metric_type: known.metric_type(),
                metric: known.metric(),
                billing_type: known.billing_type(),
            },
        }
    }
}

impl From<UsageLogSourceFields> for UsageLogSource {
    fn from(fields: UsageLogSourceFields) -> Self {
        UsageLogSource::known(&fields).unwrap_or(UsageLogSource::Irregular(fields))
    }
}

/// Polygons processed by a high-resolution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPolygonPayload {
    pub id: String,
    pub version: String,
    pub area: f64,
    pub count: i64,
    pub country: String,
    pub mgrs: String,
}

/// Imagery delivered through a partial-DR subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartialDrPayload {
    pub subscription_id: String,
    pub version: String,
    pub area: f64,
    pub date: String,
    pub data_source: String,
    pub mgrs: String,
}

/// Partial-DR logs reuse the polygon payload slot, so either entry shape may
/// appear in `payload`. Entries matching neither shape exactly are kept as
/// raw JSON. All entries are written back as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageLogPayload {
    NewPolygon(NewPolygonPayload),
    PartialDr(PartialDrPayload),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLog {
    pub request_id: String,
    pub source: UsageLogSource,
    pub organization_id: String,
    pub api_key_id: String,
    /// Milliseconds since the unix epoch.
    pub time_stamp: i64,
    /// UTC date of `time_stamp`, as `YYYY-MM-DD`.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<UsageLogPayload>>,
}

/// Identifying context of the inbound request a usage log is attributed to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub request_id: String,
    /// API key token; doubles as the organization ID.
    pub token: Option<String>,
    pub billing: Option<String>,
}

impl RequestContext {
    pub fn from_query_parameters(
        request_id: impl Into<String>,
        query_parameters: &HashMap<String, String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            token: query_parameters.get("token").cloned(),
            billing: query_parameters.get("billing").cloned(),
        }
    }

    fn billing_type(&self) -> UsageLogBillingType {
        match self.billing.as_deref() {
            Some(BILLING_BY_AREA_FLAG) => UsageLogBillingType::Area,
            _ => UsageLogBillingType::Count,
        }
    }
}

impl UsageLog {
    /// High-res delineated fields, billed by area when the request asked for
    /// it (`billing=by_haa`) and by count otherwise.
    pub fn delineated_fields(
        request: &RequestContext,
        features: Vec<NewPolygonPayload>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::high_res(request, request.billing_type(), features, at)
    }

    /// High-res delineated fields, always billed by count.
    pub fn delineated_fields_count(
        request: &RequestContext,
        features: Vec<NewPolygonPayload>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::high_res(request, UsageLogBillingType::Count, features, at)
    }

    pub fn partial_dr_imagery(
        features: Vec<PartialDrPayload>,
        organization_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        UsageLog {
            request_id: features
                .first()
                .map(|f| f.subscription_id.clone())
                .unwrap_or_default(),
            source: UsageLogSource::DrBbox,
            organization_id: organization_id.to_string(),
            api_key_id: organization_id.to_string(),
            time_stamp: at.timestamp_millis(),
            date: format_date(at),
            payload: Some(features.into_iter().map(UsageLogPayload::PartialDr).collect()),
        }
    }

    fn high_res(
        request: &RequestContext,
        billing_type: UsageLogBillingType,
        features: Vec<NewPolygonPayload>,
        at: DateTime<Utc>,
    ) -> Self {
        let token = request.token.clone().unwrap_or_default();
        UsageLog {
            request_id: request.request_id.clone(),
            source: UsageLogSource::DfHighRes { billing_type },
            organization_id: token.clone(),
            api_key_id: token,
            time_stamp: at.timestamp_millis(),
            date: format_date(at),
            payload: Some(features.into_iter().map(UsageLogPayload::NewPolygon).collect()),
        }
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

// Wire format.
// --------------------------------------------------

/// Encodes a single log as one stream record, including the trailing
/// delimiter.
pub fn encode_usage_log(usage_log: &UsageLog) -> Result<String, ServerError> {
    let json =
        serde_json::to_string(usage_log).map_err(|e| UsageLogSerializationError::with_debug(&e))?;
    Ok(format!("{json}{USAGE_LOG_DELIMITER}"))
}

/// Decodes a concatenation of records (ex. an S3 object written by Firehose).
///
/// Empty segments are skipped, but whitespace-only segments are not, and fail
/// to parse like any other invalid segment.
pub fn decode_usage_log_batch(batch: &str) -> Result<Vec<UsageLog>, ServerError> {
    batch
        .split(USAGE_LOG_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            serde_json::from_str::<UsageLog>(segment)
                .map_err(|e| UsageLogParseError::with_debug(&e))
        })
        .collect()
}
