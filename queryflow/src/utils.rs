//! Small shared utilities.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Generates a run identifier for tracing a single invocation.
#[must_use]
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns the current UTC time as an ISO 8601 string with millisecond
/// precision.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
