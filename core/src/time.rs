//! Time related utils.

use crate::{Error, Result};
use chrono::{NaiveDateTime, Utc};

/// DateTime is the alias of `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Date format: "20220313"
const DATE: &str = "%Y%m%d";

/// Time format for ISO 8601: "20220313T072004Z"
const ISO8601: &str = "%Y%m%dT%H%M%SZ";

/// Create a new DateTime of current time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: "20220313"
pub fn format_date(t: DateTime) -> String {
    t.format(DATE).to_string()
}

/// Format time into ISO 8601 basic format: "20220313T072004Z"
pub fn format_iso8601(t: DateTime) -> String {
    t.format(ISO8601).to_string()
}

/// Parse time from ISO 8601 basic format: "20220313T072004Z"
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    NaiveDateTime::parse_from_str(s, ISO8601)
        .map(|v| v.and_utc())
        .map_err(|e| {
            Error::unexpected(format!("failed to parse iso8601 time {s}")).with_source(e)
        })
}

/// Parse time from RFC 3339: "2022-03-13T07:20:04Z"
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| {
            Error::unexpected(format!("failed to parse rfc3339 time {s}")).with_source(e)
        })
}
