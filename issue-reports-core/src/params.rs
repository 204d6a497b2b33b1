//! Report form parameters: field names and typed lookups over the raw
//! string map. Each report applies its own rules on top.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

pub type RawParams = HashMap<String, String>;

pub const PROJECT_ID: &str = "selectedProjectId";
pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const INTERVAL: &str = "interval";

pub const PROJECT_OR_FILTER_ID: &str = "projectOrFilterId";
pub const PERIOD_NAME: &str = "periodName";
pub const DAYS_PREVIOUS: &str = "daysprevious";
pub const CUMULATIVE: &str = "cumulative";
pub const SHOW_UNRESOLVED_TREND: &str = "showUnresolvedTrend";

/// Non-empty, trimmed value of `key`.
pub fn get_str<'a>(params: &'a RawParams, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// `None` when absent or not an integer.
pub fn get_long(params: &RawParams, key: &str) -> Option<i64> {
    get_str(params, key)?.parse().ok()
}

/// Case-insensitive `"true"`; anything else is false.
pub fn get_bool(params: &RawParams, key: &str) -> bool {
    get_str(params, key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Parses `key` with the first matching format, at midnight UTC.
pub fn get_date(params: &RawParams, key: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    let raw = get_str(params, key)?;
    parse_date(raw, formats)
}

pub fn parse_date(raw: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
