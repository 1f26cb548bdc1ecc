//! Version allocation for newly created migration files

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Layout of timestamp versions
pub const VERSION_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Version given to the first file of an empty directory
pub const INITIAL_VERSION: &str = "00001";

/// True when `version` written in decimal is a valid `YYYYMMDDHHMMSS` stamp
pub fn is_timestamp_version(version: i64) -> bool {
    let text = version.to_string();
    text.len() == 14 && NaiveDateTime::parse_from_str(&text, VERSION_DATE_FORMAT).is_ok()
}

/// Render `now` as a timestamp version
pub fn timestamp_version(now: DateTime<Utc>) -> String {
    now.format(VERSION_DATE_FORMAT).to_string()
}

/// Version that follows `last`, using `now` for timestamp histories
pub fn next_version_at(last: i64, now: DateTime<Utc>) -> CoreResult<String> {
    if is_timestamp_version(last) {
        return Ok(timestamp_version(now));
    }
    let next = last
        .checked_add(1)
        .ok_or(CoreError::VersionOverflow { last })?;
    Ok(format!("{:05}", next))
}

/// Version that follows `last`: the current UTC time when `last` is a
/// timestamp, otherwise `last + 1` zero-padded to five digits.
pub fn next_version(last: i64) -> CoreResult<String> {
    next_version_at(last, Utc::now())
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
