//! Shared small helpers.

use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;

/// Current UTC time as RFC 3339, used for document timestamps.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Current UTC time as RFC 2822, used for human-readable titles.
pub fn now_rfc2822() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc2822)
        .unwrap_or_default()
}

/// Current UTC time as `YYYY-MM-DD-HH-MM-SS`, safe for filesystem paths and
/// object storage keys.
pub fn now_key_timestamp() -> String {
    let format = format_description!("[year]-[month]-[day]-[hour]-[minute]-[second]");
    OffsetDateTime::now_utc()
        .format(format)
        .unwrap_or_default()
}
