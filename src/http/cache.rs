//! HTTP cache validation module
//!
//! Provides `Last-Modified` formatting and `If-Modified-Since` evaluation.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate, the preferred HTTP-date form
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a modification time as an HTTP date
///
/// # Examples
/// ```
/// use coi_serve::http::cache::format_http_date;
/// use std::time::{Duration, UNIX_EPOCH};
/// let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
/// assert_eq!(format_http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
/// ```
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE).to_string()
}

/// Parse an HTTP date; `None` for anything malformed
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check whether the client's copy is still current
///
/// HTTP dates only carry whole seconds, so the file time is truncated
/// before comparing. An unparseable header never matches.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    let modified = DateTime::<Utc>::from(modified);
    modified.timestamp() <= since.timestamp()
}
