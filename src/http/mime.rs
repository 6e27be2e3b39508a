//! MIME type detection module
//!
//! Returns the Content-Type for a served path.

use std::path::Path;

const FALLBACK: &str = "application/octet-stream";
const JAVASCRIPT: &str = "application/javascript";

/// Resolve the Content-Type for a path
///
/// Uses the `mime_guess` extension table, except that anything whose name
/// ends in `.js` is always `application/javascript`; some platform tables
/// report `text/plain` and browsers then refuse to run module scripts.
///
/// # Examples
/// ```
/// use coi_serve::http::mime::resolve_content_type;
/// use std::path::Path;
/// assert_eq!(resolve_content_type(Path::new("app.js")), "application/javascript");
/// assert_eq!(resolve_content_type(Path::new("index.html")), "text/html");
/// assert_eq!(resolve_content_type(Path::new("blob")), "application/octet-stream");
/// ```
pub fn resolve_content_type(path: &Path) -> &'static str {
    if path.to_string_lossy().ends_with(".js") {
        return JAVASCRIPT;
    }
    mime_guess::from_path(path).first_raw().unwrap_or(FALLBACK)
}
