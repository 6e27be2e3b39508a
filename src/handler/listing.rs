//! Generated directory index
//!
//! Used when a directory has no index file.

use crate::error::ServeError;
use crate::handler::router::RequestContext;
use crate::http;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;

/// Characters left alone when building link targets
const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// One row of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub display: String,
    /// Percent-encoded from the raw name bytes
    pub link: String,
}

impl ListingEntry {
    /// Directories get a trailing `/` on both sides; symlinks show an `@`
    pub fn new(name: &OsStr, is_dir: bool, is_symlink: bool) -> Self {
        let shown = name.to_string_lossy();
        let mut display = shown.to_string();
        let mut link = percent_encode(&name_bytes(name), LINK_ENCODE_SET).to_string();
        if is_dir {
            display.push('/');
            link.push('/');
        }
        if is_symlink {
            display = format!("{shown}@");
        }
        Self { display, link }
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> std::borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    std::borrow::Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> std::borrow::Cow<'_, [u8]> {
    std::borrow::Cow::Owned(name.to_string_lossy().into_owned().into_bytes())
}

pub async fn serve_listing(
    ctx: &RequestContext<'_>,
    dir: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let entries = read_entries(dir).await?;
    let display_path = percent_decode_str(ctx.path).decode_utf8_lossy();
    Ok(http::build_html_response(
        render_listing(&display_path, &entries),
        ctx.is_head,
    ))
}

/// Collect entries sorted case-insensitively by name
async fn read_entries(dir: &Path) -> Result<Vec<ListingEntry>, ServeError> {
    let mut reader = fs::read_dir(dir)
        .await
        .map_err(|e| ServeError::from_io(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| ServeError::from_io(dir, e))?
    {
        let is_symlink = entry.file_type().await.is_ok_and(|t| t.is_symlink());
        // follows symlinks, so a link to a directory still lists as one
        let is_dir = fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir());
        let name = entry.file_name();
        let key = name.to_string_lossy().to_lowercase();
        entries.push((key, ListingEntry::new(&name, is_dir, is_symlink)));
    }

    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// Render the HTML page for `display_path`
pub fn render_listing(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut html = String::new();
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>\n</head>\n<body>");
    let _ = writeln!(html, "<h1>{title}</h1>\n<hr>\n<ul>");
    for entry in entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            entry.link,
            escape_html(&entry.display)
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
