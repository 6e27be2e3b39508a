//! Static file serving module
//!
//! Translates request paths onto the serving root, reads files and picks
//! between file, index file, redirect and generated listing.

use crate::error::ServeError;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Tried in order when a directory is requested
pub const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Map a URL path onto the filesystem below `root`
///
/// The path is percent-decoded to raw bytes and normalized: empty and `.`
/// segments are skipped, `..` drops the previous segment but never climbs
/// above `root`. Segments carrying a backslash or NUL are ignored.
pub fn translate_path(root: &Path, request_path: &str) -> PathBuf {
    let decoded: Vec<u8> = percent_decode_str(request_path).collect();

    let mut segments: Vec<&[u8]> = Vec::new();
    for segment in decoded.split(|&b| b == b'/') {
        match segment {
            b"" | b"." => {}
            b".." => {
                segments.pop();
            }
            s if s.contains(&b'\\') || s.contains(&0) => {}
            s => segments.push(s),
        }
    }

    segments
        .into_iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment_path(segment)))
}

/// File names are bytes on unix, so escapes that are not UTF-8 still match
#[cfg(unix)]
fn segment_path(segment: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(segment))
}

#[cfg(not(unix))]
fn segment_path(segment: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(segment).into_owned())
}

/// Serve whatever `ctx.path` names under `root`
pub async fn serve(ctx: &RequestContext<'_>, root: &Path) -> Response<Full<Bytes>> {
    match try_serve(ctx, root).await {
        Ok(response) => response,
        Err(err) => {
            if matches!(err, ServeError::Io { .. }) {
                logger::log_error(&err.to_string());
            }
            http::build_error_response(err.status(), ctx.is_head)
        }
    }
}

async fn try_serve(
    ctx: &RequestContext<'_>,
    root: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let target = translate_path(root, ctx.path);
    let resolved = contain(root, &target).await?;
    let metadata = fs::metadata(&resolved)
        .await
        .map_err(|e| ServeError::from_io(&target, e))?;

    if metadata.is_dir() {
        if !ctx.path.ends_with('/') {
            return Ok(http::build_redirect_response(
                &directory_location(ctx.path, ctx.query),
                ctx.is_head,
            ));
        }
        for index in INDEX_FILES {
            let candidate = resolved.join(index);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                return serve_file(ctx, &candidate, &target.join(index)).await;
            }
        }
        return listing::serve_listing(ctx, &resolved).await;
    }

    if ctx.path.ends_with('/') {
        return Err(ServeError::NotFound(target.display().to_string()));
    }
    serve_file(ctx, &resolved, &target).await
}

/// Canonicalize `target` and make sure it is still below `root`
async fn contain(root: &Path, target: &Path) -> Result<PathBuf, ServeError> {
    let resolved = fs::canonicalize(target)
        .await
        .map_err(|e| ServeError::from_io(target, e))?;
    if !resolved.starts_with(root) {
        logger::log_warning(&format!(
            "Path escapes serving root: {} -> {}",
            target.display(),
            resolved.display()
        ));
        return Err(ServeError::NotFound(target.display().to_string()));
    }
    Ok(resolved)
}

/// Read one file; the content type comes from the requested name so a
/// symlink keeps the type its link name implies
async fn serve_file(
    ctx: &RequestContext<'_>,
    file: &Path,
    requested: &Path,
) -> Result<Response<Full<Bytes>>, ServeError> {
    let metadata = fs::metadata(file)
        .await
        .map_err(|e| ServeError::from_io(file, e))?;
    let modified = metadata.modified().ok();
    let last_modified = modified.map(cache::format_http_date);

    if let (Some(modified), Some(last_modified)) = (modified, last_modified.as_deref()) {
        if cache::not_modified_since(ctx.if_modified_since.as_deref(), modified) {
            return Ok(http::build_304_response(last_modified));
        }
    }

    let content = fs::read(file)
        .await
        .map_err(|e| ServeError::from_io(file, e))?;
    let content_type = mime::resolve_content_type(requested);

    Ok(http::build_file_response(
        Bytes::from(content),
        content_type,
        last_modified.as_deref(),
        ctx.is_head,
    ))
}

fn directory_location(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{path}/?{q}"),
        None => format!("{path}/"),
    }
}
