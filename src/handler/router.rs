//! Request dispatch module
//!
//! Entry point for HTTP request processing: method check, static file
//! resolution, then the isolation headers and the access log line.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, SERVER};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) URL path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    /// Ignored when the client also sent `If-None-Match`
    pub if_modified_since: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn from_parts(parts: &'a Parts) -> Self {
        let headers = &parts.headers;
        let if_modified_since = if headers.contains_key(IF_NONE_MATCH) {
            None
        } else {
            headers
                .get(IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            path: parts.uri.path(),
            query: parts.uri.query(),
            is_head: parts.method == Method::HEAD,
            if_modified_since,
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Never fails: every outcome, errors included, is a response carrying the
/// cross-origin isolation headers. Request bodies are never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let mut entry = state.config.logging.access_log.then(|| {
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        AccessLogEntry::new(
            peer_addr.ip().to_string(),
            parts.method.to_string(),
            target,
            parts.version,
        )
        .with_request_headers(&parts.headers)
    });

    let response = dispatch(&parts, &state).await;
    let response = finalize(response, &state);

    if let Some(entry) = entry.as_mut() {
        let body_bytes = if parts.method == Method::HEAD {
            0
        } else {
            body_len(&response)
        };
        entry.finish(response.status(), body_bytes, started.elapsed());
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch(parts: &Parts, state: &AppState) -> Response<Full<Bytes>> {
    match &parts.method {
        &Method::GET | &Method::HEAD => {
            let ctx = RequestContext::from_parts(parts);
            static_files::serve(&ctx, state.root()).await
        }
        method => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            http::build_501_response()
        }
    }
}

/// Post-processing applied to every response
fn finalize(mut response: Response<Full<Bytes>>, state: &AppState) -> Response<Full<Bytes>> {
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }
    http::finalize(response)
}

fn body_len(response: &Response<Full<Bytes>>) -> usize {
    response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}
