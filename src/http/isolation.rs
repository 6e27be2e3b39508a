//! Cross-origin isolation headers
//!
//! Pages opt into cross-origin isolation (and with it `SharedArrayBuffer`)
//! only when both headers are on the response that delivered them.

use hyper::header::{HeaderName, HeaderValue};
use hyper::Response;

pub const EMBEDDER_POLICY: HeaderName = HeaderName::from_static("cross-origin-embedder-policy");
pub const OPENER_POLICY: HeaderName = HeaderName::from_static("cross-origin-opener-policy");

pub const REQUIRE_CORP: HeaderValue = HeaderValue::from_static("require-corp");
pub const SAME_ORIGIN: HeaderValue = HeaderValue::from_static("same-origin");

/// Last step before a response leaves the handler, whatever its status.
///
/// Uses `insert` so each header ends up present exactly once.
pub fn finalize<B>(mut response: Response<B>) -> Response<B> {
    let headers = response.headers_mut();
    headers.insert(EMBEDDER_POLICY, REQUIRE_CORP);
    headers.insert(OPENER_POLICY, SAME_ORIGIN);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[test]
    fn test_headers_added_to_any_status() {
        for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::NOT_IMPLEMENTED] {
            let response = Response::builder().status(status).body(()).unwrap();
            let response = finalize(response);
            assert_eq!(response.status(), status);
            assert_eq!(response.headers()[EMBEDDER_POLICY], "require-corp");
            assert_eq!(response.headers()[OPENER_POLICY], "same-origin");
        }
    }

    #[test]
    fn test_headers_present_exactly_once() {
        let response = Response::builder()
            .header("cross-origin-opener-policy", "unsafe-none")
            .body(())
            .unwrap();
        let response = finalize(finalize(response));
        assert_eq!(response.headers().get_all(EMBEDDER_POLICY).iter().count(), 1);
        assert_eq!(response.headers().get_all(OPENER_POLICY).iter().count(), 1);
        assert_eq!(response.headers()[OPENER_POLICY], "same-origin");
    }

    #[test]
    fn test_other_headers_untouched() {
        let response = Response::builder()
            .header("content-type", "application/javascript")
            .body(())
            .unwrap();
        let response = finalize(response);
        assert_eq!(response.headers()["content-type"], "application/javascript");
        assert_eq!(response.headers().len(), 3);
    }
}
