//! HTTP protocol layer module
//!
//! Content types, cache validation, response builders and the
//! cross-origin isolation step, independent of how paths are resolved.

pub mod cache;
pub mod isolation;
pub mod mime;
pub mod response;

// Re-export commonly used items
pub use isolation::finalize;
pub use response::{
    build_304_response, build_404_response, build_501_response, build_error_response,
    build_file_response, build_html_response, build_redirect_response,
};
