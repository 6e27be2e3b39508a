//! Request handler module
//!
//! Request dispatch, static file resolution and the generated directory
//! index.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
