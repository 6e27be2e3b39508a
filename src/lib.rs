//! Static file server for pages that need cross-origin isolation.
//!
//! Every response carries `Cross-Origin-Embedder-Policy: require-corp` and
//! `Cross-Origin-Opener-Policy: same-origin`, and `.js` files are always
//! served as `application/javascript`, so threaded WebAssembly and module
//! workers run straight from a local directory.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
