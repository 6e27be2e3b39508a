// Server module entry point
// Listener creation, connection handling, the accept loop and shutdown,
// plus the stream wrapper that isolates hyper's own error responses

pub mod connection;
pub mod listener;
pub mod signal;
pub mod stream;

// `loop` is a keyword, so the file is mounted under another name
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::start_server_loop;
pub use signal::shutdown_signal;
