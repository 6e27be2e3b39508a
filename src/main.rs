use std::sync::Arc;

use coi_serve::config::{AppState, Config};
use coi_serve::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // The serving root is fixed before any socket exists
    let state = AppState::new(cfg).map_err(|e| format!("Cannot resolve serving root: {e}"))?;
    let state = Arc::new(state);

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = state.config.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    let result = runtime.block_on(async_main(state));
    // In-flight connections are abandoned, not drained
    runtime.shutdown_background();
    result
}

async fn async_main(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = state.config.get_socket_addr()?;

    let listener = server::create_listener(addr).map_err(|e| {
        logger::log_error(&format!("Failed to bind {addr}: {e}"));
        e
    })?;

    // Ctrl+C must already be caught when the banner tells the user to press it
    let shutdown = server::shutdown_signal()?;

    logger::log_server_start(&listener.local_addr()?, state.root(), &state.config);

    server::start_server_loop(listener, state, shutdown).await?;
    Ok(())
}
