// Signal handling module
//
// Supported signals:
// - SIGINT:  Shutdown (Ctrl+C)
// - SIGTERM: Shutdown (unix only)

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Shutdown listeners, registered as soon as this value exists
///
/// Once registered, an interrupt no longer kills the process with the
/// default action, even before the accept loop polls [`ShutdownSignal::recv`].
/// In-flight connections are not drained; the caller simply stops accepting
/// and returns.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignal {
    /// Install the handlers. Must run inside the tokio runtime.
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Windows fallback - only handles Ctrl+C
    #[cfg(windows)]
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Resolve once the process is asked to stop
    #[cfg(unix)]
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }

    #[cfg(windows)]
    pub async fn recv(mut self) {
        self.ctrl_c.recv().await;
    }
}

/// Register the shutdown listeners now and return the future that waits on them
pub fn shutdown_signal() -> io::Result<impl std::future::Future<Output = ()>> {
    ShutdownSignal::register().map(ShutdownSignal::recv)
}
