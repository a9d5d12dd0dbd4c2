//! SIGINT and SIGTERM delivered to the process while a session runs.
//!
//! Raw mode swallows Ctrl+C as a key, but a signal sent with `kill` (or a
//! Ctrl+C while the UI stream is redirected) arrives here instead. Both
//! become [`super::Event::Interrupt`], so widgets see one abort path.

use tokio::signal::unix::{signal, Signal, SignalKind};

pub struct OsSignals {
    interrupt: Option<Signal>,
    terminate: Option<Signal>,
}

impl OsSignals {
    /// Register the handlers. A handler that cannot be installed is skipped.
    pub fn install() -> Self {
        let interrupt = signal(SignalKind::interrupt())
            .map_err(|e| tracing::warn!(error = %e, "cannot watch SIGINT"))
            .ok();
        let terminate = signal(SignalKind::terminate())
            .map_err(|e| tracing::warn!(error = %e, "cannot watch SIGTERM"))
            .ok();
        Self { interrupt, terminate }
    }

    /// Resolves when either signal arrives.
    pub async fn recv(&mut self) {
        tokio::select! {
            () = wait(self.interrupt.as_mut()) => tracing::debug!("SIGINT received"),
            () = wait(self.terminate.as_mut()) => tracing::debug!("SIGTERM received"),
        }
    }
}

async fn wait(signal: Option<&mut Signal>) {
    if let Some(signal) = signal {
        if signal.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await;
}
