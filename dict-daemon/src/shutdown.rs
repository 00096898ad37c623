//! Process-wide shutdown signal.
//!
//! Starts cleared. Once triggered it stays set for the rest of the run;
//! `reset()` exists only for starting a fresh run after a stopped one and
//! must not be called while a run loop is active.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cloneable handle to the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Create a cleared signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Clear the flag between independent runs.
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Trigger on Ctrl-C / SIGINT.
    pub fn trigger_on_ctrl_c(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Interrupt received, stopping after the current step");
                    signal.trigger();
                }
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
            }
        })
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
