//! Liveness heartbeat.
//!
//! Prints `[Still Running: N minutes]` to stdout once per interval so an
//! operator tailing the console can see the process is alive, and
//! `[Stopped]` on the way out. This is the only stdout output the daemon
//! produces outside of `tracing`.

use crate::error::DaemonError;
use crate::supervisor::Worker;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Worker name used for the heartbeat.
pub const HEARTBEAT_WORKER: &str = "heartbeat";

/// Heartbeat worker.
#[derive(Debug, Default)]
pub struct Heartbeat {
    beats: Arc<AtomicU64>,
}

impl Heartbeat {
    /// Create a heartbeat starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared beat counter, readable after the worker is spawned.
    pub fn beats(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.beats)
    }
}

#[async_trait]
impl Worker for Heartbeat {
    fn name(&self) -> &str {
        HEARTBEAT_WORKER
    }

    async fn run(&mut self) -> Result<(), DaemonError> {
        let minutes = self.beats.fetch_add(1, Ordering::SeqCst);
        println!("[Still Running: {} minutes]", minutes);
        Ok(())
    }

    async fn on_stop(&mut self) {
        println!("[Stopped]");
    }
}
