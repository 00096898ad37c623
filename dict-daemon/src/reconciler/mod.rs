//! Dictionary reconciliation abstraction.
//!
//! One call to [`Reconciler::maintain`] is one reconciliation pass between
//! the dictionary spreadsheet and the registry. How entries are compared
//! and merged lives behind this trait.

mod command;
mod mock;

pub use command::CommandReconciler;
pub use mock::MockReconciler;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The reconciliation program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The pass ran but did not succeed.
    #[error("reconciliation failed: {0}")]
    Failed(String),

    /// A required setting is missing.
    #[error("reconciler not configured: {0} is required")]
    NotConfigured(&'static str),
}

/// Runs reconciliation passes.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    /// Perform one pass and report how long it took.
    ///
    /// In test mode the pass is a single trial update.
    async fn maintain(&self, test_mode: bool) -> Result<Duration, ReconcileError>;

    /// Reset any cached session or backoff state.
    fn restart(&self) {}
}
