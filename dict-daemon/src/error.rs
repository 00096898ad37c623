//! Error types for the maintainer daemon.
//!
//! Two classes matter to the run loop:
//! - **fatal**: the target collection is missing or its existence cannot be
//!   determined. The daemon stops and the process exits non-zero.
//! - **transient**: anything a single reconciliation, backup, or staging
//!   copy raises. Logged, then the loop carries on.

use crate::reconciler::ReconcileError;
use crate::registry::RegistryError;
use crate::workbook::WorkbookError;

/// Main error type for daemon operations.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The registry reports the target collection absent.
    #[error(
        "collection {} does not exist",
        .collection.as_deref().unwrap_or("<unknown>")
    )]
    CollectionMissing {
        /// Collection identifier, when the registry could supply one.
        collection: Option<String>,
    },

    /// The existence check itself failed.
    #[error("collection existence check failed: {0}")]
    ExistenceCheck(#[source] RegistryError),

    /// Spreadsheet error (backup, tab listing, tab copy).
    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Reconciliation pass failed.
    #[error("reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl DaemonError {
    /// True for errors that must terminate the daemon.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CollectionMissing { .. } | Self::ExistenceCheck(_)
        )
    }
}

/// Result type alias for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;
