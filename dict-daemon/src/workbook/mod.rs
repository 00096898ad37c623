//! Dictionary spreadsheet abstraction.
//!
//! The daemon treats the spreadsheet as an opaque store it can back up and
//! whose tabs it can copy into a staging spreadsheet. The tab schema is the
//! reconciler's concern.

mod local;
mod mock;

pub use local::LocalWorkbook;
pub use mock::{CopyCall, MockWorkbook};

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Workbook errors.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required setting is missing.
    #[error("workbook not configured: {0} is required")]
    NotConfigured(&'static str),

    /// Spreadsheet service refused the call.
    #[error("spreadsheet unavailable: {0}")]
    Unavailable(String),
}

/// Access to the dictionary spreadsheet and its staging copy.
#[async_trait]
pub trait Workbook: Send + Sync + 'static {
    /// Identifier of the dictionary spreadsheet.
    fn spreadsheet_id(&self) -> &str;

    /// Identifier of the staging spreadsheet.
    fn staging_spreadsheet_id(&self) -> &str;

    /// Names of the tabs the reconciler manages.
    async fn managed_tab_names(&self) -> Result<BTreeSet<String>, WorkbookError>;

    /// Take a full backup of the dictionary spreadsheet.
    async fn backup(&self) -> Result<(), WorkbookError>;

    /// Copy `tabs` from spreadsheet `source_id` into `dest_id`.
    async fn copy_tabs(
        &self,
        source_id: &str,
        dest_id: &str,
        tabs: &BTreeSet<String>,
    ) -> Result<(), WorkbookError>;

    /// Reset any cached session or backoff state.
    fn restart(&self);
}
