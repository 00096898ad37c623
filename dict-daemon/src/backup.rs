//! Standalone backup worker.
//!
//! Used when backups are not driven from the main loop. Every run takes a
//! backup and then refreshes the staging spreadsheet; the interval comes from
//! `RunConfig::backup_worker_interval`.

use crate::engine::SyncEngine;
use crate::error::DaemonError;
use crate::reconciler::Reconciler;
use crate::supervisor::Worker;
use crate::workbook::Workbook;
use async_trait::async_trait;
use std::sync::Arc;

/// Worker name used for the backup worker.
pub const BACKUP_WORKER: &str = "backup";

/// Periodic backup + staging copy.
pub struct BackupWorker<W, C> {
    engine: Arc<SyncEngine<W, C>>,
}

impl<W: Workbook, C: Reconciler> BackupWorker<W, C> {
    /// Create a backup worker sharing the run loop's engine.
    pub fn new(engine: Arc<SyncEngine<W, C>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<W: Workbook, C: Reconciler> Worker for BackupWorker<W, C> {
    fn name(&self) -> &str {
        BACKUP_WORKER
    }

    async fn run(&mut self) -> Result<(), DaemonError> {
        tracing::info!("Executing Dictionary backup");
        // A failed backup skips this round's staging copy.
        self.engine.backup_now().await?;
        self.engine.stage_managed_tabs().await
    }

    async fn on_stop(&mut self) {
        tracing::info!("Stopping Dictionary backups");
    }
}
