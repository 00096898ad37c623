//! Sync engine adapter.
//!
//! Thin layer over the workbook and reconciler that gives the run loop one
//! call per step. Nothing here retries; a failed step is reported to the
//! caller, which decides whether the loop carries on.

use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::workbook::Workbook;
use sd2_dict_core::staging_tabs;
use std::collections::BTreeSet;
use std::time::Duration;

/// Operations the run loop and backup worker invoke.
#[derive(Debug)]
pub struct SyncEngine<W, C> {
    workbook: W,
    reconciler: C,
}

impl<W: Workbook, C: Reconciler> SyncEngine<W, C> {
    /// Create an engine over a workbook and reconciler.
    pub fn new(workbook: W, reconciler: C) -> Self {
        Self {
            workbook,
            reconciler,
        }
    }

    /// The underlying workbook.
    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    /// The underlying reconciler.
    pub fn reconciler(&self) -> &C {
        &self.reconciler
    }

    /// Re-arm both collaborators.
    pub fn restart(&self) {
        self.workbook.restart();
        self.reconciler.restart();
    }

    /// Run one reconciliation pass and return its duration.
    pub async fn maintain_once(&self, test_mode: bool) -> Result<Duration> {
        Ok(self.reconciler.maintain(test_mode).await?)
    }

    /// Back up the dictionary spreadsheet.
    pub async fn backup_now(&self) -> Result<()> {
        Ok(self.workbook.backup().await?)
    }

    /// Copy `tabs`, plus the mapping-failures tab, into the staging
    /// spreadsheet.
    pub async fn copy_staging_tabs(&self, tabs: BTreeSet<String>) -> Result<()> {
        let tabs = staging_tabs(tabs);
        tracing::debug!(
            "Copying {} tabs from {} to {}",
            tabs.len(),
            self.workbook.spreadsheet_id(),
            self.workbook.staging_spreadsheet_id()
        );

        self.workbook
            .copy_tabs(
                self.workbook.spreadsheet_id(),
                self.workbook.staging_spreadsheet_id(),
                &tabs,
            )
            .await?;
        Ok(())
    }

    /// Copy every managed tab into the staging spreadsheet.
    pub async fn stage_managed_tabs(&self) -> Result<()> {
        let tabs = self.workbook.managed_tab_names().await?;
        self.copy_staging_tabs(tabs).await
    }
}
