//! Mock workbook for testing.
//!
//! Records backups and tab copies, and can be told to fail the next call.

use super::{Workbook, WorkbookError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// A recorded `copy_tabs` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    /// Source spreadsheet.
    pub source_id: String,
    /// Destination spreadsheet.
    pub dest_id: String,
    /// Tabs copied.
    pub tabs: BTreeSet<String>,
}

/// Mock workbook for testing.
#[derive(Debug)]
pub struct MockWorkbook {
    spreadsheet_id: String,
    staging_id: String,
    inner: Arc<Mutex<MockWorkbookInner>>,
}

#[derive(Debug, Default)]
struct MockWorkbookInner {
    tabs: BTreeSet<String>,
    backups: usize,
    copies: Vec<CopyCall>,
    restarts: usize,
    fail_next_backup: Option<String>,
    fail_next_copy: Option<String>,
}

impl MockWorkbook {
    /// Create a mock workbook with the given managed tabs.
    pub fn new<I, S>(tabs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = MockWorkbookInner {
            tabs: tabs.into_iter().map(Into::into).collect(),
            ..MockWorkbookInner::default()
        };
        Self {
            spreadsheet_id: "dictionary".to_string(),
            staging_id: "staging".to_string(),
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Override the spreadsheet identifiers.
    pub fn with_ids(mut self, spreadsheet_id: &str, staging_id: &str) -> Self {
        self.spreadsheet_id = spreadsheet_id.to_string();
        self.staging_id = staging_id.to_string();
        self
    }

    /// Number of successful backups.
    pub fn backups(&self) -> usize {
        self.inner.lock().unwrap().backups
    }

    /// All successful `copy_tabs` calls, oldest first.
    pub fn copies(&self) -> Vec<CopyCall> {
        self.inner.lock().unwrap().copies.clone()
    }

    /// Number of `restart()` calls.
    pub fn restarts(&self) -> usize {
        self.inner.lock().unwrap().restarts
    }

    /// Cause the next backup to fail with the given error.
    pub fn fail_next_backup(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_backup = Some(error.to_string());
    }

    /// Cause the next tab copy to fail with the given error.
    pub fn fail_next_copy(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_copy = Some(error.to_string());
    }
}

impl Clone for MockWorkbook {
    fn clone(&self) -> Self {
        Self {
            spreadsheet_id: self.spreadsheet_id.clone(),
            staging_id: self.staging_id.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Workbook for MockWorkbook {
    fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn staging_spreadsheet_id(&self) -> &str {
        &self.staging_id
    }

    async fn managed_tab_names(&self) -> Result<BTreeSet<String>, WorkbookError> {
        Ok(self.inner.lock().unwrap().tabs.clone())
    }

    async fn backup(&self) -> Result<(), WorkbookError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_backup.take() {
            return Err(WorkbookError::Unavailable(error));
        }
        inner.backups += 1;
        Ok(())
    }

    async fn copy_tabs(
        &self,
        source_id: &str,
        dest_id: &str,
        tabs: &BTreeSet<String>,
    ) -> Result<(), WorkbookError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_copy.take() {
            return Err(WorkbookError::Unavailable(error));
        }
        inner.copies.push(CopyCall {
            source_id: source_id.to_string(),
            dest_id: dest_id.to_string(),
            tabs: tabs.clone(),
        });
        Ok(())
    }

    fn restart(&self) {
        self.inner.lock().unwrap().restarts += 1;
    }
}
