//! Workbook backed by tab exports on the local filesystem.
//!
//! Layout under `data_dir`:
//!
//! ```text
//! <data_dir>/<spreadsheet_id>/<tab>.csv          dictionary tabs
//! <data_dir>/<staging_id>/<tab>.csv              staging copies
//! <data_dir>/backups/<spreadsheet_id>-<stamp>/   one directory per backup
//! ```

use super::{Workbook, WorkbookError};
use crate::config::WorkbookConfig;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const TAB_EXTENSION: &str = "csv";

/// Workbook stored as per-tab files in a directory.
#[derive(Debug, Clone)]
pub struct LocalWorkbook {
    data_dir: PathBuf,
    spreadsheet_id: String,
    staging_id: String,
    tabs: BTreeSet<String>,
}

impl LocalWorkbook {
    /// Build a workbook from configuration.
    pub fn new(config: &WorkbookConfig) -> Result<Self, WorkbookError> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .ok_or(WorkbookError::NotConfigured("workbook.spreadsheet_id"))?;
        let staging_id = config
            .staging_spreadsheet_id
            .clone()
            .ok_or(WorkbookError::NotConfigured("workbook.staging_spreadsheet_id"))?;

        Ok(Self {
            data_dir: config.data_dir.clone(),
            spreadsheet_id,
            staging_id,
            tabs: config.tabs.clone(),
        })
    }

    fn sheet_dir(&self, id: &str) -> PathBuf {
        self.data_dir.join(id)
    }

    fn tab_path(&self, id: &str, tab: &str) -> PathBuf {
        self.sheet_dir(id).join(format!("{}.{}", tab, TAB_EXTENSION))
    }

    /// Tab names found on disk for spreadsheet `id`.
    async fn tabs_on_disk(&self, id: &str) -> Result<BTreeSet<String>, WorkbookError> {
        let dir = self.sheet_dir(id);
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_at(&dir))?;
        let mut tabs = BTreeSet::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_at(&dir))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TAB_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tabs.insert(stem.to_string());
            }
        }
        Ok(tabs)
    }
}

fn io_at(path: &Path) -> impl Fn(std::io::Error) -> WorkbookError + '_ {
    move |source| WorkbookError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl Workbook for LocalWorkbook {
    fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn staging_spreadsheet_id(&self) -> &str {
        &self.staging_id
    }

    async fn managed_tab_names(&self) -> Result<BTreeSet<String>, WorkbookError> {
        if !self.tabs.is_empty() {
            return Ok(self.tabs.clone());
        }
        self.tabs_on_disk(&self.spreadsheet_id).await
    }

    async fn backup(&self) -> Result<(), WorkbookError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let dest = self
            .data_dir
            .join("backups")
            .join(format!("{}-{}", self.spreadsheet_id, stamp));
        tokio::fs::create_dir_all(&dest).await.map_err(io_at(&dest))?;

        let tabs = self.tabs_on_disk(&self.spreadsheet_id).await?;
        for tab in &tabs {
            let from = self.tab_path(&self.spreadsheet_id, tab);
            let to = dest.join(format!("{}.{}", tab, TAB_EXTENSION));
            tokio::fs::copy(&from, &to).await.map_err(io_at(&from))?;
        }

        tracing::info!(
            "Backed up {} tabs of {} to {}",
            tabs.len(),
            self.spreadsheet_id,
            dest.display()
        );
        Ok(())
    }

    async fn copy_tabs(
        &self,
        source_id: &str,
        dest_id: &str,
        tabs: &BTreeSet<String>,
    ) -> Result<(), WorkbookError> {
        let dest_dir = self.sheet_dir(dest_id);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(io_at(&dest_dir))?;

        for tab in tabs {
            let from = self.tab_path(source_id, tab);
            let present = tokio::fs::try_exists(&from).await.map_err(io_at(&from))?;
            if !present {
                tracing::warn!("Tab {:?} missing from {}, not staged", tab, source_id);
                continue;
            }
            let to = self.tab_path(dest_id, tab);
            tokio::fs::copy(&from, &to).await.map_err(io_at(&from))?;
        }

        tracing::debug!("Copied {} tabs from {} to {}", tabs.len(), source_id, dest_id);
        Ok(())
    }

    fn restart(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workbook(dir: &TempDir, tabs: &[&str]) -> LocalWorkbook {
        LocalWorkbook::new(&WorkbookConfig {
            spreadsheet_id: Some("dict".into()),
            staging_spreadsheet_id: Some("stage".into()),
            data_dir: dir.path().to_path_buf(),
            tabs: tabs.iter().map(|t| t.to_string()).collect(),
        })
        .unwrap()
    }

    fn write_tab(dir: &TempDir, sheet: &str, tab: &str, body: &str) {
        let sheet_dir = dir.path().join(sheet);
        std::fs::create_dir_all(&sheet_dir).unwrap();
        std::fs::write(sheet_dir.join(format!("{}.csv", tab)), body).unwrap();
    }

    #[test]
    fn ids_are_required() {
        let config = WorkbookConfig {
            staging_spreadsheet_id: Some("stage".into()),
            ..WorkbookConfig::default()
        };
        assert!(matches!(
            LocalWorkbook::new(&config),
            Err(WorkbookError::NotConfigured("workbook.spreadsheet_id"))
        ));
    }

    #[tokio::test]
    async fn managed_tabs_fall_back_to_disk() {
        let dir = TempDir::new().unwrap();
        write_tab(&dir, "dict", "Strain", "a,b");
        write_tab(&dir, "dict", "Reagent", "c,d");
        std::fs::write(dir.path().join("dict").join("notes.txt"), "x").unwrap();

        let configured = workbook(&dir, &["Protein"]);
        assert_eq!(
            configured.managed_tab_names().await.unwrap(),
            BTreeSet::from(["Protein".to_string()])
        );

        let discovered = workbook(&dir, &[]);
        assert_eq!(
            discovered.managed_tab_names().await.unwrap(),
            BTreeSet::from(["Reagent".to_string(), "Strain".to_string()])
        );
    }

    #[tokio::test]
    async fn copy_tabs_skips_missing() {
        let dir = TempDir::new().unwrap();
        write_tab(&dir, "dict", "Strain", "name\nE. coli");
        let workbook = workbook(&dir, &["Strain"]);

        let tabs = BTreeSet::from(["Strain".to_string(), "Mapping Failures".to_string()]);
        workbook.copy_tabs("dict", "stage", &tabs).await.unwrap();

        let staged = dir.path().join("stage").join("Strain.csv");
        assert_eq!(std::fs::read_to_string(staged).unwrap(), "name\nE. coli");
        assert!(!dir.path().join("stage").join("Mapping Failures.csv").exists());
    }

    #[tokio::test]
    async fn backup_copies_every_tab() {
        let dir = TempDir::new().unwrap();
        write_tab(&dir, "dict", "Strain", "s");
        write_tab(&dir, "dict", "Mapping Failures", "f");
        let workbook = workbook(&dir, &["Strain"]);

        workbook.backup().await.unwrap();

        let backups: Vec<_> = std::fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].join("Strain.csv").exists());
        assert!(backups[0].join("Mapping Failures.csv").exists());
    }

    #[tokio::test]
    async fn backup_of_missing_sheet_fails() {
        let dir = TempDir::new().unwrap();
        let workbook = workbook(&dir, &["Strain"]);
        assert!(matches!(
            workbook.backup().await,
            Err(WorkbookError::Io { .. })
        ));
    }
}
