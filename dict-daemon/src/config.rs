//! Configuration loading for the maintainer daemon.
//!
//! Configuration is loaded from a TOML file (default: `maintainer.toml`) and
//! then overridden by command-line flags. Every section and field is
//! optional; missing values take the defaults below.

use sd2_dict_core::{BackupHour, ScheduleError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the maintainer daemon.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run-loop configuration.
    pub daemon: DaemonConfig,
    /// SynBioHub registry configuration.
    pub registry: RegistryConfig,
    /// Dictionary spreadsheet configuration.
    pub workbook: WorkbookConfig,
    /// External reconciliation program.
    pub reconciler: ReconcilerConfig,
}

/// Run-loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Seconds to sleep between updates (default: 60).
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: u64,
    /// Run a single update then exit (default: false).
    #[serde(default)]
    pub test_mode: bool,
    /// Hour of the day, UTC, for the daily backup (default: 8).
    #[serde(default = "default_backup_hour")]
    pub backup_hour_utc: u32,
    /// Run backups from the main loop rather than a separate worker (default: true).
    #[serde(default = "default_backup_in_main_loop")]
    pub backup_in_main_loop: bool,
    /// Days between backups when run by the standalone worker (default: 1).
    #[serde(default = "default_backup_interval_days")]
    pub backup_interval_days: u64,
    /// Seconds between heartbeat lines (default: 60).
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Seconds to wait for each worker to stop on shutdown (default: 5).
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

/// SynBioHub registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// SynBioHub server URL.
    #[serde(default = "default_server")]
    pub server: String,
    /// URL of the collection to keep synchronized.
    #[serde(default)]
    pub collection: Option<String>,
    /// Maintainer account login email.
    #[serde(default)]
    pub login: Option<String>,
    /// Maintainer account password.
    #[serde(default)]
    pub password: Option<String>,
    /// URL prefix of the server the target server is spoofing as.
    #[serde(default)]
    pub spoofing: Option<String>,
    /// Connection timeout in seconds, 0 disables (default: 0).
    #[serde(default)]
    pub timeout_secs: u64,
}

/// Dictionary spreadsheet configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkbookConfig {
    /// Identifier of the dictionary spreadsheet.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Identifier of the staging spreadsheet.
    #[serde(default)]
    pub staging_spreadsheet_id: Option<String>,
    /// Directory holding spreadsheet tab exports (default: `sheets`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Managed dictionary tabs.
    #[serde(default = "default_tabs")]
    pub tabs: BTreeSet<String>,
}

/// External reconciliation program.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcilerConfig {
    /// Program run once per reconciliation cycle.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed before `--test-mode`.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_sleep_secs() -> u64 {
    60
}

fn default_backup_hour() -> u32 {
    8
}

fn default_backup_in_main_loop() -> bool {
    true
}

fn default_backup_interval_days() -> u64 {
    1
}

fn default_heartbeat_secs() -> u64 {
    60
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_server() -> String {
    "https://hub.sd2e.org".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("sheets")
}

fn default_tabs() -> BTreeSet<String> {
    [
        "Attribute",
        "Reagent",
        "Genetic Construct",
        "Strain",
        "Protein",
        "Collections",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sleep_secs: default_sleep_secs(),
            test_mode: false,
            backup_hour_utc: default_backup_hour(),
            backup_in_main_loop: default_backup_in_main_loop(),
            backup_interval_days: default_backup_interval_days(),
            heartbeat_secs: default_heartbeat_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            collection: None,
            login: None,
            password: None,
            spoofing: None,
            timeout_secs: 0,
        }
    }
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            staging_spreadsheet_id: None,
            data_dir: default_data_dir(),
            tabs: default_tabs(),
        }
    }
}

/// Immutable run-loop settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Pause between reconciliation attempts.
    pub sleep_interval: Duration,
    /// Run exactly one cycle, then stop.
    pub test_mode: bool,
    /// Hour of the daily backup.
    pub backup_hour: BackupHour,
    /// Fold backups into the main loop's tick.
    pub backup_in_main_loop: bool,
    /// Interval of the standalone backup worker.
    pub backup_worker_interval: Duration,
    /// Interval of the heartbeat worker.
    pub heartbeat_interval: Duration,
    /// Bound on waiting for each worker at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sleep_interval: Duration::from_secs(default_sleep_secs()),
            test_mode: false,
            backup_hour: BackupHour::default(),
            backup_in_main_loop: true,
            backup_worker_interval: Duration::from_secs(24 * 60 * 60),
            heartbeat_interval: Duration::from_secs(default_heartbeat_secs()),
            shutdown_grace: Duration::from_secs(default_shutdown_grace_secs()),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Validate the daemon section and build the run-loop settings.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let daemon = &self.daemon;
        if daemon.sleep_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "daemon.sleep_secs",
                reason: "must be at least 1 second".into(),
            });
        }
        if daemon.heartbeat_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "daemon.heartbeat_secs",
                reason: "must be at least 1 second".into(),
            });
        }
        if daemon.backup_interval_days == 0 {
            return Err(ConfigError::Invalid {
                field: "daemon.backup_interval_days",
                reason: "must be at least 1 day".into(),
            });
        }
        let backup_hour = BackupHour::new(daemon.backup_hour_utc)?;

        Ok(RunConfig {
            sleep_interval: Duration::from_secs(daemon.sleep_secs),
            test_mode: daemon.test_mode,
            backup_hour,
            backup_in_main_loop: daemon.backup_in_main_loop,
            backup_worker_interval: Duration::from_secs(daemon.backup_interval_days * 24 * 60 * 60),
            heartbeat_interval: Duration::from_secs(daemon.heartbeat_secs),
            shutdown_grace: Duration::from_secs(daemon.shutdown_grace_secs),
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// Backup hour outside 0-23.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
