//! `dict-maintainer` binary entry point.
//!
//! Usage:
//! ```bash
//! dict-maintainer --config maintainer.toml
//! dict-maintainer -c https://hub.sd2e.org/user/sd2e/dictionary/dictionary_collection/1 \
//!     -g <spreadsheet-id> --staging-id <staging-id> --reconcile-cmd maintain-dictionary
//! dict-maintainer --mock --test-mode
//! ```
//!
//! Exit status is 0 on normal shutdown (including test mode) and 1 on a
//! configuration error or a missing target collection.

use anyhow::{Context, Result};
use clap::Parser;
use sd2_dict_daemon::{
    CommandReconciler, Config, Daemon, DaemonError, HttpRegistry, LocalWorkbook, MockReconciler,
    MockRegistry, MockWorkbook, Reconciler, Registry, RunConfig, ShutdownSignal, SyncEngine,
    Workbook,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "maintainer.toml";

/// Keeps the SD2 dictionary spreadsheet in sync with SynBioHub.
#[derive(Parser, Debug)]
#[command(name = "dict-maintainer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "DICT_MAINTAINER_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds to sleep between updates
    #[arg(short = 's', long = "sleep")]
    sleep: Option<u64>,

    /// Run one trial update, then exit
    #[arg(short = 't', long)]
    test_mode: bool,

    /// SynBioHub login
    #[arg(short = 'l', long, env = "SBH_LOGIN")]
    login: Option<String>,

    /// SynBioHub password
    #[arg(short = 'p', long, env = "SBH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// URI of the target collection
    #[arg(short = 'c', long)]
    collection: Option<String>,

    /// Dictionary spreadsheet id
    #[arg(short = 'g', long = "gsheet-id")]
    gsheet_id: Option<String>,

    /// Staging spreadsheet id
    #[arg(long)]
    staging_id: Option<String>,

    /// SynBioHub server URL
    #[arg(short = 'S', long)]
    server: Option<String>,

    /// URL prefix to rewrite onto the server (spoofing)
    #[arg(short = 'f', long)]
    spoofing: Option<String>,

    /// Registry request timeout in seconds (0 disables)
    #[arg(short = 'T', long)]
    timeout: Option<u64>,

    /// Hour (UTC) of the daily backup
    #[arg(long)]
    backup_hour: Option<u32>,

    /// Directory holding the local spreadsheets
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// External reconciliation program
    #[arg(long)]
    reconcile_cmd: Option<String>,

    /// Use mock collaborators instead of SynBioHub and real spreadsheets
    #[arg(long)]
    mock: bool,
}

impl Cli {
    /// Overlay command-line values onto the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(sleep) = self.sleep {
            config.daemon.sleep_secs = sleep;
        }
        if self.test_mode {
            config.daemon.test_mode = true;
        }
        if let Some(hour) = self.backup_hour {
            config.daemon.backup_hour_utc = hour;
        }

        let registry = &mut config.registry;
        if let Some(server) = &self.server {
            registry.server = server.clone();
        }
        overlay(&mut registry.collection, &self.collection);
        overlay(&mut registry.login, &self.login);
        overlay(&mut registry.password, &self.password);
        overlay(&mut registry.spoofing, &self.spoofing);
        if let Some(timeout) = self.timeout {
            registry.timeout_secs = timeout;
        }

        let workbook = &mut config.workbook;
        overlay(&mut workbook.spreadsheet_id, &self.gsheet_id);
        overlay(&mut workbook.staging_spreadsheet_id, &self.staging_id);
        if let Some(dir) = &self.data_dir {
            workbook.data_dir = dir.clone();
        }

        overlay(&mut config.reconciler.command, &self.reconcile_cmd);
    }
}

fn overlay(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    let run_config = config.run_config().context("Invalid configuration")?;

    let shutdown = ShutdownSignal::new();
    shutdown.trigger_on_ctrl_c();

    if cli.mock {
        tracing::info!("Using mock registry, workbook and reconciler");
        let workbook = MockWorkbook::new(config.workbook.tabs.clone());
        drive(
            run_config,
            MockRegistry::new(true),
            workbook,
            MockReconciler::new(),
            shutdown,
        )
        .await?;
    } else {
        let registry = HttpRegistry::new(&config.registry).context("Failed to set up registry")?;
        let workbook = LocalWorkbook::new(&config.workbook).context("Failed to set up workbook")?;
        let reconciler =
            CommandReconciler::new(&config.reconciler).context("Failed to set up reconciler")?;
        drive(run_config, registry, workbook, reconciler, shutdown).await?;
    }
    Ok(())
}

async fn drive<R, W, C>(
    run_config: RunConfig,
    registry: R,
    workbook: W,
    reconciler: C,
    shutdown: ShutdownSignal,
) -> std::result::Result<(), DaemonError>
where
    R: Registry,
    W: Workbook,
    C: Reconciler,
{
    let engine = SyncEngine::new(workbook, reconciler);
    let mut daemon = Daemon::new(run_config, registry, engine, shutdown);
    daemon.run().await
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Ok(Config::from_file(path)?);
    }

    let default = Path::new(DEFAULT_CONFIG_FILE);
    if default.exists() {
        tracing::info!("Loading configuration from {}", default.display());
        Ok(Config::from_file(default)?)
    } else {
        Ok(Config::default())
    }
}
