//! # dict-daemon
//!
//! Long-running maintainer that keeps the SD2 dictionary spreadsheet in sync
//! with its SynBioHub collection.
//!
//! The daemon owns orchestration only: the run loop, the daily backup
//! schedule, the staging copy, the heartbeat, and coordinated shutdown. The
//! reconciliation itself and the remote services sit behind three traits:
//!
//! - [`Registry`]: does the target collection exist?
//! - [`Workbook`]: back up the spreadsheet, list tabs, copy tabs
//! - [`Reconciler`]: run one reconciliation pass
//!
//! ## Example
//!
//! ```no_run
//! use sd2_dict_daemon::{
//!     Daemon, MockReconciler, MockRegistry, MockWorkbook, RunConfig, ShutdownSignal, SyncEngine,
//! };
//!
//! # async fn example() -> Result<(), sd2_dict_daemon::DaemonError> {
//! let shutdown = ShutdownSignal::new();
//! shutdown.trigger_on_ctrl_c();
//!
//! let engine = SyncEngine::new(MockWorkbook::new(["Strain"]), MockReconciler::new());
//! let mut daemon = Daemon::new(RunConfig::default(), MockRegistry::new(true), engine, shutdown);
//! daemon.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod reconciler;
pub mod registry;
pub mod shutdown;
pub mod supervisor;
pub mod workbook;

pub use backup::BackupWorker;
pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{Config, ConfigError, RunConfig};
pub use daemon::Daemon;
pub use engine::SyncEngine;
pub use error::{DaemonError, Result};
pub use heartbeat::Heartbeat;
pub use reconciler::{CommandReconciler, MockReconciler, ReconcileError, Reconciler};
pub use registry::{HttpRegistry, MockRegistry, Registry, RegistryError};
pub use shutdown::ShutdownSignal;
pub use supervisor::{ShutdownReport, Supervisor, Worker, WorkerHandle};
pub use workbook::{LocalWorkbook, MockWorkbook, Workbook, WorkbookError};
