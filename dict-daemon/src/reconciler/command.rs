//! Reconciliation by an external program.
//!
//! Each pass spawns the configured command and waits for it to exit. A
//! zero exit status is success; the measured wall time is the pass
//! duration.

use super::{ReconcileError, Reconciler};
use crate::config::ReconcilerConfig;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

/// Flag appended in test mode.
const TEST_MODE_FLAG: &str = "--test-mode";

/// Reconciler that shells out to an external program.
#[derive(Debug, Clone)]
pub struct CommandReconciler {
    program: String,
    args: Vec<String>,
}

impl CommandReconciler {
    /// Build from configuration.
    pub fn new(config: &ReconcilerConfig) -> Result<Self, ReconcileError> {
        let program = config
            .command
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or(ReconcileError::NotConfigured("reconciler.command"))?;

        Ok(Self {
            program,
            args: config.args.clone(),
        })
    }

    fn command(&self, test_mode: bool) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        if test_mode {
            command.arg(TEST_MODE_FLAG);
        }
        command
    }
}

#[async_trait]
impl Reconciler for CommandReconciler {
    async fn maintain(&self, test_mode: bool) -> Result<Duration, ReconcileError> {
        let start = Instant::now();
        let status = self
            .command(test_mode)
            .status()
            .await
            .map_err(|source| ReconcileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ReconcileError::Failed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler(command: &str, args: &[&str]) -> CommandReconciler {
        CommandReconciler::new(&ReconcilerConfig {
            command: Some(command.into()),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn command_is_required() {
        assert!(matches!(
            CommandReconciler::new(&ReconcilerConfig::default()),
            Err(ReconcileError::NotConfigured("reconciler.command"))
        ));
    }

    #[test]
    fn test_mode_flag_is_appended() {
        let reconciler = reconciler("maintain", &["--sheet", "abc"]);
        let command = reconciler.command(true);
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["--sheet", "abc", "--test-mode"]);

        let command = reconciler.command(false);
        assert_eq!(command.as_std().get_args().count(), 2);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let reconciler = reconciler("/nonexistent/maintain-dictionary", &[]);
        assert!(matches!(
            reconciler.maintain(false).await,
            Err(ReconcileError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_decides_outcome() {
        assert!(reconciler("true", &[]).maintain(false).await.is_ok());
        assert!(matches!(
            reconciler("false", &[]).maintain(false).await,
            Err(ReconcileError::Failed(_))
        ));
    }
}
