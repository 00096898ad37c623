//! The maintainer run loop.
//!
//! One `run()` call is one daemon lifetime:
//!
//! 1. Spawn the heartbeat (and the standalone backup worker when backups are
//!    not driven from this loop).
//! 2. Re-arm the collaborators and verify the target collection exists. A
//!    missing or unverifiable collection ends the run with a fatal error
//!    before any reconciliation happens.
//! 3. Reconcile, sleep, optionally back up and refresh staging, sleep again.
//!    Failures inside a tick are logged and the loop carries on.
//! 4. On the way out, stop the workers (bounded by the shutdown grace).
//!
//! Every sleep races the shutdown signal, so a stop request is observed
//! within one step rather than one full interval.

use crate::backup::BackupWorker;
use crate::clock::{Clock, SystemClock};
use crate::config::RunConfig;
use crate::engine::SyncEngine;
use crate::error::{DaemonError, Result};
use crate::heartbeat::Heartbeat;
use crate::reconciler::Reconciler;
use crate::registry::Registry;
use crate::shutdown::ShutdownSignal;
use crate::supervisor::Supervisor;
use crate::workbook::Workbook;
use sd2_dict_core::{BackupSchedule, PhaseEvent, RunPhase};
use std::sync::Arc;

/// Maintainer daemon over a registry, workbook, reconciler and clock.
pub struct Daemon<R, W, C, K = SystemClock> {
    config: RunConfig,
    registry: R,
    engine: Arc<SyncEngine<W, C>>,
    clock: K,
    shutdown: ShutdownSignal,
    schedule: BackupSchedule,
    phase: RunPhase,
}

impl<R: Registry, W: Workbook, C: Reconciler> Daemon<R, W, C, SystemClock> {
    /// Create a daemon on the system clock.
    pub fn new(
        config: RunConfig,
        registry: R,
        engine: SyncEngine<W, C>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self::with_clock(config, registry, engine, shutdown, SystemClock)
    }
}

impl<R, W, C, K> Daemon<R, W, C, K>
where
    R: Registry,
    W: Workbook,
    C: Reconciler,
    K: Clock,
{
    /// Create a daemon on an explicit clock.
    ///
    /// The first backup deadline is the configured hour on the day after
    /// `clock.now()`.
    pub fn with_clock(
        config: RunConfig,
        registry: R,
        engine: SyncEngine<W, C>,
        shutdown: ShutdownSignal,
        clock: K,
    ) -> Self {
        let schedule = BackupSchedule::new(clock.now(), config.backup_hour);
        Self {
            config,
            registry,
            engine: Arc::new(engine),
            clock,
            shutdown,
            schedule,
            phase: RunPhase::default(),
        }
    }

    /// Replace the backup schedule.
    pub fn with_schedule(mut self, schedule: BackupSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Current run-loop phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Current backup schedule.
    pub fn schedule(&self) -> &BackupSchedule {
        &self.schedule
    }

    /// The sync engine shared with background workers.
    pub fn engine(&self) -> &Arc<SyncEngine<W, C>> {
        &self.engine
    }

    /// The signal that stops this daemon.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Run until shutdown is requested or a fatal error occurs.
    ///
    /// Background workers are stopped on both paths before returning.
    ///
    /// # Errors
    ///
    /// Returns `CollectionMissing` or `ExistenceCheck` when the target
    /// collection cannot be confirmed. Per-tick failures are logged, never
    /// returned.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Dictionary Maintainer {} starting (sleep: {:?}, test mode: {}, backup at {})",
            env!("CARGO_PKG_VERSION"),
            self.config.sleep_interval,
            self.config.test_mode,
            self.config.backup_hour
        );

        let mut supervisor = Supervisor::new();
        supervisor.spawn(Heartbeat::new(), self.config.heartbeat_interval);
        if !self.config.backup_in_main_loop && !self.config.test_mode {
            supervisor.spawn(
                BackupWorker::new(Arc::clone(&self.engine)),
                self.config.backup_worker_interval,
            );
        }
        self.transition(PhaseEvent::Started);

        let result = self.run_loop().await;
        if let Err(e) = &result {
            tracing::error!("Dictionary Maintainer stopped: {}", e);
        }

        let report = supervisor.shutdown(self.config.shutdown_grace).await;
        if !report.is_clean() {
            tracing::warn!(
                "Workers not stopped cleanly (panicked: {:?}, aborted: {:?})",
                report.panicked,
                report.aborted
            );
        }

        tracing::info!("Dictionary Maintainer run complete, shutting down.");
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        while !self.shutdown.is_triggered() {
            self.registry.restart();
            self.engine.restart();
            self.check_collection().await?;

            while !self.shutdown.is_triggered() {
                self.cycle().await;

                if self.config.test_mode {
                    tracing::info!("Test mode: stopping after one cycle");
                    self.shutdown.trigger();
                    break;
                }

                if !self.pause().await {
                    break;
                }

                if self.config.backup_in_main_loop {
                    self.transition(PhaseEvent::Woke { check_backup: true });
                    if let Err(e) = self.backup_and_stage().await {
                        tracing::error!("Dictionary backup/staging failed: {}", e);
                        self.transition(PhaseEvent::SideTaskFailed);
                    }

                    if !self.pause().await {
                        break;
                    }
                }
                self.transition(PhaseEvent::Woke {
                    check_backup: false,
                });
            }
        }

        self.transition(PhaseEvent::StopObserved);
        Ok(())
    }

    async fn check_collection(&mut self) -> Result<()> {
        match self.registry.collection_exists().await {
            Ok(true) => {
                self.transition(PhaseEvent::CollectionFound);
                Ok(())
            }
            Ok(false) => {
                let collection = self.registry.collection_id().await.unwrap_or_else(|e| {
                    tracing::warn!("Could not resolve collection id: {}", e);
                    None
                });
                self.transition(PhaseEvent::CollectionMissing);
                Err(DaemonError::CollectionMissing { collection })
            }
            Err(e) => {
                self.transition(PhaseEvent::CollectionMissing);
                Err(DaemonError::ExistenceCheck(e))
            }
        }
    }

    async fn cycle(&mut self) {
        match self.engine.maintain_once(self.config.test_mode).await {
            Ok(elapsed) => tracing::info!(
                "Dictionary update executed in {:.5} seconds",
                elapsed.as_secs_f64()
            ),
            Err(e) => tracing::error!("Dictionary update failed: {}", e),
        }
        self.transition(PhaseEvent::CycleFinished);
    }

    /// Back up if the deadline has passed, then refresh staging.
    ///
    /// A failed backup leaves the deadline where it was and skips the
    /// staging copy for this tick.
    async fn backup_and_stage(&mut self) -> Result<()> {
        let now = self.clock.now();
        if self.schedule.is_due(now) {
            tracing::info!("Executing Dictionary backup");
            self.engine.backup_now().await?;
            let next = self.schedule.advance(now);
            tracing::debug!("Next backup due at {}", next);
        }
        self.transition(PhaseEvent::BackupChecked);

        self.engine.stage_managed_tabs().await?;
        self.transition(PhaseEvent::Staged);
        Ok(())
    }

    /// Sleep one interval or until shutdown. Returns false once stopping.
    async fn pause(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.config.sleep_interval) => {}
            _ = self.shutdown.triggered() => {}
        }
        !self.shutdown.is_triggered()
    }

    fn transition(&mut self, event: PhaseEvent) {
        let next = self.phase.on_event(event);
        if next != self.phase {
            tracing::debug!("Phase {} -> {}", self.phase, next);
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::reconciler::MockReconciler;
    use crate::registry::{MockRegistry, RegistryError};
    use crate::workbook::MockWorkbook;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use sd2_dict_core::MAPPING_FAILURES_TAB;
    use std::time::Duration;

    struct Harness {
        registry: MockRegistry,
        workbook: MockWorkbook,
        reconciler: MockReconciler,
        shutdown: ShutdownSignal,
        start: DateTime<Utc>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: MockRegistry::new(true),
                workbook: MockWorkbook::new(["Strain", "Reagent"]),
                reconciler: MockReconciler::new(),
                shutdown: ShutdownSignal::new(),
                start: Utc.with_ymd_and_hms(2024, 5, 1, 7, 59, 58).unwrap(),
            }
        }

        fn daemon(
            &self,
            config: RunConfig,
        ) -> Daemon<MockRegistry, MockWorkbook, MockReconciler, TokioClock> {
            Daemon::with_clock(
                config,
                self.registry.clone(),
                SyncEngine::new(self.workbook.clone(), self.reconciler.clone()),
                self.shutdown.clone(),
                TokioClock::starting_at(self.start),
            )
        }

        fn stop_after(&self, after: Duration) {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                shutdown.trigger();
            });
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            sleep_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(60),
            ..RunConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_runs_exactly_one_cycle() {
        let h = Harness::new();
        let mut daemon = h.daemon(RunConfig {
            test_mode: true,
            ..config()
        });

        daemon.run().await.unwrap();

        assert_eq!(h.reconciler.test_mode_flags(), vec![true]);
        assert!(h.shutdown.is_triggered());
        assert_eq!(h.workbook.backups(), 0);
        assert!(h.workbook.copies().is_empty());
        assert_eq!(daemon.phase(), RunPhase::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_collection_is_fatal_before_any_cycle() {
        let h = Harness::new();
        h.registry.set_exists(false);
        h.registry.set_collection_id("https://hub.example/dictionary/1");
        let mut daemon = h.daemon(config());

        let err = daemon.run().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(
            err,
            DaemonError::CollectionMissing { collection: Some(ref id) }
                if id == "https://hub.example/dictionary/1"
        ));
        assert_eq!(h.reconciler.calls(), 0);
        assert_eq!(daemon.phase(), RunPhase::Fatal);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_existence_check_is_fatal() {
        let h = Harness::new();
        h.registry.fail_next_exists("connection refused");
        let mut daemon = h.daemon(config());

        let err = daemon.run().await.unwrap_err();

        assert!(matches!(
            err,
            DaemonError::ExistenceCheck(RegistryError::Unavailable(_))
        ));
        assert_eq!(h.reconciler.calls(), 0);
        assert_eq!(daemon.phase(), RunPhase::Fatal);
    }

    #[tokio::test(start_paused = true)]
    async fn collaborators_are_rearmed_before_checking() {
        let h = Harness::new();
        let mut daemon = h.daemon(RunConfig {
            test_mode: true,
            ..config()
        });

        daemon.run().await.unwrap();

        assert_eq!(h.registry.restarts(), 1);
        assert_eq!(h.workbook.restarts(), 1);
        assert_eq!(h.reconciler.restarts(), 1);
        assert_eq!(h.registry.exists_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_does_not_stop_the_loop() {
        let h = Harness::new();
        h.reconciler.fail_next("sheet locked");
        let mut daemon = h.daemon(config());

        // Cycles at t=0 (fails) and t=2 (succeeds).
        h.stop_after(Duration::from_millis(2500));
        daemon.run().await.unwrap();

        assert_eq!(h.reconciler.test_mode_flags(), vec![false, false]);
        assert_eq!(daemon.phase(), RunPhase::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn staging_copy_runs_every_tick() {
        let h = Harness::new();
        let mut daemon = h.daemon(config());

        // Double-sleep cadence: cycles at 0,2,4,6,8 and staging at 1,3,5,7,9.
        h.stop_after(Duration::from_millis(9500));
        daemon.run().await.unwrap();

        assert_eq!(h.reconciler.calls(), 5);
        let copies = h.workbook.copies();
        assert_eq!(copies.len(), 5);
        for copy in copies {
            assert_eq!(copy.source_id, "dictionary");
            assert_eq!(copy.dest_id, "staging");
            assert!(copy.tabs.contains(MAPPING_FAILURES_TAB));
            assert!(copy.tabs.contains("Strain"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backup_runs_once_when_deadline_passes() {
        let h = Harness::new();
        let deadline = h.start + TimeDelta::milliseconds(500);
        let mut daemon = h
            .daemon(config())
            .with_schedule(BackupSchedule::with_deadline(deadline));

        h.stop_after(Duration::from_millis(9500));
        daemon.run().await.unwrap();

        assert_eq!(h.workbook.backups(), 1);
        assert_eq!(
            daemon.schedule().next_deadline(),
            deadline + TimeDelta::days(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_backup_waits_for_next_day() {
        let h = Harness::new();
        let mut daemon = h.daemon(config());

        assert_eq!(
            daemon.schedule().next_deadline(),
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
        );

        // Crossing 08:00 on the first day does not trigger a backup.
        h.stop_after(Duration::from_secs(10));
        daemon.run().await.unwrap();
        assert_eq!(h.workbook.backups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_backup_keeps_deadline_and_skips_staging() {
        let h = Harness::new();
        let deadline = h.start + TimeDelta::milliseconds(500);
        h.workbook.fail_next_backup("drive offline");
        let mut daemon = h
            .daemon(config())
            .with_schedule(BackupSchedule::with_deadline(deadline));

        // Staging ticks at 1 (backup fails) and 3 (backup retried).
        h.stop_after(Duration::from_millis(3500));
        daemon.run().await.unwrap();

        assert_eq!(h.workbook.backups(), 1);
        assert_eq!(h.workbook.copies().len(), 1);
        assert_eq!(
            daemon.schedule().next_deadline(),
            deadline + TimeDelta::days(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_staging_copy_is_logged_and_retried() {
        let h = Harness::new();
        h.workbook.fail_next_copy("staging sheet locked");
        let mut daemon = h.daemon(config());

        // Cycles at 0,2,4; staging at 1 (fails) and 3 (succeeds).
        h.stop_after(Duration::from_millis(4500));
        daemon.run().await.unwrap();

        assert_eq!(h.reconciler.calls(), 3);
        assert_eq!(h.workbook.copies().len(), 1);
        assert_eq!(daemon.phase(), RunPhase::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn backup_at_the_hour_rolls_to_same_hour_next_day() {
        let h = Harness::new();
        let slot = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut daemon = h
            .daemon(config())
            .with_schedule(BackupSchedule::with_deadline(slot));

        // Staging ticks at 07:59:59 (not yet due) and 08:00:01 (due).
        h.stop_after(Duration::from_millis(3500));
        daemon.run().await.unwrap();

        assert_eq!(h.workbook.backups(), 1);
        assert_eq!(
            daemon.schedule().next_deadline(),
            Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn standalone_backup_worker_replaces_main_loop_backups() {
        let h = Harness::new();
        let mut daemon = h.daemon(RunConfig {
            backup_in_main_loop: false,
            ..config()
        });

        // Single-sleep cadence: cycles at 0,1,2,3.
        h.stop_after(Duration::from_millis(3500));
        daemon.run().await.unwrap();

        assert_eq!(h.reconciler.calls(), 4);
        // Only the worker's first round ran; the main loop never stages.
        assert_eq!(h.workbook.backups(), 1);
        assert_eq!(h.workbook.copies().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_long_sleep() {
        let h = Harness::new();
        let mut daemon = h.daemon(RunConfig {
            sleep_interval: Duration::from_secs(24 * 3600),
            ..config()
        });

        h.stop_after(Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        daemon.run().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(6));
        assert_eq!(h.reconciler.calls(), 1);
        // Stopped during the first sleep: no backup/staging step ran.
        assert!(h.workbook.copies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn already_stopped_runs_nothing() {
        let h = Harness::new();
        h.shutdown.trigger();
        let mut daemon = h.daemon(config());

        daemon.run().await.unwrap();

        assert_eq!(h.registry.exists_calls(), 0);
        assert_eq!(h.reconciler.calls(), 0);
        assert_eq!(daemon.phase(), RunPhase::Shutdown);
    }
}
