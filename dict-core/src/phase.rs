//! Run-loop phase state machine.
//!
//! A pure transition table for the daemon's run loop. The daemon feeds it
//! events as it works and logs the resulting phase; nothing here performs
//! I/O. Invalid transitions leave the phase unchanged.
//!
//! ```text
//! Init ─► CheckPrecondition ─► Cycle ─► Sleep ─► Cycle ...
//!                │                        │
//!                ▼                        ▼
//!              Fatal                 BackupCheck ─► StageCopy ─► Sleep
//!
//! any non-terminal phase ── StopObserved ──► Shutdown
//! ```

/// Phase of the run loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Workers being started.
    #[default]
    Init,
    /// Verifying the target collection exists.
    CheckPrecondition,
    /// Running one reconciliation pass.
    Cycle,
    /// Waiting out the sleep interval.
    Sleep,
    /// Deciding whether a daily backup is due.
    BackupCheck,
    /// Copying tabs into the staging spreadsheet.
    StageCopy,
    /// Stop observed; workers being released.
    Shutdown,
    /// Target collection missing or unverifiable.
    Fatal,
}

/// Inputs to the phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Workers are up.
    Started,
    /// Existence check succeeded.
    CollectionFound,
    /// Existence check reported absent or failed.
    CollectionMissing,
    /// A reconciliation pass finished (successfully or not).
    CycleFinished,
    /// A sleep completed.
    Woke {
        /// Whether the backup/staging branch runs next.
        check_backup: bool,
    },
    /// Backup check (and backup, if due) completed.
    BackupChecked,
    /// Staging copy completed.
    Staged,
    /// Backup or staging step failed; the rest of the branch is skipped.
    SideTaskFailed,
    /// Stop signal observed.
    StopObserved,
}

impl RunPhase {
    /// Apply an event and return the next phase.
    pub fn on_event(self, event: PhaseEvent) -> Self {
        use PhaseEvent as E;
        use RunPhase as P;

        match (self, event) {
            (P::Shutdown | P::Fatal, _) => self,
            (_, E::StopObserved) => P::Shutdown,

            (P::Init, E::Started) => P::CheckPrecondition,
            (P::CheckPrecondition, E::CollectionFound) => P::Cycle,
            (P::CheckPrecondition, E::CollectionMissing) => P::Fatal,
            (P::Cycle, E::CycleFinished) => P::Sleep,
            (P::Sleep, E::Woke { check_backup: true }) => P::BackupCheck,
            (P::Sleep, E::Woke { check_backup: false }) => P::Cycle,
            (P::BackupCheck, E::BackupChecked) => P::StageCopy,
            (P::StageCopy, E::Staged) => P::Sleep,
            (P::BackupCheck | P::StageCopy, E::SideTaskFailed) => P::Sleep,

            (state, _) => state,
        }
    }

    /// True for `Shutdown` and `Fatal`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Shutdown | Self::Fatal)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::CheckPrecondition => "check-precondition",
            Self::Cycle => "cycle",
            Self::Sleep => "sleep",
            Self::BackupCheck => "backup-check",
            Self::StageCopy => "stage-copy",
            Self::Shutdown => "shutdown",
            Self::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[PhaseEvent]) -> RunPhase {
        events
            .iter()
            .fold(RunPhase::default(), |phase, event| phase.on_event(*event))
    }

    #[test]
    fn happy_path_with_backup_branch() {
        let phase = run(&[
            PhaseEvent::Started,
            PhaseEvent::CollectionFound,
            PhaseEvent::CycleFinished,
            PhaseEvent::Woke { check_backup: true },
            PhaseEvent::BackupChecked,
            PhaseEvent::Staged,
            PhaseEvent::Woke {
                check_backup: false,
            },
        ]);
        assert_eq!(phase, RunPhase::Cycle);
    }

    #[test]
    fn side_task_failure_goes_to_sleep() {
        let phase = run(&[
            PhaseEvent::Started,
            PhaseEvent::CollectionFound,
            PhaseEvent::CycleFinished,
            PhaseEvent::Woke { check_backup: true },
            PhaseEvent::SideTaskFailed,
        ]);
        assert_eq!(phase, RunPhase::Sleep);
    }

    #[test]
    fn fatal_only_from_precondition() {
        assert_eq!(
            run(&[PhaseEvent::Started, PhaseEvent::CollectionMissing]),
            RunPhase::Fatal
        );
        assert_eq!(
            RunPhase::Cycle.on_event(PhaseEvent::CollectionMissing),
            RunPhase::Cycle
        );
    }

    #[test]
    fn stop_reaches_shutdown_from_any_live_phase() {
        for phase in [
            RunPhase::Init,
            RunPhase::CheckPrecondition,
            RunPhase::Cycle,
            RunPhase::Sleep,
            RunPhase::BackupCheck,
            RunPhase::StageCopy,
        ] {
            assert_eq!(phase.on_event(PhaseEvent::StopObserved), RunPhase::Shutdown);
        }
    }

    #[test]
    fn terminal_phases_are_sticky() {
        assert_eq!(
            RunPhase::Fatal.on_event(PhaseEvent::StopObserved),
            RunPhase::Fatal
        );
        assert_eq!(
            RunPhase::Shutdown.on_event(PhaseEvent::Started),
            RunPhase::Shutdown
        );
        assert!(RunPhase::Fatal.is_terminal());
        assert!(!RunPhase::Sleep.is_terminal());
    }

    #[test]
    fn invalid_transition_is_ignored() {
        assert_eq!(RunPhase::Init.on_event(PhaseEvent::Staged), RunPhase::Init);
    }
}
