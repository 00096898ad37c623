//! # dict-core
//!
//! Pure logic for the SD2 dictionary maintainer (no I/O, instant tests).
//!
//! This crate holds the parts of the maintainer daemon that can be reasoned
//! about without a runtime, a network, or a spreadsheet:
//! - Backup deadline arithmetic anchored to midnight UTC
//! - The fixed tab set copied into the staging spreadsheet
//! - The run-loop phase state machine
//!
//! The daemon crate (`sd2-dict-daemon`) drives these with real time and
//! real collaborators.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod phase;
pub mod schedule;
pub mod staging;

pub use phase::{PhaseEvent, RunPhase};
pub use schedule::{
    advance_deadline, first_backup_deadline, next_midnight_utc, BackupHour, BackupSchedule,
    ScheduleError, DAY,
};
pub use staging::{staging_tabs, MAPPING_FAILURES_TAB};
