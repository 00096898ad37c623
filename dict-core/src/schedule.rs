//! Backup deadline arithmetic.
//!
//! Backups fire once a day at a fixed hour after midnight UTC. The deadline
//! is an absolute UTC timestamp owned by the run loop; this module only
//! computes it. All functions take `now` explicitly so they can be tested
//! against arbitrary instants.
//!
//! After downtime spanning several days only one backup fires: the deadline
//! jumps straight to the next future slot instead of replaying every missed
//! day.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use thiserror::Error;

/// One day.
pub const DAY: TimeDelta = TimeDelta::days(1);

/// Scheduling errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Backup hour outside 0..=23.
    #[error("invalid backup hour {0} (expected 0-23)")]
    InvalidBackupHour(u32),
}

/// Hour of the day (UTC) at which the daily backup runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BackupHour(u8);

impl BackupHour {
    /// Create a backup hour, rejecting values above 23.
    pub fn new(hour: u32) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::InvalidBackupHour(hour));
        }
        Ok(Self(hour as u8))
    }

    /// The hour as a number in 0..=23.
    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    fn offset(self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.0))
    }
}

impl Default for BackupHour {
    fn default() -> Self {
        Self(8)
    }
}

impl TryFrom<u32> for BackupHour {
    type Error = ScheduleError;

    fn try_from(hour: u32) -> Result<Self, Self::Error> {
        Self::new(hour)
    }
}

impl std::fmt::Display for BackupHour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00 UTC", self.0)
    }
}

/// Smallest 00:00 UTC instant strictly after `now`.
pub fn next_midnight_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc() + DAY
}

/// First backup deadline for a freshly started daemon.
///
/// Always the configured hour on the day after `now`'s UTC date, so it is
/// strictly after `now` by construction.
pub fn first_backup_deadline(now: DateTime<Utc>, hour: BackupHour) -> DateTime<Utc> {
    next_midnight_utc(now) + hour.offset()
}

/// Move `deadline` forward by whole days until it is strictly after `now`.
///
/// A deadline already in the future is returned unchanged.
pub fn advance_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if deadline > now {
        return deadline;
    }
    let behind = now - deadline;
    deadline + TimeDelta::days(behind.num_days() + 1)
}

/// The next backup deadline, owned by the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupSchedule {
    next_deadline: DateTime<Utc>,
}

impl BackupSchedule {
    /// Schedule the first backup at `hour` on the day after `now`.
    pub fn new(now: DateTime<Utc>, hour: BackupHour) -> Self {
        Self {
            next_deadline: first_backup_deadline(now, hour),
        }
    }

    /// Schedule starting from an explicit deadline.
    pub fn with_deadline(next_deadline: DateTime<Utc>) -> Self {
        Self { next_deadline }
    }

    /// The pending deadline.
    pub fn next_deadline(&self) -> DateTime<Utc> {
        self.next_deadline
    }

    /// True once `now` has passed the deadline.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now > self.next_deadline
    }

    /// Advance past `now` and return the new deadline.
    pub fn advance(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.next_deadline = advance_deadline(self.next_deadline, now);
        self.next_deadline
    }
}
