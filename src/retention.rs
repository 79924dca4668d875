//! Decaying-resolution retention
//!
//! Snapshots are thinned the way a time machine does it:
//!
//! - anything newer than the hourly cutoff is kept;
//! - between the daily and hourly cutoffs, one snapshot per calendar day;
//! - older than the daily cutoff, one snapshot per ISO week.
//!
//! [`classify`] is a pure function over timestamps so the calendar logic can
//! be tested without touching the filesystem. [`trim_snapshots`] wires it to
//! a [`Target`] and the prune executor.
//!
//! ## Algorithm
//!
//! A single backward pass keeps a cursor on the most recent survivor. Each
//! older snapshot is compared with the cursor at the resolution of the window
//! it falls in: a duplicate at that resolution is removed, anything else
//! survives and becomes the new cursor. Because the comparison is always
//! against a survivor, the newest snapshot of each day or week is the one
//! kept, and the newest snapshot overall can never be removed.
//!
//! A snapshot exactly on a cutoff belongs to the coarser window.

use crate::error::Result;
use crate::prune;
use crate::target::Target;
use crate::types::{EventSink, RetentionPolicy, SnapshotEntry};
use chrono::{DateTime, Datelike, Local, TimeZone};
use tracing::{debug, info};

/// Decide which snapshots to remove
///
/// `times` must be sorted ascending and `daily_cutoff` must not be after
/// `hourly_cutoff`. Returns one flag per timestamp, `true` meaning remove.
/// The last flag is always `false`.
///
/// Calendar days and ISO weeks are computed in the time zone of the
/// supplied instants.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use szbck::retention::classify;
///
/// let times = [
///     Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap(),
/// ];
/// let hourly_cutoff = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
/// let daily_cutoff = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
///
/// assert_eq!(classify(&times, &hourly_cutoff, &daily_cutoff), [true, false, false]);
/// ```
pub fn classify<Tz: TimeZone>(
    times: &[DateTime<Tz>],
    hourly_cutoff: &DateTime<Tz>,
    daily_cutoff: &DateTime<Tz>,
) -> Vec<bool> {
    let mut remove = vec![false; times.len()];
    let Some(newest) = times.len().checked_sub(1) else {
        return remove;
    };

    let mut cursor = newest;
    for i in (0..newest).rev() {
        let candidate = &times[i];

        let duplicate = if candidate > hourly_cutoff {
            false
        } else if candidate > daily_cutoff {
            same_calendar_day(&times[cursor], candidate)
        } else {
            same_iso_week(&times[cursor], candidate)
        };

        if duplicate {
            remove[i] = true;
        } else {
            cursor = i;
        }
    }

    remove
}

/// Same year and same day of the year
pub fn same_calendar_day<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.year() == b.year() && a.ordinal() == b.ordinal()
}

/// Same ISO week-numbering year and week
pub fn same_iso_week<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.iso_week() == b.iso_week()
}

/// Apply the retention policy to every snapshot in `target`
///
/// All snapshot names are parsed before anything is classified, so one
/// unparsable name aborts the run with nothing deleted. Returns the number
/// of snapshots deleted (always zero for a dry run).
///
/// # Errors
///
/// - [`SzbckError::NoBackups`](crate::SzbckError::NoBackups) or
///   [`SzbckError::OnlyLatest`](crate::SzbckError::OnlyLatest) when there is
///   nothing to trim
/// - [`SzbckError::InvalidSnapshotName`](crate::SzbckError::InvalidSnapshotName)
///   if any snapshot name does not parse
/// - [`SzbckError::PurgeFailed`](crate::SzbckError::PurgeFailed) if a
///   deletion fails part way through
pub fn trim_snapshots(
    target: &Target,
    policy: &RetentionPolicy,
    now: &DateTime<Local>,
    dry_run: bool,
    sink: &mut dyn EventSink,
) -> Result<usize> {
    let dirs = prune::existing_snapshots(target)?;
    let entries = SnapshotEntry::from_paths(&dirs)?;

    let (hourly_cutoff, daily_cutoff) = policy.cutoffs(now);
    debug!(
        "Trimming {} snapshots: hourly cutoff {}, daily cutoff {}",
        entries.len(),
        hourly_cutoff,
        daily_cutoff
    );

    let times: Vec<DateTime<Local>> = entries.iter().map(|e| e.timestamp).collect();
    let remove = classify(&times, &hourly_cutoff, &daily_cutoff);
    info!(
        "Retention marks {} of {} snapshots for removal",
        remove.iter().filter(|r| **r).count(),
        entries.len()
    );

    prune::purge(&entries, &remove, dry_run, sink)
}
