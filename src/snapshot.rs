//! Taking snapshots
//!
//! A snapshot is a fresh directory in the target filled by rsync. Files
//! unchanged since the latest snapshot are hard linked against it through
//! `--link-dest`, so every snapshot looks complete while only changed files
//! take new space.
//!
//! The new directory stays owner-only while rsync runs and is given the
//! configured permission once the copy is complete. Only then does `latest`
//! move to it.
//!
//! In daemon mode the cycle repeats roughly on the hour. See
//! [`next_hour_in`].

use crate::du;
use crate::error::Result;
use crate::report::{dry_run_marker, Console};
use crate::retention;
use crate::rsync::{self, Transfer};
use crate::settings::Config;
use crate::utils::{self, format_count};
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Mode of a snapshot directory while rsync fills it
pub const INITIAL_SNAPSHOT_PERM: u32 = 0o700;

const HOUR: Duration = Duration::from_secs(60 * 60);
const MIN_PAUSE: Duration = Duration::from_secs(31 * 60);

/// Pause before the next daemon cycle
///
/// Aims for one hour after the start of the cycle that took `elapsed`,
/// adding whole hours until at least 31 minutes remain.
///
/// ```rust
/// use std::time::Duration;
/// use szbck::snapshot::next_hour_in;
///
/// let minutes = |m: u64| Duration::from_secs(m * 60);
/// assert_eq!(next_hour_in(minutes(10)), minutes(50));
/// assert_eq!(next_hour_in(minutes(45)), minutes(75));
/// ```
pub fn next_hour_in(elapsed: Duration) -> Duration {
    let mut wake = HOUR;
    while wake < elapsed + MIN_PAUSE {
        wake += HOUR;
    }
    wake - elapsed
}

/// Switches for a snapshot run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Let rsync report what it would do, then discard the new directory
    pub dry_run: bool,
    /// Apply the retention policy after each snapshot
    pub trim: bool,
    /// Repeat every hour until an error occurs
    pub daemon: bool,
}

/// Result of one snapshot cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOutcome {
    /// Directory of the new snapshot (already removed after a dry run)
    pub path: PathBuf,
    /// Snapshots deleted by the trim, when one ran
    pub purged: Option<usize>,
}

/// Take one snapshot of the configured source
///
/// `now` names the new snapshot directory.
///
/// # Errors
///
/// - [`SzbckError::NoTarget`] if no target is configured
/// - [`SzbckError::SnapshotExists`] if a snapshot named after `now` exists
/// - Any rsync failure; the partly filled directory is left in place
/// - Any trim error when [`SnapshotOptions::trim`] is set
pub fn take_snapshot<W: Write>(
    config: &Config,
    now: &DateTime<Local>,
    options: &SnapshotOptions,
    console: &mut Console<W>,
) -> Result<SnapshotOutcome> {
    let target = config.target()?;
    let dir = target.create(now, INITIAL_SNAPSHOT_PERM)?;
    let link_dest = target.latest()?;
    debug!("Linking unchanged files against {:?}", link_dest);

    let args = rsync::build_args(
        &Transfer {
            delete: true,
            dry_run: options.dry_run,
            link_dest: link_dest.as_deref(),
            options: &config.options,
            extra_options: &config.snapshot_options,
            from: &config.source,
            to: &dir,
        },
        console.verbosity(),
    );
    rsync::run(&args, console)?;

    if options.dry_run {
        fs::remove_dir_all(&dir)?;
        debug!("Discarded dry run snapshot {:?}", dir);
    } else {
        utils::set_permissions(&dir, config.permission)?;
        target.set_latest(&dir)?;
        info!("Snapshot complete: {:?}", dir);
    }

    let purged = if options.trim {
        Some(retention::trim_snapshots(
            target,
            &config.retention,
            &Local::now(),
            options.dry_run,
            console,
        )?)
    } else {
        None
    };

    Ok(SnapshotOutcome { path: dir, purged })
}

/// Take a snapshot, or keep taking them hourly in daemon mode
///
/// Byte usage of the target is reported after every cycle.
///
/// # Errors
///
/// Any error from [`take_snapshot`] or from measuring the target stops the
/// run. With trimming enabled the error notes how many snapshots all
/// cycles deleted.
pub fn run<W: Write>(
    config: &Config,
    options: &SnapshotOptions,
    console: &mut Console<W>,
) -> Result<()> {
    let mut total_purged = 0;

    cycle(config, options, console, &mut total_purged).map_err(|e| {
        if options.trim {
            let total = total_purged + e.purged_count().unwrap_or(0);
            e.context(format!("snapshot error (Total Purged: {})", format_count(total as i64)))
        } else {
            e.context("snapshot error")
        }
    })
}

fn cycle<W: Write>(
    config: &Config,
    options: &SnapshotOptions,
    console: &mut Console<W>,
    total_purged: &mut usize,
) -> Result<()> {
    let target = config.target()?;
    let mut before = du::total(target.root())?;

    loop {
        let started = Instant::now();
        let outcome = take_snapshot(config, &Local::now(), options, console)?;

        let purged = match outcome.purged {
            Some(n) => {
                *total_purged += n;
                format!(" (Purged: {})", format_count(n as i64))
            }
            None => String::new(),
        };

        let after = du::total(target.root())?;
        console.success(format_args!(
            "snapshot successful{}{}",
            purged,
            dry_run_marker(options.dry_run)
        ));
        console.used(before, after);
        before = after;

        if !options.daemon {
            return Ok(());
        }

        let pause = next_hour_in(started.elapsed());
        info!("Next snapshot in {}", humantime::format_duration(pause));
        thread::sleep(pause);
    }
}
