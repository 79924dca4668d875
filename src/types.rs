//! Core data types used throughout the szbck library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Snapshots**: [`SnapshotEntry`] - a snapshot directory paired with the
//!   instant parsed from its name
//! - **Policy**: [`RetentionPolicy`] - how long hourly and daily resolution
//!   is kept
//! - **Reporting**: [`PruneEvent`], [`EventSink`] - per-snapshot outcomes of
//!   a prune or trim run
//! - **Output**: [`Verbosity`] - how chatty the tool and its helpers are
//!
//! ## Examples
//!
//! ```rust
//! use szbck::types::RetentionPolicy;
//! use chrono::{Local, TimeDelta};
//!
//! let policy = RetentionPolicy::new(TimeDelta::hours(48), TimeDelta::days(30)).unwrap();
//! let (hourly_cutoff, daily_cutoff) = policy.cutoffs(&Local::now());
//! assert!(daily_cutoff < hourly_cutoff);
//! ```

use crate::error::{Result, SzbckError};
use crate::name;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Shortest allowed `keep_hourly`, in hours
pub const MIN_KEEP_HOURLY_HOURS: i64 = 24;

/// Shortest allowed `keep_daily`, in hours
pub const MIN_KEEP_DAILY_HOURS: i64 = 48;

/// Decaying-resolution retention policy
///
/// Every snapshot newer than `keep_hourly` is kept. Between `keep_hourly`
/// and `keep_daily` one snapshot per calendar day survives, and beyond
/// `keep_daily` one per ISO week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    /// Age below which every snapshot is kept
    #[serde(serialize_with = "serialize_delta")]
    pub keep_hourly: TimeDelta,
    /// Age below which one snapshot per day is kept
    #[serde(serialize_with = "serialize_delta")]
    pub keep_daily: TimeDelta,
}

impl RetentionPolicy {
    /// Create a validated policy
    ///
    /// # Errors
    ///
    /// - [`SzbckError::InvalidRetention`] if `keep_hourly` is under 24 hours,
    ///   `keep_daily` is under 48 hours, or `keep_daily` does not exceed
    ///   `keep_hourly`
    pub fn new(keep_hourly: TimeDelta, keep_daily: TimeDelta) -> Result<Self> {
        if keep_hourly < TimeDelta::hours(MIN_KEEP_HOURLY_HOURS) {
            return Err(SzbckError::InvalidRetention {
                key: "keepHourly",
                value: humanize(keep_hourly),
                reason: format!("must be at least {MIN_KEEP_HOURLY_HOURS} hours"),
            });
        }
        if keep_daily < TimeDelta::hours(MIN_KEEP_DAILY_HOURS) {
            return Err(SzbckError::InvalidRetention {
                key: "keepDaily",
                value: humanize(keep_daily),
                reason: format!("must be at least {MIN_KEEP_DAILY_HOURS} hours"),
            });
        }
        if keep_daily <= keep_hourly {
            return Err(SzbckError::InvalidRetention {
                key: "keepDaily",
                value: humanize(keep_daily),
                reason: format!("must be longer than keepHourly ({})", humanize(keep_hourly)),
            });
        }

        Ok(Self {
            keep_hourly,
            keep_daily,
        })
    }

    /// `(hourly_cutoff, daily_cutoff)` relative to `now`
    pub fn cutoffs<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> (DateTime<Tz>, DateTime<Tz>) {
        (
            now.clone() - self.keep_hourly,
            now.clone() - self.keep_daily,
        )
    }
}

/// Render a duration the way operators write it
pub(crate) fn humanize(delta: TimeDelta) -> String {
    match delta.to_std() {
        Ok(d) => humantime::format_duration(d).to_string(),
        Err(_) => format!("{}s", delta.num_seconds()),
    }
}

fn serialize_delta<S: serde::Serializer>(
    delta: &TimeDelta,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&humanize(*delta))
}

/// A snapshot directory and the instant encoded in its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    /// Full path to the snapshot directory
    pub path: PathBuf,
    /// Creation instant parsed from the directory name
    pub timestamp: DateTime<Local>,
}

impl SnapshotEntry {
    /// Build an entry by parsing the final component of `path`
    ///
    /// # Errors
    ///
    /// - [`SzbckError::InvalidSnapshotName`] if the name is not a snapshot name
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let timestamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(name::parse_name)
            .ok_or_else(|| SzbckError::InvalidSnapshotName(path.clone()))?;

        Ok(Self { path, timestamp })
    }

    /// Build entries for every path, failing on the first unparsable name
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Self>> {
        paths
            .iter()
            .map(|p| Self::from_path(p.as_ref()))
            .collect()
    }
}

/// What the executor did with a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneAction {
    /// Left in place
    Kept,
    /// Deleted, or would have been in a dry run
    Purged,
}

/// Outcome for one snapshot visited by the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneEvent {
    /// Snapshot directory
    pub path: PathBuf,
    /// Instant encoded in its name
    pub timestamp: DateTime<Local>,
    /// Decision that was carried out
    pub action: PruneAction,
    /// Whether the filesystem was left untouched
    pub dry_run: bool,
}

/// Receives per-snapshot outcomes from the executor
///
/// Implementations must not fail; reporting is best effort.
///
/// # Example
///
/// ```rust
/// use szbck::types::{EventSink, PruneAction, PruneEvent};
///
/// #[derive(Default)]
/// struct Tally {
///     purged: usize,
/// }
///
/// impl EventSink for Tally {
///     fn record(&mut self, event: &PruneEvent) {
///         if event.action == PruneAction::Purged {
///             self.purged += 1;
///         }
///     }
/// }
/// ```
pub trait EventSink {
    /// Called once per snapshot, oldest first
    fn record(&mut self, event: &PruneEvent);
}

/// Collects events in memory
impl EventSink for Vec<PruneEvent> {
    fn record(&mut self, event: &PruneEvent) {
        self.push(event.clone());
    }
}

/// Sink that discards every event
#[derive(Debug, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn record(&mut self, _event: &PruneEvent) {}
}

/// Output level chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Progress lines and warnings
    #[default]
    Normal,
    /// Informational detail
    Verbose,
    /// Everything, including debug traces
    Debug,
}

impl Verbosity {
    /// Derive the level from a repeated `-v` count and a `-q` flag
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
        }
    }

    /// Whether ordinary progress output is suppressed
    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}
