//! Manual pruning by count
//!
//! Unlike [`retention`](crate::retention), no policy is involved: the caller
//! asks for the `n` oldest snapshots to go. The newest snapshot is excluded
//! up front, so it survives however large `n` is.

use crate::error::{Result, SzbckError};
use crate::prune;
use crate::target::Target;
use crate::types::{EventSink, SnapshotEntry};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// How many snapshots a manual prune removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCount {
    /// Every snapshot except the newest
    All,
    /// At most this many of the oldest snapshots
    Oldest(usize),
}

impl DeleteCount {
    /// Parse `all` or a positive integer
    ///
    /// # Errors
    ///
    /// - [`SzbckError::InvalidCount`] carrying the raw input for anything
    ///   else, including zero and negative numbers
    pub fn parse(raw: &str) -> Result<Self> {
        if raw == "all" {
            return Ok(DeleteCount::All);
        }
        match raw.parse::<i64>() {
            Ok(n) if n >= 1 => usize::try_from(n)
                .map(DeleteCount::Oldest)
                .map_err(|_| SzbckError::InvalidCount(raw.to_string())),
            _ => Err(SzbckError::InvalidCount(raw.to_string())),
        }
    }

    /// Concrete count given `max` candidates
    pub fn resolve(self, max: usize) -> usize {
        match self {
            DeleteCount::All => max,
            DeleteCount::Oldest(n) => n.min(max),
        }
    }
}

impl Default for DeleteCount {
    fn default() -> Self {
        DeleteCount::Oldest(1)
    }
}

impl FromStr for DeleteCount {
    type Err = SzbckError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DeleteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteCount::All => f.write_str("all"),
            DeleteCount::Oldest(n) => write!(f, "{n}"),
        }
    }
}

/// Snapshots that may be pruned, oldest first, newest excluded
///
/// # Errors
///
/// - [`SzbckError::NoBackups`] if the target holds no snapshots
/// - [`SzbckError::OnlyLatest`] if it holds exactly one
pub fn load_candidates(target: &Target) -> Result<Vec<PathBuf>> {
    let mut dirs = prune::existing_snapshots(target)?;
    dirs.pop();
    Ok(dirs)
}

/// Removal flags marking the first `count` of `candidates`
pub fn decisions(candidates: usize, count: usize) -> Vec<bool> {
    (0..candidates).map(|i| i < count).collect()
}

/// Delete the oldest snapshots in `target`
///
/// Returns the number of snapshots deleted (zero for a dry run).
///
/// # Errors
///
/// - Any error from [`load_candidates`]
/// - [`SzbckError::InvalidSnapshotName`] if a candidate name does not parse
/// - [`SzbckError::PurgeFailed`] if a deletion fails part way through
pub fn prune_oldest(
    target: &Target,
    count: DeleteCount,
    dry_run: bool,
    sink: &mut dyn EventSink,
) -> Result<usize> {
    let candidates = load_candidates(target)?;
    let entries = SnapshotEntry::from_paths(&candidates)?;

    let n = count.resolve(entries.len());
    info!("Pruning {} of {} candidate snapshots", n, entries.len());

    prune::purge(&entries, &decisions(entries.len(), n), dry_run, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PruneAction, PruneEvent};
    use chrono::{Local, TimeDelta, TimeZone};
    use tempfile::TempDir;

    fn populated_target(count: i64) -> (TempDir, Target, Vec<PathBuf>) {
        let temp_dir = TempDir::new().unwrap();
        let target = Target::new(temp_dir.path()).unwrap();
        let start = Local.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).single().unwrap();

        let dirs = (0..count)
            .map(|i| {
                let dir = target.create(&(start + TimeDelta::hours(i)), 0o700).unwrap();
                target.set_latest(&dir).unwrap();
                dir
            })
            .collect();

        (temp_dir, target, dirs)
    }

    #[test]
    fn test_parse_delete_count() {
        assert_eq!(DeleteCount::parse("all").unwrap(), DeleteCount::All);
        assert_eq!(DeleteCount::parse("3").unwrap(), DeleteCount::Oldest(3));
        assert_eq!("1".parse::<DeleteCount>().unwrap(), DeleteCount::default());

        for raw in ["0", "-1", "", "two", "3.5", "ALL", " 2"] {
            match DeleteCount::parse(raw) {
                Err(SzbckError::InvalidCount(kept)) => assert_eq!(kept, raw),
                other => panic!("{raw:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_resolve_clamps() {
        assert_eq!(DeleteCount::All.resolve(7), 7);
        assert_eq!(DeleteCount::Oldest(3).resolve(7), 3);
        assert_eq!(DeleteCount::Oldest(30).resolve(7), 7);
        assert_eq!(DeleteCount::All.to_string(), "all");
        assert_eq!(DeleteCount::Oldest(4).to_string(), "4");
    }

    #[test]
    fn test_decisions() {
        assert_eq!(decisions(4, 2), [true, true, false, false]);
        assert_eq!(decisions(3, 3), [true, true, true]);
        assert!(decisions(0, 0).is_empty());
    }

    #[test]
    fn test_load_candidates_excludes_newest() {
        let (_temp_dir, target, dirs) = populated_target(3);
        assert_eq!(load_candidates(&target).unwrap(), dirs[..2].to_vec());
    }

    #[test]
    fn test_prune_oldest() {
        let (_temp_dir, target, dirs) = populated_target(5);
        let mut events: Vec<PruneEvent> = Vec::new();

        let purged = prune_oldest(&target, DeleteCount::Oldest(2), false, &mut events).unwrap();

        assert_eq!(purged, 2);
        assert_eq!(target.snapshots().unwrap(), dirs[2..].to_vec());
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].action, PruneAction::Purged);
        assert_eq!(events[2].action, PruneAction::Kept);
    }

    #[test]
    fn test_prune_all_keeps_latest() {
        let (_temp_dir, target, dirs) = populated_target(4);

        let purged = prune_oldest(&target, DeleteCount::All, false, &mut Vec::<PruneEvent>::new()).unwrap();

        assert_eq!(purged, 3);
        assert_eq!(target.snapshots().unwrap(), vec![dirs[3].clone()]);
        assert_eq!(target.latest().unwrap(), Some(dirs[3].clone()));
    }

    #[test]
    fn test_prune_needs_two_snapshots() {
        let (_temp_dir, target, _dirs) = populated_target(1);
        let err = prune_oldest(&target, DeleteCount::All, false, &mut Vec::<PruneEvent>::new()).unwrap_err();
        assert!(matches!(err, SzbckError::OnlyLatest(_)));
    }
}
