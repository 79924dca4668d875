//! Prune executor
//!
//! Carries out keep/remove decisions against real snapshot directories.
//! Snapshots are often read-only (the configured permission is applied after
//! each sync), so every directory of a doomed snapshot is first made
//! owner-writable and only then removed.
//!
//! Deletions are never rolled back. When one fails the run stops, and the
//! error reports how many snapshots had already been deleted.

use crate::error::{Result, SzbckError};
use crate::target::Target;
use crate::types::{EventSink, PruneAction, PruneEvent, SnapshotEntry};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Mode given to every directory of a snapshot before it is deleted
pub const PERM_TO_DELETE: u32 = 0o700;

/// Snapshot directories eligible for a prune or trim run
///
/// # Errors
///
/// - [`SzbckError::NoBackups`] if the target holds no snapshots
/// - [`SzbckError::OnlyLatest`] if it holds exactly one
pub fn existing_snapshots(target: &Target) -> Result<Vec<PathBuf>> {
    let dirs = target.snapshots()?;
    match dirs.len() {
        0 => Err(SzbckError::NoBackups(target.root().to_path_buf())),
        1 => Err(SzbckError::OnlyLatest(target.root().to_path_buf())),
        _ => Ok(dirs),
    }
}

/// Apply removal decisions, oldest first
///
/// `remove[i]` decides the fate of `entries[i]`. In a dry run nothing is
/// touched but every entry is still reported. An event is sent to `sink`
/// for each entry handled without error. Returns the number of snapshots
/// deleted.
///
/// # Errors
///
/// - [`SzbckError::Internal`] if the slices differ in length
/// - [`SzbckError::PurgeFailed`] if a snapshot cannot be deleted; its
///   `purged` field counts the deletions that succeeded before it
pub fn purge(
    entries: &[SnapshotEntry],
    remove: &[bool],
    dry_run: bool,
    sink: &mut dyn EventSink,
) -> Result<usize> {
    if entries.len() != remove.len() {
        return Err(SzbckError::internal(format!(
            "{} removal decisions for {} snapshots",
            remove.len(),
            entries.len()
        )));
    }

    let mut purged = 0;
    for (entry, &marked) in entries.iter().zip(remove) {
        if marked && !dry_run {
            if let Err(source) = delete_snapshot(&entry.path) {
                warn!("Failed to purge {:?}: {}", entry.path, source);
                return Err(SzbckError::PurgeFailed {
                    purged,
                    path: entry.path.clone(),
                    source: Box::new(source),
                });
            }
            purged += 1;
        }

        let action = if marked {
            PruneAction::Purged
        } else {
            PruneAction::Kept
        };
        debug!("{:?} {:?} (dry run: {})", action, entry.path, dry_run);
        sink.record(&PruneEvent {
            path: entry.path.clone(),
            timestamp: entry.timestamp,
            action,
            dry_run,
        });
    }

    info!("Purged {} snapshots", purged);
    Ok(purged)
}

/// Delete one snapshot directory regardless of its permissions
pub fn delete_snapshot(path: &Path) -> Result<()> {
    utils::make_tree_writable(path, PERM_TO_DELETE)?;
    fs::remove_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoOpSink;
    use chrono::{Local, TimeDelta, TimeZone};
    use tempfile::TempDir;
    use tracing_test::traced_test;

    /// Five snapshot-like directories, each holding a read-only subtree
    fn make_entries(root: &Path) -> Vec<SnapshotEntry> {
        let start = Local.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).single().unwrap();

        (0..5)
            .map(|i| {
                let timestamp = start + TimeDelta::hours(i);
                let path = root.join(crate::name::format_name(&timestamp));
                let nested = path.join("home").join("user");
                fs::create_dir_all(&nested).unwrap();
                fs::write(nested.join("notes.txt"), b"keep me").unwrap();
                utils::set_permissions(&nested, 0o500).unwrap();
                utils::set_permissions(&path, 0o500).unwrap();
                SnapshotEntry { path, timestamp }
            })
            .collect()
    }

    /// Remove whatever survived so the temp dir can be cleaned up
    fn cleanup(entries: &[SnapshotEntry]) {
        for entry in entries.iter().filter(|e| e.path.exists()) {
            delete_snapshot(&entry.path).unwrap();
        }
    }

    #[test]
    fn test_purge_marked_entries() {
        let temp_dir = TempDir::new().unwrap();
        let entries = make_entries(temp_dir.path());
        let remove = [true, false, true, false, false];
        let mut events: Vec<PruneEvent> = Vec::new();

        let purged = purge(&entries, &remove, false, &mut events).unwrap();

        assert_eq!(purged, 2);
        for (entry, removed) in entries.iter().zip(remove) {
            assert_eq!(entry.path.exists(), !removed, "{:?}", entry.path);
        }
        let actions: Vec<PruneAction> = events.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            [
                PruneAction::Purged,
                PruneAction::Kept,
                PruneAction::Purged,
                PruneAction::Kept,
                PruneAction::Kept
            ]
        );
        assert!(events.iter().all(|e| !e.dry_run));
        cleanup(&entries);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let entries = make_entries(temp_dir.path());
        let mut events: Vec<PruneEvent> = Vec::new();

        let purged = purge(&entries, &[true; 5], true, &mut events).unwrap();

        assert_eq!(purged, 0);
        assert!(entries.iter().all(|e| e.path.exists()));
        assert_eq!(events.len(), 5);
        assert!(events
            .iter()
            .all(|e| e.dry_run && e.action == PruneAction::Purged));
        cleanup(&entries);
    }

    #[test]
    #[traced_test]
    fn test_third_of_five_failing() {
        let temp_dir = TempDir::new().unwrap();
        let entries = make_entries(temp_dir.path());
        let missing = entries[2].path.clone();
        delete_snapshot(&missing).unwrap();
        let mut events: Vec<PruneEvent> = Vec::new();

        let err = purge(&entries, &[true; 5], false, &mut events).unwrap_err();

        match &err {
            SzbckError::PurgeFailed { purged, path, .. } => {
                assert_eq!(*purged, 2);
                assert_eq!(path, &missing);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.purged_count(), Some(2));
        assert!(!entries[0].path.exists());
        assert!(!entries[1].path.exists());
        assert!(entries[3].path.exists());
        assert!(entries[4].path.exists());
        assert_eq!(events.len(), 2);
        assert!(logs_contain("Failed to purge"));
        cleanup(&entries);
    }

    #[test]
    fn test_mismatched_lengths() {
        let temp_dir = TempDir::new().unwrap();
        let entries = make_entries(temp_dir.path());

        let err = purge(&entries, &[true, false], false, &mut NoOpSink).unwrap_err();
        assert!(matches!(err, SzbckError::Internal(_)));
        assert!(entries.iter().all(|e| e.path.exists()));
        cleanup(&entries);
    }

    #[test]
    fn test_existing_snapshots_needs_two() {
        let temp_dir = TempDir::new().unwrap();
        let target = Target::new(temp_dir.path()).unwrap();
        assert!(matches!(
            existing_snapshots(&target),
            Err(SzbckError::NoBackups(_))
        ));

        let now = Local::now();
        let first = target.create(&now, 0o700).unwrap();
        target.set_latest(&first).unwrap();
        assert!(matches!(
            existing_snapshots(&target),
            Err(SzbckError::OnlyLatest(_))
        ));

        let second = target.create(&(now + TimeDelta::seconds(1)), 0o700).unwrap();
        target.set_latest(&second).unwrap();
        assert_eq!(existing_snapshots(&target).unwrap(), vec![first, second]);
    }
}
