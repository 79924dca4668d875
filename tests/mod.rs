//! Main test module for szbck
//!
//! This module includes all test suites:
//! - Integration tests for long-running retention scenarios
//! - Property-based tests for classifier and selector invariants
//! - Edge cases around the snapshot store

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::szbck::*;
    use chrono::{Local, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_foreign_directory_is_not_a_target() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("holiday.jpg"), b"not a snapshot").unwrap();

        let err = Target::new(temp_dir.path()).unwrap_err();
        assert!(matches!(err, SzbckError::TargetNotEmpty(_)));
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[cfg(unix)]
    #[test]
    fn test_latest_must_be_a_symlink() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("latest")).unwrap();

        assert!(matches!(
            Target::new(temp_dir.path()),
            Err(SzbckError::InvalidLatest(_))
        ));
    }

    #[test]
    fn test_same_instant_twice() {
        let temp_dir = TempDir::new().unwrap();
        let target = Target::new(temp_dir.path()).unwrap();
        let when = Local.with_ymd_and_hms(2024, 4, 4, 4, 4, 4).single().unwrap();

        let dir = target.create(&when, 0o700).unwrap();
        target.set_latest(&dir).unwrap();

        assert!(matches!(
            target.create(&when, 0o700),
            Err(SzbckError::SnapshotExists(_))
        ));
    }

    #[test]
    fn test_non_snapshot_entries_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let target = Target::new(temp_dir.path()).unwrap();
        let when = Local.with_ymd_and_hms(2024, 4, 4, 4, 4, 4).single().unwrap();
        let dir = target.create(&when, 0o700).unwrap();
        target.set_latest(&dir).unwrap();

        fs::create_dir(temp_dir.path().join("lost+found")).unwrap();
        fs::write(temp_dir.path().join("notes.szb"), b"a file, not a directory").unwrap();

        assert_eq!(target.snapshots().unwrap(), vec![dir]);
    }

    #[test]
    fn test_prune_needs_two_snapshots() {
        let temp_dir = TempDir::new().unwrap();
        let target = Target::new(temp_dir.path()).unwrap();

        let err = selector::prune_oldest(&target, DeleteCount::All, false, &mut NoOpSink).unwrap_err();
        assert!(matches!(err, SzbckError::NoBackups(_)));
    }
}
