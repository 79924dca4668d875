//! Integration tests for szbck
//!
//! Simulates weeks of hourly snapshots with a daily trim, and runs real
//! snapshot/restore cycles when rsync is installed.

use ::szbck::report::Console;
use ::szbck::restore::{self, RestoreOptions};
use ::szbck::retention::{same_calendar_day, same_iso_week, trim_snapshots};
use ::szbck::snapshot::{self, SnapshotOptions};
use ::szbck::{
    settings, Config, PruneAction, PruneEvent, RetentionPolicy, SnapshotEntry, Target, Verbosity,
};
use anyhow::Context;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::info;

/// A target that can be fed snapshots at chosen instants
pub struct TargetHarness {
    pub temp_dir: TempDir,
    pub target: Target,
    pub policy: RetentionPolicy,
    pub total_purged: usize,
}

impl TargetHarness {
    pub fn new(policy: RetentionPolicy) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let target = Target::new(temp_dir.path()).unwrap();
        Self {
            temp_dir,
            target,
            policy,
            total_purged: 0,
        }
    }

    /// Add an empty snapshot taken at `when` and make it the latest
    pub fn add(&mut self, when: &DateTime<Local>) -> PathBuf {
        let dir = self.target.create(when, 0o700).unwrap();
        self.target.set_latest(&dir).unwrap();
        dir
    }

    /// Trim as if the clock read `now`
    pub fn trim(&mut self, now: &DateTime<Local>) -> Vec<PruneEvent> {
        let mut events = Vec::new();
        self.total_purged += trim_snapshots(&self.target, &self.policy, now, false, &mut events).unwrap();
        events
    }

    /// Surviving snapshots with their timestamps, oldest first
    pub fn entries(&self) -> Vec<SnapshotEntry> {
        SnapshotEntry::from_paths(&self.target.snapshots().unwrap()).unwrap()
    }
}

fn midnight(y: i32, m: u32, d: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, 0, 0, 0).single().unwrap()
}

fn tool_available(program: &str) -> bool {
    let found = Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !found {
        eprintln!("skipping: {program} not found on PATH");
    }
    found
}

#[test]
fn test_six_weeks_of_hourly_snapshots() {
    let policy = RetentionPolicy::new(TimeDelta::hours(48), TimeDelta::days(14)).unwrap();
    let mut harness = TargetHarness::new(policy);
    let start = midnight(2024, 1, 8) + TimeDelta::minutes(5);
    let hours = 42 * 24;

    for hour in 0..hours {
        let when = start + TimeDelta::hours(hour);
        harness.add(&when);
        if hour % 24 == 23 {
            harness.trim(&when);
        }
    }
    let now = start + TimeDelta::hours(hours - 1);
    info!("Purged {} snapshots in total", harness.total_purged);

    let entries = harness.entries();
    let (hourly_cutoff, daily_cutoff) = policy.cutoffs(&now);

    // The last trim ran at `now`, so every snapshot of the last 48 hours is still here
    let recent = entries.iter().filter(|e| e.timestamp > hourly_cutoff).count();
    assert_eq!(recent, 48);

    let daily: Vec<_> = entries
        .iter()
        .filter(|e| e.timestamp <= hourly_cutoff && e.timestamp > daily_cutoff)
        .collect();
    for pair in daily.windows(2) {
        assert!(!same_calendar_day(&pair[0].timestamp, &pair[1].timestamp));
    }

    let weekly: Vec<_> = entries.iter().filter(|e| e.timestamp <= daily_cutoff).collect();
    assert!(!weekly.is_empty());
    for pair in weekly.windows(2) {
        assert!(!same_iso_week(&pair[0].timestamp, &pair[1].timestamp));
    }

    assert_eq!(harness.target.latest().unwrap().as_ref(), entries.last().map(|e| &e.path));
    assert_eq!(harness.total_purged + entries.len(), hours as usize);
}

#[test]
fn test_trim_is_idempotent() {
    let policy = RetentionPolicy::new(TimeDelta::hours(24), TimeDelta::hours(72)).unwrap();
    let mut harness = TargetHarness::new(policy);
    let start = midnight(2024, 2, 1);
    for i in 0..30 {
        harness.add(&(start + TimeDelta::hours(i * 7)));
    }
    let now = start + TimeDelta::hours(30 * 7);

    harness.trim(&now);
    let after_first = harness.entries();
    let events = harness.trim(&now);

    assert_eq!(harness.entries(), after_first);
    assert!(events.iter().all(|e| e.action == PruneAction::Kept));
}

fn rsync_config(source: &Path, target: &Path) -> anyhow::Result<Config> {
    let text = settings::create(source, Some(target))
        .context("rendering default config")?
        .replace("permission: u:rx;g:-;o:-", "permission: 0o0700")
        .replace("option: --acls\n", "")
        .replace("option: --xattrs\n", "");
    Ok(settings::parse(&text)?)
}

#[test]
fn test_snapshot_then_restore() -> anyhow::Result<()> {
    if !tool_available("rsync") || !tool_available("du") {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("home");
    let backups = temp_dir.path().join("backups");
    fs::create_dir_all(source.join("docs"))?;
    fs::create_dir(&backups)?;
    fs::write(source.join("docs/letter.txt"), "Dear reader")?;
    fs::write(source.join("todo.txt"), "nothing")?;

    let config = rsync_config(&source, &backups)?;
    let mut console = Console::new(Vec::new(), Verbosity::Normal);

    snapshot::run(&config, &SnapshotOptions::default(), &mut console).context("first snapshot")?;
    let output = String::from_utf8(console.into_inner())?;
    assert!(output.contains("Running command: rsync"));
    assert!(output.contains("snapshot successful"));
    assert!(output.contains("Used: "));

    fs::remove_file(source.join("docs/letter.txt"))?;
    fs::write(source.join("todo.txt"), "everything")?;
    fs::write(source.join("stray.txt"), "new")?;

    // Restore just the docs directory through latest
    let mut console = Console::new(Vec::new(), Verbosity::Quiet);
    let options = RestoreOptions {
        snapshot: Some(PathBuf::from("latest/home/docs")),
        ..RestoreOptions::default()
    };
    restore::run(&config, &options, &mut console).context("restoring docs")?;

    assert_eq!(fs::read_to_string(source.join("docs/letter.txt"))?, "Dear reader");
    assert_eq!(fs::read_to_string(source.join("todo.txt"))?, "everything");

    // A full restore with --keep leaves extra files alone
    let options = RestoreOptions {
        keep: true,
        ..RestoreOptions::default()
    };
    restore::run(&config, &options, &mut console).context("restoring with --keep")?;
    assert_eq!(fs::read_to_string(source.join("todo.txt"))?, "nothing");
    assert!(source.join("stray.txt").exists());

    // Without --keep they are deleted
    restore::run(&config, &RestoreOptions::default(), &mut console).context("full restore")?;
    assert!(!source.join("stray.txt").exists());
    Ok(())
}

#[test]
fn test_snapshot_with_trim_reports_purges() -> anyhow::Result<()> {
    if !tool_available("rsync") || !tool_available("du") {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let source = temp_dir.path().join("home");
    let backups = temp_dir.path().join("backups");
    fs::create_dir(&source)?;
    fs::create_dir(&backups)?;
    fs::write(source.join("file"), "x")?;

    // Two old snapshots in the same ISO week; the older one goes
    let target = Target::new(&backups)?;
    for day in [2, 3] {
        let dir = target.create(&midnight(2023, 1, day), 0o700)?;
        target.set_latest(&dir)?;
    }

    let config = rsync_config(&source, &backups)?;
    let mut console = Console::new(Vec::new(), Verbosity::Normal);
    let options = SnapshotOptions {
        trim: true,
        ..SnapshotOptions::default()
    };
    snapshot::run(&config, &options, &mut console).context("snapshot with trim")?;

    let output = String::from_utf8(console.into_inner())?;
    assert!(output.contains("snapshot successful (Purged: 1)"), "{output}");
    assert_eq!(target.snapshots()?.len(), 2);
    Ok(())
}
