//! Target usage report

use crate::du;
use crate::error::{Result, ResultExt, SzbckError};
use crate::target::Target;
use crate::utils::format_count;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Disk usage of one snapshot measured on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSize {
    /// Directory name of the snapshot
    pub name: String,
    /// Bytes used, counting files shared with other snapshots
    pub bytes: u64,
}

/// Snapshot count and disk usage of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub target: PathBuf,
    pub backup_sets: usize,
    /// Bytes used by the whole target, shared files counted once
    pub total_bytes: u64,
    /// Oldest first
    pub snapshots: Vec<SnapshotSize>,
}

impl StatusReport {
    /// Measure every snapshot in `target`
    ///
    /// # Errors
    ///
    /// - [`SzbckError::NoBackups`] if the target holds no snapshots
    /// - Any `du` failure
    ///
    /// All of these are wrapped in a `status error` context.
    pub fn build(target: &Target) -> Result<Self> {
        Self::measure(target).context("status error")
    }

    fn measure(target: &Target) -> Result<Self> {
        let dirs = target.snapshots()?;
        if dirs.is_empty() {
            return Err(SzbckError::NoBackups(target.root().to_path_buf()));
        }

        let total_bytes = du::total(target.root())?;
        let snapshots = dirs
            .iter()
            .map(|dir| {
                Ok(SnapshotSize {
                    name: dir
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    bytes: du::total(dir)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            target: target.root().to_path_buf(),
            backup_sets: snapshots.len(),
            total_bytes,
            snapshots,
        })
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backup Sets: {}", format_count(self.backup_sets as i64))?;
        writeln!(f, "Total Bytes: {}", format_count(self.total_bytes as i64))?;
        writeln!(f)?;
        for snapshot in &self.snapshots {
            writeln!(f, "{}: {}", snapshot.name, format_count(snapshot.bytes as i64))?;
        }
        Ok(())
    }
}
