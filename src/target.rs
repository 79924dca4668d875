//! Snapshot store
//!
//! A [`Target`] is the directory that holds every snapshot of one source.
//! It is valid when it exists and either carries a `latest` symlink or is
//! still empty, so a directory full of unrelated files is never adopted.
//!
//! ## Layout
//!
//! ```text
//! /mnt/backups/
//! ├── 20240101_020000.0000.szb/
//! ├── 20240101_030000.0000.szb/
//! └── latest -> 20240101_030000.0000.szb
//! ```
//!
//! The `latest` link is relative, so the whole target can be moved or
//! mounted elsewhere without breaking it.

use crate::error::{Result, ResultExt, SzbckError};
use crate::name::{self, NamePattern, LATEST_LINK, SNAPSHOT_GLOB};
use crate::utils;
use chrono::{DateTime, Local};
use globset::Glob;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::{debug, info};

/// Directory holding a series of snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Target {
    root: PathBuf,
}

impl Target {
    /// Open and validate a target directory
    ///
    /// # Errors
    ///
    /// See [`Target::validate`].
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let target = Self { root: root.into() };
        target.validate()?;
        Ok(target)
    }

    /// Root directory of the target
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `latest` symlink, whether or not it exists
    pub fn latest_link(&self) -> PathBuf {
        self.root.join(LATEST_LINK)
    }

    /// Check that the target is usable
    ///
    /// # Errors
    ///
    /// - [`SzbckError::DirectoryNotFound`] if the root does not exist
    /// - [`SzbckError::NotADirectory`] if the root is not a directory
    /// - [`SzbckError::InvalidLatest`] if `latest` exists but is not a symlink
    /// - [`SzbckError::TargetNotEmpty`] if there is no `latest` and the root
    ///   holds anything
    pub fn validate(&self) -> Result<()> {
        utils::ensure_dir(&self.root)?;

        if !self.has_latest()? && !utils::is_empty_dir(&self.root)? {
            return Err(SzbckError::TargetNotEmpty(self.root.clone()));
        }

        Ok(())
    }

    /// Whether a `latest` symlink is present
    pub fn has_latest(&self) -> Result<bool> {
        let link = self.latest_link();
        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => Ok(true),
            Ok(_) => Err(SzbckError::InvalidLatest(link)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot directory the `latest` link points at, if any
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        if !self.has_latest()? {
            return Ok(None);
        }
        let contents = utils::read_symlink(&self.latest_link())?;
        Ok(Some(self.root.join(contents)))
    }

    /// Create a new snapshot directory named after `timestamp`
    ///
    /// The directory (and any missing parents) is created with `mode`, which
    /// is subject to the umask. Returns the full path of the new directory.
    ///
    /// # Errors
    ///
    /// - Any error from [`Target::validate`]
    /// - [`SzbckError::SnapshotExists`] if a snapshot with the same name
    ///   already exists
    pub fn create(&self, timestamp: &DateTime<Local>, mode: u32) -> Result<PathBuf> {
        self.validate()?;

        let dir = self.root.join(name::format_name(timestamp));
        match fs::metadata(&dir) {
            Ok(_) => return Err(SzbckError::SnapshotExists(dir)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        utils::create_dir_all_with_mode(&dir, mode)
            .with_context(|| format!("create snapshot {}", dir.display()))?;
        info!("Created snapshot directory {:?}", dir);

        Ok(dir)
    }

    /// Point `latest` at the snapshot directory `path`
    ///
    /// Any existing link is replaced. The new link holds only the base name
    /// of `path`, so it resolves relative to the target.
    ///
    /// # Errors
    ///
    /// - [`SzbckError::DirectoryNotFound`] or [`SzbckError::NotADirectory`]
    ///   if `path` is not a directory
    /// - [`SzbckError::Io`] if the old link cannot be removed or the new one
    ///   cannot be created
    pub fn set_latest(&self, path: &Path) -> Result<()> {
        utils::ensure_dir(path)?;

        let base = path
            .file_name()
            .ok_or_else(|| SzbckError::NotADirectory(path.to_path_buf()))?;
        let link = self.latest_link();

        match fs::remove_file(&link) {
            Ok(()) => debug!("Removed previous latest link"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SzbckError::from(e))
                    .with_context(|| format!("remove {}", link.display()))
            }
        }

        utils::create_symlink(Path::new(base), &link)
            .with_context(|| format!("link {} to {}", link.display(), path.display()))?;
        info!("Latest snapshot is now {:?}", base);

        Ok(())
    }

    /// Snapshot directories in the target, oldest first
    ///
    /// Matches directory names against `*.szb`; names are not parsed here.
    /// Symbolic links are never snapshots, whatever they point at.
    pub fn snapshots(&self) -> Result<Vec<PathBuf>> {
        let matcher = Glob::new(SNAPSHOT_GLOB)?.compile_matcher();
        let mut dirs = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if matcher.is_match(entry.file_name()) && entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }

        dirs.sort();
        debug!("Found {} snapshots in {:?}", dirs.len(), self.root);
        Ok(dirs)
    }
}

/// Split a path at the first snapshot name it passes through
///
/// The path is canonicalized first (symlinks resolved, made absolute), so a
/// path through `latest` splits at the snapshot it points to. Returns the
/// snapshot directory and the remainder relative to it, with leading and
/// trailing separators removed.
///
/// # Errors
///
/// - [`SzbckError::Io`] if the path cannot be canonicalized
/// - [`SzbckError::PathConversion`] if the canonical path is not UTF-8
/// - [`SzbckError::SplitNotFound`] if no snapshot name occurs in the path
pub fn split<P>(path: &Path, pattern: &P) -> Result<(PathBuf, PathBuf)>
where
    P: NamePattern + ?Sized,
{
    let resolved = fs::canonicalize(path)?;
    let text = resolved
        .to_str()
        .ok_or_else(|| SzbckError::PathConversion(resolved.clone().into_os_string()))?;

    let found = pattern
        .find_in(text)
        .ok_or_else(|| SzbckError::SplitNotFound(resolved.clone()))?;

    let root = PathBuf::from(&text[..found.end]);
    let rest = PathBuf::from(text[found.end..].trim_matches(MAIN_SEPARATOR));

    Ok((root, rest))
}
