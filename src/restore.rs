//! Restoring from a snapshot
//!
//! Snapshots hold the source directory under its own base name, so a
//! snapshot of `/home/user` contains `<snapshot>/user/...`. Restoring a
//! path inside a snapshot copies it back to the same place below the
//! source's parent directory.
//!
//! ```text
//! <snapshot>                    -> rsync <snapshot>/user          /home
//! <snapshot>/user/docs          -> rsync <snapshot>/user/docs     /home/user
//! <snapshot>/user/docs/letters  -> rsync <snapshot>/user/docs/letters /home/user/docs
//! ```

use crate::error::{Result, ResultExt, SzbckError};
use crate::name::{SnapshotNamePattern, LATEST_LINK};
use crate::report::Console;
use crate::rsync::{self, Transfer};
use crate::settings::Config;
use crate::target;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Switches for a restore run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Path below the target to restore from; the latest snapshot when unset
    pub snapshot: Option<PathBuf>,
    /// Pass `--dry-run` to rsync
    pub dry_run: bool,
    /// Keep files that are missing from the snapshot (no `--delete`)
    pub keep: bool,
}

/// Work out the rsync source and destination for a restore
///
/// `src` is a path inside the target: a snapshot, a directory within one,
/// or anything that reaches a snapshot through `latest`. When `src` names
/// no snapshot at all, `src/latest` is tried instead. `to` is the configured
/// source directory.
///
/// # Errors
///
/// - [`SzbckError::Io`] if `src` (or `src/latest`) does not exist
/// - [`SzbckError::SplitNotFound`] if neither names a snapshot
/// - [`SzbckError::InvalidRestorePath`] if the path inside the snapshot is
///   not below the base name of `to`
pub fn make_dirs(src: &Path, to: &Path) -> Result<(PathBuf, PathBuf)> {
    let to_base = to
        .file_name()
        .ok_or_else(|| SzbckError::NotADirectory(to.to_path_buf()))?;
    let to_parent = to.parent().unwrap_or(Path::new(""));

    let (root, sub) = match target::split(src, &SnapshotNamePattern) {
        Err(SzbckError::SplitNotFound(_)) => {
            target::split(&src.join(LATEST_LINK), &SnapshotNamePattern)?
        }
        other => other?,
    };

    let from = if sub.as_os_str().is_empty() || sub.as_os_str() == to_base {
        root.join(to_base)
    } else if matches!(sub.components().next(), Some(Component::Normal(first)) if first == to_base)
    {
        root.join(&sub)
    } else {
        return Err(SzbckError::InvalidRestorePath {
            subpath: sub.display().to_string(),
            base: to_base.to_string_lossy().into_owned(),
        });
    };

    let dest = match sub.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => to_parent.join(dir),
        _ => to_parent.to_path_buf(),
    };

    debug!("Restore {:?} -> {:?}", from, dest);
    Ok((from, dest))
}

/// Restore the configured source from a snapshot
///
/// # Errors
///
/// - [`SzbckError::NoTarget`] if no target is configured
/// - Any error from [`make_dirs`]
/// - Any rsync failure
///
/// All of these are wrapped in a `restore error` context.
pub fn run<W: Write>(
    config: &Config,
    options: &RestoreOptions,
    console: &mut Console<W>,
) -> Result<()> {
    restore(config, options, console).context("restore error")
}

fn restore<W: Write>(
    config: &Config,
    options: &RestoreOptions,
    console: &mut Console<W>,
) -> Result<()> {
    let target = config.target()?;
    let src = match &options.snapshot {
        Some(snapshot) => target.root().join(snapshot),
        None => target.root().to_path_buf(),
    };

    let (from, to) = make_dirs(&src, &config.source)?;

    let args = rsync::build_args(
        &Transfer {
            delete: !options.keep,
            dry_run: options.dry_run,
            link_dest: None,
            options: &config.options,
            extra_options: &config.restore_options,
            from: &from,
            to: &to,
        },
        console.verbosity(),
    );
    rsync::run(&args, console)
}
