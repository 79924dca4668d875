//! Utility functions for szbck
//!
//! Small filesystem and formatting helpers shared by the snapshot store, the
//! prune executor and the command line front end.
//!
//! ## Categories of Utilities
//!
//! ### Directory Checks
//! - Existence and type checks with distinct errors for missing paths and
//!   non-directories
//! - Emptiness checks used by target validation
//!
//! ### Permission Handling
//! - Creating directories with an explicit Unix mode
//! - Escalating a whole tree to an owner-writable mode before deletion
//!
//! ### Formatting
//! - Integers with thousands separators, as printed in byte totals
//!
//! ## Example Usage
//!
//! ```rust
//! use szbck::utils::format_count;
//!
//! assert_eq!(format_count(1_234_567), "1,234,567");
//! assert_eq!(format_count(-4_096), "-4,096");
//! ```

use crate::error::{Result, SzbckError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// Ensure `path` exists and is a directory
///
/// # Errors
///
/// - [`SzbckError::DirectoryNotFound`] if nothing exists at `path`
/// - [`SzbckError::NotADirectory`] if `path` is something other than a directory
/// - [`SzbckError::Io`] for any other failure to stat the path
pub fn ensure_dir(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SzbckError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SzbckError::DirectoryNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check whether a directory has no entries
pub fn is_empty_dir(path: &Path) -> Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Create a directory and any missing parents with the given mode
///
/// The mode is subject to the process umask, as with `mkdir(2)`.
#[cfg(unix)]
pub fn create_dir_all_with_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(mode).create(path)?;
    Ok(())
}

/// Create a directory and any missing parents (Windows ignores the mode)
#[cfg(windows)]
pub fn create_dir_all_with_mode(path: &Path, _mode: u32) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Set permissions (Windows implementation)
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    // Only the owner write bit maps onto anything Windows understands
    let is_readonly = (mode & 0o200) == 0;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(is_readonly);
    fs::set_permissions(path, perms)?;

    Ok(())
}

/// Give every directory in a tree the given mode
///
/// The root is changed first so that its children can be listed, then every
/// directory below it in walk order. Files and symbolic links are left
/// alone: removing an entry only needs write access to its parent. A root
/// that is itself a symbolic link is not touched.
///
/// # Errors
///
/// - [`SzbckError::Io`] if a mode cannot be changed
/// - [`SzbckError::WalkDir`] if part of the tree cannot be read
pub fn make_tree_writable(root: &Path, mode: u32) -> Result<()> {
    // A linked root is only unlinked, never entered
    if fs::symlink_metadata(root)?.file_type().is_symlink() {
        return Ok(());
    }
    set_permissions(root, mode)?;

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            trace!("chmod {:o} {:?}", mode, entry.path());
            set_permissions(entry.path(), mode)?;
        }
    }

    Ok(())
}

/// Format a signed integer with `,` thousands separators
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Atomic file write (write to temp file then rename)
///
/// The target file is never observed partially written.
///
/// # Errors
///
/// - [`SzbckError::Io`] if writing to the temporary file fails
/// - [`SzbckError::Io`] if the atomic rename operation fails
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;
    symlink(target, link)?;
    Ok(())
}

/// Create a symlink (Windows)
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::symlink_dir;
    // Links always name snapshot directories
    symlink_dir(target, link)?;
    Ok(())
}

/// Read symlink target
pub fn read_symlink(path: &Path) -> Result<PathBuf> {
    Ok(fs::read_link(path)?)
}
