//! Disk usage via `du`
//!
//! Hard-linked files shared between snapshots are counted once per `du`
//! run, so the total for a target is far smaller than the sum of its
//! snapshots measured one at a time.

use crate::command;
use crate::error::{Result, SzbckError};
use crate::utils;
use std::ffi::OsString;
use std::path::Path;

const DU: &str = "du";

/// Bytes used by the tree rooted at `dir`
///
/// # Errors
///
/// - [`SzbckError::DirectoryNotFound`] or [`SzbckError::NotADirectory`]
/// - Any error from running `du`
/// - [`SzbckError::UnexpectedOutput`] if the byte count cannot be read
pub fn total(dir: &Path) -> Result<u64> {
    utils::ensure_dir(dir)?;

    let args: [OsString; 3] = ["-s".into(), "-b".into(), dir.into()];
    let output = command::capture_stdout(DU, &args)?;

    parse_total(&output).ok_or_else(|| SzbckError::UnexpectedOutput {
        command: command::describe(DU, &args),
        output,
    })
}

fn parse_total(output: &str) -> Option<u64> {
    output.split('\t').next()?.trim().parse().ok()
}
