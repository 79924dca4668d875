//! rsync invocation
//!
//! szbck never copies files itself. Snapshots and restores are both a single
//! rsync run; this module only decides the argument list. Options from the
//! configuration are passed through untouched, in order.
//!
//! If the configured options say nothing about rsync's own output, the
//! tool's verbosity picks it: one `--verbose` normally, two when verbose,
//! none when quiet.

use crate::command;
use crate::error::Result;
use crate::report::Console;
use crate::types::Verbosity;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;

/// Name of the rsync executable
pub const RSYNC: &str = "rsync";

/// Do everything except change the destination
pub const FLAG_DRY_RUN: &str = "--dry-run";

/// Remove destination files missing from the source
pub const FLAG_DELETE: &str = "--delete";

/// Hard link unchanged files against a previous snapshot
pub const FLAG_LINK_DEST: &str = "--link-dest=";

/// One rsync transfer
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'a> {
    /// Pass `--delete`
    pub delete: bool,
    /// Pass `--dry-run`
    pub dry_run: bool,
    /// Directory for `--link-dest`
    pub link_dest: Option<&'a Path>,
    /// Options shared by snapshots and restores
    pub options: &'a [String],
    /// Options specific to this kind of transfer
    pub extra_options: &'a [String],
    /// Source path
    pub from: &'a Path,
    /// Destination path
    pub to: &'a Path,
}

fn controls_output(option: &str) -> bool {
    matches!(option, "-v" | "--verbose" | "-q" | "--quiet")
        || option.starts_with("--info=")
        || option.starts_with("--debug=")
        || option.starts_with("--stderr=")
}

/// Build the rsync argument list for a transfer
///
/// The order is: verbosity flags, shared options, `--delete`, `--dry-run`,
/// `--link-dest=<dir>`, transfer-specific options, source, destination.
pub fn build_args(transfer: &Transfer<'_>, verbosity: Verbosity) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(
        transfer.options.len() + transfer.extra_options.len() + 7,
    );

    let configured = transfer
        .options
        .iter()
        .chain(transfer.extra_options)
        .any(|o| controls_output(o));
    if !configured {
        let count = match verbosity {
            Verbosity::Quiet => 0,
            Verbosity::Normal => 1,
            Verbosity::Verbose | Verbosity::Debug => 2,
        };
        args.extend(std::iter::repeat(OsString::from("--verbose")).take(count));
    }

    args.extend(transfer.options.iter().map(OsString::from));
    if transfer.delete {
        args.push(FLAG_DELETE.into());
    }
    if transfer.dry_run {
        args.push(FLAG_DRY_RUN.into());
    }
    if let Some(dir) = transfer.link_dest {
        let mut flag = OsString::from(FLAG_LINK_DEST);
        flag.push(dir);
        args.push(flag);
    }
    args.extend(transfer.extra_options.iter().map(OsString::from));
    args.push(transfer.from.into());
    args.push(transfer.to.into());

    args
}

/// Run rsync with a prepared argument list, announcing it on `console`
pub fn run<W: Write>(args: &[OsString], console: &mut Console<W>) -> Result<()> {
    console.line(format_args!("Running command: {}", command::describe(RSYNC, args)));
    command::run_forwarding(RSYNC, args)
}
