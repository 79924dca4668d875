//! Default configuration rendered by `szbck create`

use super::parse;
use crate::error::{Result, ResultExt};
use crate::target::Target;
use crate::utils;
use std::path::Path;

const SOURCE_PLACEHOLDER: &str = "source: /home/user";
const TARGET_PLACEHOLDER: &str = "#target: /mnt/backupDir";

/// Starting point for a new configuration file
pub const DEFAULT_CONFIG: &str = "\
# szbck backup configuration
#
# One 'key: value' pair per line.  Everything after a '#' is ignored.

# Directory to back up.
source: /home/user

# Directory holding the snapshots.  Leave it commented out to supply it
# with -t on every command instead.
#target: /mnt/backupDir

# Permission given to the root of each finished snapshot, either octal
# (0o0500) or symbolic (u:rx;g:-;o:-).
permission: u:rx;g:-;o:-

# Every snapshot younger than keepHourly is kept.  After that one per day is
# kept until keepDaily, then one per ISO week.  Units are hours or days.
keepHourly: 48 hours
keepDaily: 30 days

# rsync options for both snapshots and restores.
option: --archive
option: --hard-links
option: --acls
option: --xattrs
option: --one-file-system
#option: --verbose

# rsync options for snapshots only.
snapshotOption: --delete-excluded
#snapshotOption: --exclude=/.cache

# rsync options for restores only.
#restoreOption: --exclude=/.cache
";

/// Render the default configuration for `source` and an optional target
///
/// Both paths are made absolute and validated, and the rendered text is
/// parsed once to make sure it would load.
///
/// # Errors
///
/// - [`SzbckError::DirectoryNotFound`](crate::SzbckError::DirectoryNotFound)
///   or [`SzbckError::NotADirectory`](crate::SzbckError::NotADirectory) for
///   a bad source
/// - Any [`Target::new`] error for a bad target
///
/// All of these are wrapped in a `create settings error` context.
pub fn create(source: &Path, target: Option<&Path>) -> Result<String> {
    render(source, target).context("create settings error")
}

fn render(source: &Path, target: Option<&Path>) -> Result<String> {
    let source = std::path::absolute(source)?;
    utils::ensure_dir(&source)?;

    let mut text = DEFAULT_CONFIG.replacen(
        SOURCE_PLACEHOLDER,
        &format!("source: {}", source.display()),
        1,
    );

    if let Some(target) = target {
        let target = Target::new(std::path::absolute(target)?)?;
        text = text.replacen(
            TARGET_PLACEHOLDER,
            &format!("target: {}", target.root().display()),
            1,
        );
    }

    parse(&text)?;
    Ok(text)
}
