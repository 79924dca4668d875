//! Backup configuration files
//!
//! A configuration file describes one backup: what to copy, where the
//! snapshots live, how they are protected and how long they are kept.
//!
//! ## Format
//!
//! One `key: value` pair per line. Everything from a `#` to the end of the
//! line is a comment, and blank lines are ignored.
//!
//! ```text
//! source: /home/user
//! target: /mnt/backups        # optional, may be given with -t instead
//! permission: u:rx;g:-;o:-
//! keepHourly: 48 hours
//! keepDaily: 30 days
//! option: --archive           # repeatable
//! snapshotOption: --delete-excluded
//! restoreOption: --exclude=/.cache
//! ```
//!
//! `source`, `target`, `permission`, `keepHourly` and `keepDaily` may appear
//! once. The option keys repeat, but a value may not be repeated within one
//! key (except `-v` and `--verbose`, which rsync counts). When no `option`
//! lines are present there must be at least one `snapshotOption` and one
//! `restoreOption`.
//!
//! The first bad line stops parsing; its error carries the line number and
//! the raw text.

mod duration;
mod permission;
mod template;

pub use duration::{parse_retention, UNIT_DAYS, UNIT_HOURS};
pub use permission::parse_permission;
pub use template::{create, DEFAULT_CONFIG};

use crate::error::{Result, ResultExt, SzbckError};
use crate::target::Target;
use crate::types::{RetentionPolicy, MIN_KEEP_DAILY_HOURS, MIN_KEEP_HOURLY_HOURS};
use crate::utils;
use chrono::TimeDelta;
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key naming the directory to back up
pub const KEY_SOURCE: &str = "source";
/// Key naming the snapshot directory
pub const KEY_TARGET: &str = "target";
/// Key for the permission applied to finished snapshots
pub const KEY_PERMISSION: &str = "permission";
/// Key for rsync options used by snapshots and restores
pub const KEY_OPTION: &str = "option";
/// Key for rsync options used only by snapshots
pub const KEY_SNAPSHOT_OPTION: &str = "snapshotOption";
/// Key for rsync options used only by restores
pub const KEY_RESTORE_OPTION: &str = "restoreOption";
/// Key for the all-snapshots retention window
pub const KEY_KEEP_HOURLY: &str = "keepHourly";
/// Key for the one-per-day retention window
pub const KEY_KEEP_DAILY: &str = "keepDaily";

/// Validated backup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Absolute path of the directory to back up
    pub source: PathBuf,
    /// Snapshot store, if configured
    pub target: Option<Target>,
    /// Mode applied to the root of each finished snapshot
    #[serde(serialize_with = "serialize_mode")]
    pub permission: u32,
    /// rsync options for both snapshots and restores
    pub options: Vec<String>,
    /// rsync options for snapshots only
    pub snapshot_options: Vec<String>,
    /// rsync options for restores only
    pub restore_options: Vec<String>,
    /// Retention windows
    pub retention: RetentionPolicy,
}

fn serialize_mode<S: Serializer>(mode: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{mode:#05o}"))
}

impl Config {
    /// The configured or overridden target
    ///
    /// # Errors
    ///
    /// - [`SzbckError::NoTarget`] if neither the file nor the command line
    ///   named one
    pub fn target(&self) -> Result<&Target> {
        self.target.as_ref().ok_or(SzbckError::NoTarget)
    }
}

/// Fields collected while reading a file, before mandatory checks
#[derive(Default)]
struct Draft {
    source: Option<PathBuf>,
    target: Option<Target>,
    permission: Option<u32>,
    options: Vec<String>,
    snapshot_options: Vec<String>,
    restore_options: Vec<String>,
    keep_hourly: Option<TimeDelta>,
    keep_daily: Option<TimeDelta>,
}

impl Draft {
    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_SOURCE => {
                once(&self.source, KEY_SOURCE)?;
                self.source = Some(validate_source(value).context("invalid source")?);
            }
            KEY_TARGET => {
                once(&self.target, KEY_TARGET)?;
                self.target = Some(validate_target(value).context("invalid target")?);
            }
            KEY_PERMISSION => {
                once(&self.permission, KEY_PERMISSION)?;
                require_value(KEY_PERMISSION, value)?;
                self.permission = Some(parse_permission(value)?);
            }
            KEY_OPTION => push_option(&mut self.options, KEY_OPTION, value)?,
            KEY_SNAPSHOT_OPTION => {
                push_option(&mut self.snapshot_options, KEY_SNAPSHOT_OPTION, value)?
            }
            KEY_RESTORE_OPTION => {
                push_option(&mut self.restore_options, KEY_RESTORE_OPTION, value)?
            }
            KEY_KEEP_HOURLY => {
                once(&self.keep_hourly, KEY_KEEP_HOURLY)?;
                require_value(KEY_KEEP_HOURLY, value)?;
                self.keep_hourly = Some(parse_retention(
                    KEY_KEEP_HOURLY,
                    value,
                    MIN_KEEP_HOURLY_HOURS,
                )?);
            }
            KEY_KEEP_DAILY => {
                once(&self.keep_daily, KEY_KEEP_DAILY)?;
                require_value(KEY_KEEP_DAILY, value)?;
                self.keep_daily = Some(parse_retention(
                    KEY_KEEP_DAILY,
                    value,
                    MIN_KEEP_DAILY_HOURS,
                )?);
            }
            other => return Err(SzbckError::UnknownKey(other.to_string())),
        }

        Ok(())
    }

    fn finish(self) -> Result<Config> {
        let mut missing = Vec::new();
        if self.source.is_none() {
            missing.push(KEY_SOURCE);
        }
        if self.permission.is_none() {
            missing.push(KEY_PERMISSION);
        }
        if self.keep_hourly.is_none() {
            missing.push(KEY_KEEP_HOURLY);
        }
        if self.keep_daily.is_none() {
            missing.push(KEY_KEEP_DAILY);
        }
        if self.options.is_empty() {
            if self.snapshot_options.is_empty() {
                missing.push(KEY_SNAPSHOT_OPTION);
            }
            if self.restore_options.is_empty() {
                missing.push(KEY_RESTORE_OPTION);
            }
        }

        let (Some(source), Some(permission), Some(keep_hourly), Some(keep_daily)) = (
            self.source,
            self.permission,
            self.keep_hourly,
            self.keep_daily,
        ) else {
            return Err(SzbckError::MissingSettings(missing));
        };
        if !missing.is_empty() {
            return Err(SzbckError::MissingSettings(missing));
        }

        Ok(Config {
            source,
            target: self.target,
            permission,
            options: self.options,
            snapshot_options: self.snapshot_options,
            restore_options: self.restore_options,
            retention: RetentionPolicy::new(keep_hourly, keep_daily)?,
        })
    }
}

fn once<T>(current: &Option<T>, key: &str) -> Result<()> {
    match current {
        Some(_) => Err(SzbckError::DuplicateKey(key.to_string())),
        None => Ok(()),
    }
}

fn require_value(key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SzbckError::MissingValue(key.to_string()));
    }
    Ok(())
}

fn is_verbose(flag: &str) -> bool {
    flag == "-v" || flag == "--verbose"
}

fn push_option(list: &mut Vec<String>, key: &'static str, value: &str) -> Result<()> {
    if list.iter().any(|o| o == value) && !is_verbose(value) {
        return Err(SzbckError::DuplicateOption {
            key,
            value: value.to_string(),
        });
    }
    require_value(key, value)?;
    list.push(value.to_string());
    Ok(())
}

fn validate_source(value: &str) -> Result<PathBuf> {
    let path = Path::new(value);
    utils::ensure_dir(path)?;
    Ok(std::path::absolute(path)?)
}

fn validate_target(value: &str) -> Result<Target> {
    let path = Path::new(value);
    utils::ensure_dir(path)?;
    Target::new(std::path::absolute(path)?)
}

/// Remove a trailing comment and surrounding whitespace
fn strip_comment(line: &str) -> &str {
    let code = match line.find('#') {
        Some(at) => &line[..at],
        None => line,
    };
    code.trim()
}

/// Parse configuration text
///
/// Relative `source` and `target` paths are resolved against the current
/// directory.
///
/// # Errors
///
/// - [`SzbckError::Config`] for the first invalid line
/// - [`SzbckError::MissingSettings`] if mandatory keys are absent
/// - [`SzbckError::InvalidRetention`] if `keepDaily` does not exceed
///   `keepHourly`
///
/// All of these are wrapped in an `invalid config file` context.
pub fn parse(text: &str) -> Result<Config> {
    let mut draft = Draft::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }

        let applied = match line.split_once(':') {
            Some((key, value)) => draft.apply(key.trim(), value.trim()),
            None => Err(SzbckError::InvalidSyntax),
        };
        applied
            .map_err(|source| SzbckError::Config {
                line: idx + 1,
                text: raw.to_string(),
                source: Box::new(source),
            })
            .context("invalid config file")?;
    }

    draft.finish().context("invalid config file")
}

/// Read and parse a configuration file
pub fn load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path).with_context(|| format!("load {}", path.display()))?;
    let config = parse(&text).with_context(|| format!("load {}", path.display()))?;
    debug!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Read a configuration file, letting `target_override` replace its target
///
/// # Errors
///
/// - Any error from [`load`]
/// - An `invalid target` error if the override is not a usable target
/// - [`SzbckError::NoTarget`] if there is neither a configured target nor
///   an override
pub fn load_with_override(path: &Path, target_override: Option<&Path>) -> Result<Config> {
    let mut config = load(path)?;

    match target_override {
        Some(over) => {
            let target = over
                .to_str()
                .ok_or_else(|| SzbckError::PathConversion(over.as_os_str().to_owned()))
                .and_then(validate_target)
                .context("invalid target")?;
            debug!("Target overridden with {:?}", target.root());
            config.target = Some(target);
        }
        None if config.target.is_none() => return Err(SzbckError::NoTarget),
        None => {}
    }

    Ok(config)
}
