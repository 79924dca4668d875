//! # szbck - rsync snapshot backups with decaying retention
//!
//! szbck keeps a series of hard-linked rsync snapshots of one directory and
//! thins them out as they age.
//!
//! ## Overview
//!
//! Each snapshot is a complete copy of the source in a directory named after
//! the instant it was taken (`20240101_020000.0000.szb`). Files unchanged
//! since the previous snapshot are hard links into it, so a snapshot costs
//! only the space of what changed. A relative `latest` symlink always names
//! the newest snapshot.
//!
//! Old snapshots are removed in two ways:
//! - **Trim** applies a [`RetentionPolicy`]: everything younger than
//!   `keepHourly` stays, then one snapshot per calendar day until
//!   `keepDaily`, then one per ISO week.
//! - **Prune** deletes the oldest N snapshots outright.
//!
//! The newest snapshot is never removed by either.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use szbck::report::Console;
//! use szbck::snapshot::{self, SnapshotOptions};
//! use szbck::{settings, Verbosity};
//! use std::path::Path;
//!
//! # fn main() -> szbck::Result<()> {
//! let config = settings::load(Path::new("/etc/szbck/home.conf"))?;
//! let mut console = Console::stdout(Verbosity::Normal);
//!
//! let options = SnapshotOptions {
//!     trim: true,
//!     ..SnapshotOptions::default()
//! };
//! snapshot::run(&config, &options, &mut console)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Classifying Without a Filesystem
//!
//! ```rust
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use szbck::retention::classify;
//!
//! let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
//! let times: Vec<_> = (0..4).map(|h| now - TimeDelta::days(3) + TimeDelta::hours(h)).collect();
//!
//! // Four snapshots on the same day, all past the hourly window
//! let remove = classify(&times, &(now - TimeDelta::hours(48)), &(now - TimeDelta::days(30)));
//! assert_eq!(remove, [true, true, true, false]);
//! ```
//!
//! ## External Tools
//!
//! Copying is done by `rsync` and sizes are measured with `du`. Both must be
//! on the `PATH` for snapshot, restore and status operations.
//!
//! ## Module Organization
//!
//! - [`settings`]: Configuration file parsing and the default template
//! - [`target`]: The snapshot store and its `latest` link
//! - [`name`]: Snapshot directory names
//! - [`retention`]: The decaying retention classifier and trim
//! - [`selector`]: Oldest-N selection for prune
//! - [`prune`]: Deleting snapshots
//! - [`snapshot`], [`restore`], [`status`]: The remaining operations
//! - [`rsync`], [`du`], [`command`]: External processes
//! - [`report`]: Console output
//! - [`types`]: Common types
//! - [`error`]: Error types and handling

// Public API modules
pub mod command;
pub mod du;
pub mod error;
pub mod name;
pub mod prune;
pub mod report;
pub mod restore;
pub mod retention;
pub mod rsync;
pub mod selector;
pub mod settings;
pub mod snapshot;
pub mod status;
pub mod target;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use error::{ErrorKind, Result, ResultExt, SzbckError};
pub use selector::DeleteCount;
pub use settings::Config;
pub use target::Target;
pub use types::*;
