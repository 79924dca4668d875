//! Error types for szbck
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is the single [`SzbckError`] enum. Variants fall into the categories named
//! by [`ErrorKind`]; [`SzbckError::kind`] recovers that category even through
//! layers of operation context added with [`ResultExt`].
//!
//! Context layers display as `"<operation>: <cause>"`, so the innermost
//! message always reaches the operator.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Type alias for Results in the szbck crate
pub type Result<T> = std::result::Result<T, SzbckError>;

/// Broad category of a [`SzbckError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input (configuration values, counts)
    Validation,
    /// The filesystem is not in a state the operation can work with
    State,
    /// A snapshot directory name does not parse as a timestamp
    UnparsableName,
    /// A destructive operation failed part way through
    Execution,
    /// An external helper (rsync, du) could not be run or failed
    ExternalProcess,
    /// Plain I/O failure with no more specific classification
    Io,
}

/// Main error type for all szbck operations
#[derive(Debug, Error)]
pub enum SzbckError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Errors while rendering JSON reports
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid snapshot glob pattern
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    /// Path is not valid UTF-8 where a string form is required
    #[error("Path conversion error: {0:?}")]
    PathConversion(std::ffi::OsString),

    /// Directory does not exist
    #[error("Invalid directory: {0:?}")]
    DirectoryNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// Target holds no `latest` link but is not empty
    #[error("Target has no 'latest' link and is not empty: {0:?}")]
    TargetNotEmpty(PathBuf),

    /// Something other than a symbolic link is named `latest`
    #[error("Invalid latest symlink: {0:?}")]
    InvalidLatest(PathBuf),

    /// A snapshot with the same instant already exists
    #[error("Snapshot already exists: {0:?}")]
    SnapshotExists(PathBuf),

    /// No snapshot directories in the target
    #[error("No backups found in {0:?}")]
    NoBackups(PathBuf),

    /// Only one snapshot exists and it can never be removed
    #[error("Only latest backup exists in {0:?}")]
    OnlyLatest(PathBuf),

    /// Path does not pass through a snapshot directory
    #[error("No snapshot directory found in path: {0:?}")]
    SplitNotFound(PathBuf),

    /// Restore subpath lies outside the configured source
    #[error("Invalid restore path: '{subpath}' must start with '{base}'")]
    InvalidRestorePath {
        /// Subpath found inside the snapshot
        subpath: String,
        /// Base name of the configured source
        base: String,
    },

    /// Refusing to overwrite an existing file
    #[error("Output file already exists: {0:?}")]
    OutputExists(PathBuf),

    /// Snapshot directory name does not match the timestamp format
    #[error("Invalid snapshot name: {0:?}")]
    InvalidSnapshotName(PathBuf),

    /// Permission spec could not be parsed or is out of range
    #[error("Invalid permission '{value}': {reason}")]
    InvalidPermission {
        /// Raw value from the configuration
        value: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Retention duration could not be parsed or violates its minimum
    #[error("Invalid {key} retention '{value}': {reason}")]
    InvalidRetention {
        /// Configuration key (`keepHourly` or `keepDaily`)
        key: &'static str,
        /// Raw value from the configuration
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// Singular configuration key given twice
    #[error("Duplicate key: '{0}'")]
    DuplicateKey(String),

    /// Repeatable option given twice with the same value
    #[error("Duplicate {key}: '{value}'")]
    DuplicateOption {
        /// Configuration key
        key: &'static str,
        /// Repeated value
        value: String,
    },

    /// Configuration key not recognised
    #[error("Unknown key: '{0}'")]
    UnknownKey(String),

    /// Configuration key present without a value
    #[error("Missing value for key: '{0}'")]
    MissingValue(String),

    /// Configuration line is not a `key: value` pair
    #[error("Invalid key:value pair")]
    InvalidSyntax,

    /// Mandatory settings absent after parsing the whole file
    #[error("Missing settings: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    /// Neither the configuration nor the command line names a target
    #[error("No target configured or overridden")]
    NoTarget,

    /// Deletion count is not `all` or a positive integer
    #[error("Invalid number to prune: '{0}'")]
    InvalidCount(String),

    /// Error on a specific configuration line
    #[error("line({line}): {source}\n\t{text}")]
    Config {
        /// 1-based line number
        line: usize,
        /// The raw line
        text: String,
        /// What went wrong
        #[source]
        source: Box<SzbckError>,
    },

    /// A snapshot could not be deleted; earlier deletions stand
    #[error("Purge failed after {purged} deletions at {path:?}: {source}")]
    PurgeFailed {
        /// Deletions completed before the failure
        purged: usize,
        /// Snapshot that could not be deleted
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<SzbckError>,
    },

    /// External command exited unsuccessfully
    #[error("Command failed ({status}): '{command}'")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Exit status reported by the OS
        status: ExitStatus,
    },

    /// External command could not be started or its streams failed
    #[error("Could not run '{command}': {source}")]
    CommandIo {
        /// Command line that was attempted
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// External command produced output that could not be interpreted
    #[error("Unexpected output from '{command}': {output:?}")]
    UnexpectedOutput {
        /// Command line that was run
        command: String,
        /// Output that failed to parse
        output: String,
    },

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),

    /// Operation context wrapped around a cause
    #[error("{context}: {source}")]
    Context {
        /// Operation that failed
        context: String,
        /// Underlying failure
        #[source]
        source: Box<SzbckError>,
    },
}

impl SzbckError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        SzbckError::Internal(msg.into())
    }

    /// Wrap this error with the operation that produced it
    pub fn context(self, context: impl Into<String>) -> Self {
        SzbckError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Category of the innermost classified error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SzbckError::Context { source, .. } | SzbckError::Config { source, .. } => {
                match source.kind() {
                    // A bad line is a validation problem whatever the cause
                    ErrorKind::Io if matches!(self, SzbckError::Config { .. }) => {
                        ErrorKind::Validation
                    }
                    kind => kind,
                }
            }
            SzbckError::InvalidPermission { .. }
            | SzbckError::InvalidRetention { .. }
            | SzbckError::DuplicateKey(_)
            | SzbckError::DuplicateOption { .. }
            | SzbckError::UnknownKey(_)
            | SzbckError::MissingValue(_)
            | SzbckError::InvalidSyntax
            | SzbckError::MissingSettings(_)
            | SzbckError::NoTarget
            | SzbckError::InvalidCount(_) => ErrorKind::Validation,
            SzbckError::DirectoryNotFound(_)
            | SzbckError::NotADirectory(_)
            | SzbckError::TargetNotEmpty(_)
            | SzbckError::InvalidLatest(_)
            | SzbckError::SnapshotExists(_)
            | SzbckError::NoBackups(_)
            | SzbckError::OnlyLatest(_)
            | SzbckError::SplitNotFound(_)
            | SzbckError::InvalidRestorePath { .. }
            | SzbckError::OutputExists(_) => ErrorKind::State,
            SzbckError::InvalidSnapshotName(_) => ErrorKind::UnparsableName,
            SzbckError::PurgeFailed { .. } => ErrorKind::Execution,
            SzbckError::CommandFailed { .. }
            | SzbckError::CommandIo { .. }
            | SzbckError::UnexpectedOutput { .. } => ErrorKind::ExternalProcess,
            SzbckError::Io(_)
            | SzbckError::WalkDir(_)
            | SzbckError::Json(_)
            | SzbckError::Glob(_)
            | SzbckError::PathConversion(_)
            | SzbckError::Internal(_) => ErrorKind::Io,
        }
    }

    /// Number of snapshots deleted before a partial failure, if any
    pub fn purged_count(&self) -> Option<usize> {
        match self {
            SzbckError::PurgeFailed { purged, .. } => Some(*purged),
            SzbckError::Context { source, .. } => source.purged_count(),
            _ => None,
        }
    }

    /// Innermost error beneath any context layers
    pub fn root_cause(&self) -> &SzbckError {
        match self {
            SzbckError::Context { source, .. } => source.root_cause(),
            _ => self,
        }
    }
}

/// Adds operation context to fallible results
pub trait ResultExt<T> {
    /// Wrap the error with a fixed context message
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error with a lazily built context message
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SzbckError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
