//! Console output
//!
//! Progress lines and summaries go to stdout through a [`Console`], which
//! drops everything when the tool runs quietly. Diagnostics go through
//! `tracing` instead and end up on stderr.

use crate::types::{EventSink, PruneAction, PruneEvent, Verbosity};
use crate::utils::format_count;
use colored::*;
use std::fmt::Display;
use std::io::{self, Stdout, Write};
use tracing::debug;

/// Timestamp layout used for snapshot lines (RFC 850)
pub const EVENT_TIME_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S %Z";

/// Marker appended to messages of a dry run
pub fn dry_run_marker(dry_run: bool) -> &'static str {
    if dry_run {
        " (DRY RUN)"
    } else {
        ""
    }
}

/// Line-oriented writer for user-facing output
#[derive(Debug)]
pub struct Console<W: Write = Stdout> {
    writer: W,
    verbosity: Verbosity,
}

impl Console<Stdout> {
    /// Console on the process's stdout
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::new(io::stdout(), verbosity)
    }
}

impl<W: Write> Console<W> {
    pub fn new(writer: W, verbosity: Verbosity) -> Self {
        Self { writer, verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Write one line unless output is quiet
    ///
    /// Write failures are logged and otherwise ignored.
    pub fn line(&mut self, text: impl Display) {
        if self.verbosity.is_quiet() {
            return;
        }
        if let Err(e) = writeln!(self.writer, "{text}") {
            debug!("Console write failed: {}", e);
        }
    }

    /// `✓ <message>` in the success style
    pub fn success(&mut self, message: impl Display) {
        let mark = "✓".green().bold();
        self.line(format_args!("{mark} {message}"));
    }

    /// Byte totals around a run that freed space
    pub fn recovered(&mut self, before: u64, after: u64) {
        self.byte_totals(before, after, "Total Recovered", before as i64 - after as i64);
    }

    /// Byte totals around a run that consumed space
    pub fn used(&mut self, before: u64, after: u64) {
        self.byte_totals(before, after, "Used", after as i64 - before as i64);
    }

    fn byte_totals(&mut self, before: u64, after: u64, label: &str, difference: i64) {
        self.line(format_args!(
            "  Before: {} After: {} {}: {} bytes",
            format_count(before as i64).cyan(),
            format_count(after as i64).cyan(),
            label,
            format_count(difference).cyan()
        ));
    }

    /// Hand back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for Console<W> {
    fn record(&mut self, event: &PruneEvent) {
        let verb = match event.action {
            PruneAction::Purged => "Purging snapshot".yellow(),
            PruneAction::Kept => "Keeping snapshot".normal(),
        };
        let line = format!(
            "{}{}: {}: {}",
            verb,
            dry_run_marker(event.dry_run),
            event.path.display(),
            event.timestamp.format(EVENT_TIME_FORMAT)
        );
        self.line(line);
    }
}
