//! Running external helpers
//!
//! rsync and du do the heavy lifting. Both run synchronously; their output
//! reaches the user's terminal while they run and failures come back as
//! [`SzbckError::CommandFailed`] or [`SzbckError::CommandIo`] naming the
//! full command line.

use crate::error::{Result, SzbckError};
use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Command line as a single display string
pub fn describe(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run `program`, copying its stdout and stderr to ours as it goes
///
/// Both streams are forwarded by background threads, which are joined
/// before this returns.
///
/// # Errors
///
/// - [`SzbckError::CommandIo`] if the program cannot be started
/// - [`SzbckError::CommandFailed`] if it exits unsuccessfully
pub fn run_forwarding(program: &str, args: &[OsString]) -> Result<()> {
    let command = describe(program, args);
    debug!("Running command: {}", command);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SzbckError::CommandIo {
            command: command.clone(),
            source,
        })?;

    let forward_out = child
        .stdout
        .take()
        .map(|mut out| thread::spawn(move || io::copy(&mut out, &mut io::stdout())));
    let forward_err = child
        .stderr
        .take()
        .map(|mut err| thread::spawn(move || io::copy(&mut err, &mut io::stderr())));

    let status = child.wait().map_err(|source| SzbckError::CommandIo {
        command: command.clone(),
        source,
    })?;

    for handle in [forward_out, forward_err].into_iter().flatten() {
        match handle.join() {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Lost output from '{}': {}", command, e),
            Err(_) => warn!("Output forwarding for '{}' panicked", command),
        }
    }

    if !status.success() {
        return Err(SzbckError::CommandFailed { command, status });
    }

    Ok(())
}

/// Run `program` and return its stdout; stderr goes straight to ours
///
/// # Errors
///
/// - [`SzbckError::CommandIo`] if the program cannot be started
/// - [`SzbckError::CommandFailed`] if it exits unsuccessfully
/// - [`SzbckError::UnexpectedOutput`] if stdout is not UTF-8
pub fn capture_stdout(program: &str, args: &[OsString]) -> Result<String> {
    let command = describe(program, args);
    debug!("Running command: {}", command);

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| SzbckError::CommandIo {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(SzbckError::CommandFailed {
            command,
            status: output.status,
        });
    }

    String::from_utf8(output.stdout).map_err(|e| SzbckError::UnexpectedOutput {
        command,
        output: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
