//! # szbck CLI
//!
//! Command-line front end for szbck snapshot backups.
//!
//! ## Usage
//! ```bash
//! # Write a configuration for /home/user
//! szbck create -o home.conf -t /mnt/backups /home/user
//!
//! # Take a snapshot and apply the retention policy
//! szbck snapshot --trim home.conf
//!
//! # Keep snapshotting every hour
//! szbck snapshot --daemon --trim home.conf
//!
//! # Restore one directory from the latest snapshot
//! szbck restore -s latest/user/docs home.conf
//!
//! # Delete the three oldest snapshots
//! szbck prune -n 3 home.conf
//! ```

use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use szbck::report::{dry_run_marker, Console};
use szbck::restore::{self, RestoreOptions};
use szbck::snapshot::{self, SnapshotOptions};
use szbck::status::StatusReport;
use szbck::utils::{self, format_count};
use szbck::{du, retention, selector, settings, DeleteCount, Result, SzbckError, Verbosity};
use tracing_subscriber::EnvFilter;

/// szbck - rsync snapshots with a decaying retention policy
#[derive(Parser)]
#[command(name = "szbck")]
#[command(version)]
#[command(about = "Time-machine style rsync snapshots with a decaying retention policy")]
#[command(long_about = None)]
struct Cli {
    /// More output (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a default configuration for a source directory
    #[command(visible_alias = "c")]
    Create {
        /// Directory to back up
        source: PathBuf,

        /// Write the configuration to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Snapshot target to record in the configuration
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Take a snapshot of the configured source
    #[command(visible_aliases = ["s", "snap"])]
    Snapshot {
        /// Configuration file
        config: PathBuf,

        /// Show what rsync would do and discard the new snapshot
        #[arg(long)]
        dry_run: bool,

        /// Apply the retention policy afterwards
        #[arg(long)]
        trim: bool,

        /// Repeat every hour
        #[arg(long)]
        daemon: bool,

        /// Override the configured target
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Restore the source from a snapshot
    #[command(visible_aliases = ["r", "res"])]
    Restore {
        /// Configuration file
        config: PathBuf,

        /// Path below the target to restore from (defaults to latest)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Show what rsync would do without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Keep files missing from the snapshot
        #[arg(long)]
        keep: bool,

        /// Override the configured target
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Delete the oldest snapshots
    #[command(visible_alias = "p")]
    Prune {
        /// Configuration file
        config: PathBuf,

        /// How many to delete: a positive number or "all"
        #[arg(short = 'n', default_value = "1", allow_hyphen_values = true)]
        count: String,

        /// Report without deleting
        #[arg(long)]
        dry_run: bool,

        /// Override the configured target
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Apply the retention policy
    #[command(visible_alias = "t")]
    Trim {
        /// Configuration file
        config: PathBuf,

        /// Report without deleting
        #[arg(long)]
        dry_run: bool,

        /// Override the configured target
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Show snapshot count and disk usage
    #[command(visible_alias = "stat")]
    Status {
        /// Configuration file
        config: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Override the configured target
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Check a configuration file
    #[command(visible_alias = "v")]
    Vet {
        /// Configuration file
        config: PathBuf,

        /// Print the parsed configuration as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli.command, verbosity) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(command: Commands, verbosity: Verbosity) -> Result<()> {
    let mut console = Console::stdout(verbosity);

    match command {
        Commands::Create {
            source,
            output,
            target,
        } => cmd_create(&source, output.as_deref(), target.as_deref()),
        Commands::Snapshot {
            config,
            dry_run,
            trim,
            daemon,
            target,
        } => {
            let cfg = settings::load_with_override(&config, target.as_deref())?;
            let options = SnapshotOptions {
                dry_run,
                trim,
                daemon,
            };
            snapshot::run(&cfg, &options, &mut console)
        }
        Commands::Restore {
            config,
            snapshot,
            dry_run,
            keep,
            target,
        } => {
            let cfg = settings::load_with_override(&config, target.as_deref())?;
            let options = RestoreOptions {
                snapshot,
                dry_run,
                keep,
            };
            restore::run(&cfg, &options, &mut console)?;
            println!("{} restore successful{}", "✓".green().bold(), dry_run_marker(dry_run));
            Ok(())
        }
        Commands::Prune {
            config,
            count,
            dry_run,
            target,
        } => cmd_prune(&config, &count, dry_run, target.as_deref(), &mut console),
        Commands::Trim {
            config,
            dry_run,
            target,
        } => cmd_trim(&config, dry_run, target.as_deref(), &mut console),
        Commands::Status {
            config,
            json,
            target,
        } => cmd_status(&config, json, target.as_deref()),
        Commands::Vet { config, json } => {
            let cfg = settings::load(&config).map_err(|e| e.context("vet error"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{} vet successful (no problems found)", "✓".green().bold());
            }
            Ok(())
        }
    }
}

/// Render a default configuration to stdout or a new file
fn cmd_create(source: &Path, output: Option<&Path>, target: Option<&Path>) -> Result<()> {
    let text = settings::create(source, target)?;

    let Some(path) = output else {
        print!("{text}");
        return Ok(());
    };

    if fs::symlink_metadata(path).is_ok() {
        return Err(SzbckError::OutputExists(path.to_path_buf()));
    }
    utils::atomic_write(path, text.as_bytes())?;

    println!(
        "{} successfully created: {}",
        "✓".green().bold(),
        path.display().to_string().cyan()
    );
    Ok(())
}

/// Delete the oldest snapshots, reporting the space recovered
fn cmd_prune(
    config: &Path,
    count: &str,
    dry_run: bool,
    target: Option<&Path>,
    console: &mut Console,
) -> Result<()> {
    let count = DeleteCount::parse(count)?;
    let cfg = settings::load_with_override(config, target)?;
    let target = cfg.target()?;

    let before = du::total(target.root())?;

    let heading = match count {
        DeleteCount::All => "Purging all but the latest backup".to_string(),
        DeleteCount::Oldest(1) => "Purging oldest backup".to_string(),
        DeleteCount::Oldest(n) => format!("Purging {n} oldest backups"),
    };
    console.line(format_args!("{}{}", heading.blue().bold(), dry_run_marker(dry_run)));

    let purged = selector::prune_oldest(target, count, dry_run, console)
        .map_err(|e| with_purged("prune error", e))?;

    let after = du::total(target.root())?;
    console.success(format_args!(
        "prune successful (Purged: {}){}",
        format_count(purged as i64),
        dry_run_marker(dry_run)
    ));
    console.recovered(before, after);
    Ok(())
}

/// Apply the retention policy, reporting the space recovered
fn cmd_trim(config: &Path, dry_run: bool, target: Option<&Path>, console: &mut Console) -> Result<()> {
    let cfg = settings::load_with_override(config, target)?;
    let target = cfg.target()?;

    let before = du::total(target.root())?;
    let purged = retention::trim_snapshots(target, &cfg.retention, &Local::now(), dry_run, console)
        .map_err(|e| with_purged("trim error", e))?;
    let after = du::total(target.root())?;

    console.success(format_args!(
        "trim successful (Purged: {}){}",
        format_count(purged as i64),
        dry_run_marker(dry_run)
    ));
    console.recovered(before, after);
    Ok(())
}

/// Print the usage report of the target
fn cmd_status(config: &Path, json: bool, target: Option<&Path>) -> Result<()> {
    let cfg = settings::load_with_override(config, target)?;
    let report = StatusReport::build(cfg.target()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} status successful\n", "✓".green().bold());
        print!("{report}");
    }
    Ok(())
}

/// Name the operation and how many snapshots were deleted before it failed
fn with_purged(operation: &str, err: SzbckError) -> SzbckError {
    let purged = err.purged_count().unwrap_or(0);
    err.context(format!("{operation} (Purged: {})", format_count(purged as i64)))
}
