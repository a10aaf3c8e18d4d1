//! Rota - fair duty rotation runner
//!
//! CLI entry point.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use rota::cli::{render_history, render_report, render_status};
use rota::duty::config::validate_webhook_url;
use rota::duty::directory::set_member_active;
use rota::rotation::log::{LIVE_LOG_FILE, TEST_LOG_FILE};
use rota::schedule::is_due;
use rota::{
    rotation_status, AssignmentLog, AssignmentReport, CycleStore, DutyAssigner, DutyKind,
    JsonlAssignmentLog, RosterFileDirectory, RotaConfig, WebhookNotifier,
};

/// Fair duty rotation runner
///
/// Hands out recurring duties so everyone eligible takes one turn before
/// anyone repeats, announces each pick on a chat webhook and keeps an
/// append-only history.
#[derive(Parser, Debug)]
#[command(name = "rota", version, about)]
struct Cli {
    /// Path to the rota.toml configuration file
    #[arg(long, global = true, default_value = "rota.toml")]
    config: PathBuf,

    /// Directory for the assignment log (overrides global.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use live history and announce with mentions in the live channel.
    /// Without it everything runs in test mode against a separate log.
    #[arg(long, global = true)]
    live: bool,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign a duty to the next member in the rotation
    Assign {
        /// Which duty to assign
        duty: DutyKind,

        /// Assign even if this period is off-cycle for the duty
        #[arg(long)]
        force: bool,

        /// Select without notifying or recording
        #[arg(long)]
        dry_run: bool,

        /// Incoming webhook URL (overrides notifier.webhook_url)
        #[arg(long, env = "ROTA_WEBHOOK_URL")]
        webhook_url: Option<String>,

        /// Seed for member selection, for reproducible picks
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the current cycle: who is done and who is still due
    Status {
        /// Which duty to inspect
        duty: DutyKind,
    },

    /// Show recorded assignments
    History {
        /// Only show this duty
        duty: Option<DutyKind>,
    },

    /// Add or remove members from every rotation
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
}

#[derive(Subcommand, Debug)]
enum MemberAction {
    /// Put a member back into the rotation
    Activate {
        /// Member username
        username: String,
    },
    /// Take a member out of the rotation
    Deactivate {
        /// Member username
        username: String,
    },
}

/// Open the assignment log for the selected mode.
fn open_log(
    config: &RotaConfig,
    data_dir: Option<&Path>,
    live: bool,
) -> Result<Arc<dyn AssignmentLog>> {
    let dir = data_dir.unwrap_or(&config.global.data_dir);
    let file_name = if live { LIVE_LOG_FILE } else { TEST_LOG_FILE };
    let log = JsonlAssignmentLog::new(dir, file_name, config.global.store_timeout())
        .with_context(|| format!("Failed to open assignment log in '{}'", dir.display()))?;
    Ok(Arc::new(log))
}

/// Whether to go ahead with an assignment on `today`.
///
/// Live runs stop off-cycle; test runs note it and carry on so the flow
/// can be rehearsed any day.
fn should_assign(duty: DutyKind, today: NaiveDate, live: bool, force: bool) -> bool {
    if force || is_due(duty, today) {
        return true;
    }
    if live {
        return false;
    }
    info!(duty = %duty, "off-cycle period: would not have assigned in live mode");
    true
}

/// Log filter: `RUST_LOG` directives when set, otherwise info (debug with
/// `--verbose`).
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn output_report(report: &AssignmentReport, json: bool) -> Result<ExitCode> {
    if json {
        print_json(report)?;
    } else {
        render_report(report);
    }
    Ok(exit_code(report.is_success()))
}

async fn run_assign(
    cli: &Cli,
    duty: DutyKind,
    force: bool,
    dry_run: bool,
    webhook_url: Option<String>,
    seed: Option<u64>,
) -> Result<ExitCode> {
    let config = RotaConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load config from '{}'", cli.config.display()))?;

    if !should_assign(duty, Local::now().date_naive(), cli.live, force) {
        return output_report(&AssignmentReport::skipped(duty), cli.json);
    }

    info!(duty = %duty, live = cli.live, dry_run, "assignment process started");

    let mut notifier_config = config.notifier.clone();
    if let Some(url) = webhook_url {
        validate_webhook_url(&url)?;
        notifier_config.webhook_url = Some(url);
    }
    let notifier = WebhookNotifier::new(notifier_config, config.profiles(), !cli.live)
        .context("Failed to build webhook client")?;

    let log = open_log(&config, cli.data_dir.as_deref(), cli.live)?;
    let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let mut assigner = DutyAssigner::new(
        Arc::new(RosterFileDirectory::new(&cli.config)),
        log,
        Arc::new(notifier),
        rng,
    )
    .dry_run(dry_run);

    let report = assigner.assign(duty).await;
    output_report(&report, cli.json)
}

async fn run_status(cli: &Cli, duty: DutyKind) -> Result<ExitCode> {
    let config = RotaConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load config from '{}'", cli.config.display()))?;
    let store = CycleStore::new(open_log(&config, cli.data_dir.as_deref(), cli.live)?);
    let directory = RosterFileDirectory::new(&cli.config);

    let status = rotation_status(&directory, &store, duty)
        .await
        .with_context(|| format!("Failed to read {duty} rotation"))?;

    if cli.json {
        print_json(&status)?;
    } else {
        render_status(duty, &status);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_history(cli: &Cli, duty: Option<DutyKind>) -> Result<ExitCode> {
    let config = RotaConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load config from '{}'", cli.config.display()))?;
    let log = open_log(&config, cli.data_dir.as_deref(), cli.live)?;

    let mut assignments = log
        .read_all()
        .await
        .context("Failed to read assignment log")?;
    if let Some(duty) = duty {
        assignments.retain(|a| a.duty_kind == duty);
    }

    if cli.json {
        print_json(&assignments)?;
    } else {
        render_history(&assignments, &config.members);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_member(cli: &Cli, action: &MemberAction) -> Result<ExitCode> {
    let (username, active) = match action {
        MemberAction::Activate { username } => (username, true),
        MemberAction::Deactivate { username } => (username, false),
    };

    let changed = set_member_active(&cli.config, username, active)?;
    let state = if active { "active" } else { "inactive" };
    if changed {
        eprintln!("Member '{username}' is now {state}.");
    } else {
        eprintln!("Member '{username}' was already {state}.");
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Assign {
            duty,
            force,
            dry_run,
            webhook_url,
            seed,
        } => run_assign(&cli, *duty, *force, *dry_run, webhook_url.clone(), *seed).await,
        Command::Status { duty } => run_status(&cli, *duty).await,
        Command::History { duty } => run_history(&cli, *duty).await,
        Command::Member { action } => run_member(&cli, action),
    }
}
