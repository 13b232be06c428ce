//! vibe - command-line front end for vibestack
//!
//! Edits a project's working copy, checkpoints it on branches, and builds
//! and deploys snapshots.

use clap::{Parser, Subcommand};
use vibestack_core::logging_facility;
use vibestack_engine::EngineConfig;

mod commands;

use commands::{GlobalArgs, Session};

#[derive(Debug, Parser)]
#[command(name = "vibe")]
#[command(about = "vibestack - versioned multi-file web projects", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Project registry
    Project(commands::project::ProjectArgs),
    /// Working-copy files
    File(commands::file::FileArgs),
    /// Apply an AI edit response to the working copy
    Apply(commands::file::ApplyArgs),
    /// Compare the working copy with a branch head
    Status(commands::file::StatusArgs),
    /// Capture the working copy as a new snapshot
    Checkpoint(commands::history::CheckpointArgs),
    /// Show a branch's history, newest first
    Log(commands::history::LogArgs),
    /// Re-checkpoint an earlier snapshot on a branch
    Restore(commands::history::RestoreArgs),
    /// Start a new branch at a snapshot
    Fork(commands::history::ForkArgs),
    /// List branches
    Branches,
    /// Compare two snapshots
    Diff(commands::history::DiffArgs),
    /// Render a snapshot's deployable worker script
    Artifact(commands::deploy::ArtifactArgs),
    /// Build and publish a snapshot
    Deploy(commands::deploy::DeployArgs),
    /// Inspect and manage deployments
    Deployment(commands::deploy::DeploymentArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = EngineConfig::load(Some(&cli.global.config))?;
    logging_facility::init_with_filter(
        config.logging.profile()?,
        config.logging.filter.as_deref(),
    );

    let mut session = Session::open(&cli.global, config)?;
    match cli.command {
        Commands::Project(args) => commands::project::execute(args, &mut session),
        Commands::File(args) => commands::file::execute(args, &mut session),
        Commands::Apply(args) => commands::file::execute_apply(args, &mut session),
        Commands::Status(args) => commands::file::execute_status(args, &mut session),
        Commands::Checkpoint(args) => commands::history::execute_checkpoint(args, &mut session),
        Commands::Log(args) => commands::history::execute_log(args, &mut session),
        Commands::Restore(args) => commands::history::execute_restore(args, &mut session),
        Commands::Fork(args) => commands::history::execute_fork(args, &mut session),
        Commands::Branches => commands::history::execute_branches(&mut session),
        Commands::Diff(args) => commands::history::execute_diff(args, &mut session),
        Commands::Artifact(args) => commands::deploy::execute_artifact(args, &mut session),
        Commands::Deploy(args) => commands::deploy::execute_deploy(args, &mut session),
        Commands::Deployment(args) => commands::deploy::execute_deployment(args, &mut session),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
