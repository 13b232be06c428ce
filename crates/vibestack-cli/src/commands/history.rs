//! Snapshot and branch commands

use anyhow::bail;
use clap::Args;
use vibestack_core::diff::{compute_diff, render_human_summary};
use vibestack_core::errors::ExError;
use vibestack_core::ManifestBuilder;
use vibestack_engine::commands::branch::{
    list_branches, list_snapshots, require_snapshot, CheckpointOptions,
};
use vibestack_engine::{apply_engine_command, EngineCommand, EngineCommandResult};

use super::Session;

#[derive(Debug, Args)]
pub struct CheckpointArgs {
    #[arg(short, long)]
    pub message: String,

    /// Longer note stored with the snapshot
    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Refuse unless the branch head is this snapshot
    #[arg(long)]
    pub expect_head: Option<String>,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    #[arg(long, default_value = "main")]
    pub branch: String,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    pub snapshot: String,

    #[arg(long, default_value = "main")]
    pub branch: String,
}

#[derive(Debug, Args)]
pub struct ForkArgs {
    pub snapshot: String,
    pub branch: String,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    pub a: String,
    pub b: String,

    /// Print the structured diff as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_checkpoint(args: CheckpointArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let files = session.load_files(&project.id)?;
    let publisher = session.publisher();

    let cmd = EngineCommand::Checkpoint {
        project_id: project.id.clone(),
        branch: args.branch.clone(),
        files,
        message: args.message,
        options: CheckpointOptions {
            expected_head: args.expect_head,
            description: args.description,
        },
    };
    let (conn, ctx) = session.engine(&publisher);
    let EngineCommandResult::Checkpoint { snapshot, files } = apply_engine_command(cmd, conn, &ctx)?
    else {
        bail!("unexpected engine result for checkpoint");
    };
    session.save_files(&project.id, &files)?;

    println!("snapshot_id: {}", snapshot.id);
    println!("branch: {}", args.branch);
    println!("files: {}", snapshot.manifest.len());
    if let Some(description) = &snapshot.description {
        println!("description: {}", description);
    }
    Ok(())
}

pub fn execute_log(args: LogArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    for snapshot in list_snapshots(&session.conn, &session.cas, &project.id, &args.branch)? {
        println!(
            "{}  {}  ({} files)",
            snapshot.id,
            snapshot.message,
            snapshot.manifest.len()
        );
    }
    Ok(())
}

pub fn execute_restore(args: RestoreArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let publisher = session.publisher();

    let cmd = EngineCommand::Restore {
        project_id: project.id.clone(),
        branch: args.branch.clone(),
        snapshot_id: args.snapshot.clone(),
    };
    let (conn, ctx) = session.engine(&publisher);
    let EngineCommandResult::Restore(snapshot) = apply_engine_command(cmd, conn, &ctx)? else {
        bail!("unexpected engine result for restore");
    };

    // The working copy follows the branch to the restored state.
    let files = ManifestBuilder::materialize(&snapshot.manifest);
    session.save_files(&project.id, &files)?;

    println!("snapshot_id: {}", snapshot.id);
    println!("restored_from: {}", args.snapshot);
    println!("branch: {}", args.branch);
    Ok(())
}

pub fn execute_fork(args: ForkArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let publisher = session.publisher();

    let cmd = EngineCommand::Fork {
        project_id: project.id,
        from_snapshot_id: args.snapshot,
        new_branch: args.branch,
    };
    let (conn, ctx) = session.engine(&publisher);
    let EngineCommandResult::Fork(branch) = apply_engine_command(cmd, conn, &ctx)? else {
        bail!("unexpected engine result for fork");
    };

    println!("branch_id: {}", branch.id);
    println!("branch: {}", branch.name);
    println!("head: {}", branch.head_snapshot_id.unwrap_or_default());
    Ok(())
}

pub fn execute_branches(session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    for branch in list_branches(&session.conn, &project.id)? {
        println!(
            "{}  {}",
            branch.name,
            branch.head_snapshot_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn execute_diff(args: DiffArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let a = require_snapshot(&session.conn, &session.cas, &project.id, &args.a)?;
    let b = require_snapshot(&session.conn, &session.cas, &project.id, &args.b)?;

    let diff = compute_diff(&a.manifest, &b.manifest).map_err(ExError::from)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        print!("{}", render_human_summary(&diff));
    }
    Ok(())
}
