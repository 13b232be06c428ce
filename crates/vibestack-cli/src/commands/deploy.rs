//! Artifact and deployment commands

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use vibestack_core::errors::ExError;
use vibestack_core::{ArtifactBuilder, Deployment};
use vibestack_engine::commands::branch::require_snapshot;
use vibestack_engine::commands::deploy::list_deployments;
use vibestack_engine::{apply_engine_command, EngineCommand, EngineCommandResult};
use vibestack_store::db::now_ms;
use vibestack_store::repo::SqliteRepo;

use super::Session;

#[derive(Debug, Args)]
pub struct ArtifactArgs {
    pub snapshot: String,

    /// Write the script here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    pub snapshot: String,
}

#[derive(Debug, Args)]
pub struct DeploymentArgs {
    #[command(subcommand)]
    pub command: DeploymentCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeploymentCommand {
    /// Current state (a stale pending deployment is timed out)
    Status { id: String },
    /// Re-attempt a failed deployment
    Retry { id: String },
    /// Fail a pending deployment
    Cancel { id: String },
    /// Deployments of the project, newest first
    List,
}

pub fn execute_artifact(args: ArtifactArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let snapshot = require_snapshot(&session.conn, &session.cas, &project.id, &args.snapshot)?;
    let artifact = ArtifactBuilder::build(&snapshot.manifest);
    let script = artifact.render_script().map_err(ExError::from)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &script)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("artifact: {}", path.display());
            println!("digest: {}", artifact.digest().map_err(ExError::from)?);
            println!("routes: {}", artifact.len());
        }
        None => print!("{}", script),
    }
    Ok(())
}

pub fn execute_deploy(args: DeployArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let cmd = EngineCommand::Deploy {
        project_id: project.id,
        snapshot_id: args.snapshot,
    };
    let deployment = run_deployment_command(cmd, session)?;
    print_deployment(&deployment, session);
    deployment.into_result()?;
    Ok(())
}

pub fn execute_deployment(args: DeploymentArgs, session: &mut Session) -> anyhow::Result<()> {
    let cmd = match args.command {
        DeploymentCommand::List => {
            let project = session.project()?;
            for d in list_deployments(&session.conn, &project.id)? {
                println!(
                    "{}  {}  {}  {}",
                    d.id,
                    d.status,
                    d.snapshot_id,
                    d.url.as_deref().unwrap_or("-")
                );
            }
            return Ok(());
        }
        DeploymentCommand::Status { id } => EngineCommand::RefreshDeployment { deployment_id: id },
        DeploymentCommand::Retry { id } => EngineCommand::RetryDeployment { deployment_id: id },
        DeploymentCommand::Cancel { id } => EngineCommand::CancelDeployment { deployment_id: id },
    };

    // Deployment ids are global; with --project, refuse another project's.
    if let (Some(selected), Some(id)) = (session.explicit_project(), deployment_id(&cmd)) {
        if let Some(existing) = SqliteRepo::get_deployment(&session.conn, id)? {
            if existing.project_id != selected {
                bail!("deployment {} belongs to another project", id);
            }
        }
    }

    let deployment = run_deployment_command(cmd, session)?;
    print_deployment(&deployment, session);
    Ok(())
}

fn deployment_id(cmd: &EngineCommand) -> Option<&str> {
    match cmd {
        EngineCommand::RefreshDeployment { deployment_id }
        | EngineCommand::RetryDeployment { deployment_id }
        | EngineCommand::CancelDeployment { deployment_id } => Some(deployment_id),
        _ => None,
    }
}

fn run_deployment_command(cmd: EngineCommand, session: &mut Session) -> anyhow::Result<Deployment> {
    let publisher = session.publisher();
    let (conn, ctx) = session.engine(&publisher);
    match apply_engine_command(cmd, conn, &ctx)? {
        EngineCommandResult::Deployment(deployment) => Ok(deployment),
        _ => bail!("unexpected engine result for deployment command"),
    }
}

fn print_deployment(deployment: &Deployment, session: &Session) {
    let timeout_ms = session.config.deploy.pending_timeout_ms();
    println!("deployment_id: {}", deployment.id);
    println!(
        "status: {}",
        deployment.effective_status(now_ms(), timeout_ms)
    );
    println!("snapshot_id: {}", deployment.snapshot_id);
    println!("target: {}", deployment.target_name);
    if let Some(url) = &deployment.url {
        println!("url: {}", url);
    }
    if let Some(artifact_ref) = &deployment.artifact_ref {
        println!("artifact: {}", artifact_ref);
    }
    if let Some(message) = &deployment.error_message {
        println!("error: {}", message);
    }
}
