//! Working-copy commands: `vibe file`, `vibe apply`, `vibe status`

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use vibestack_core::diff::{compute_diff, render_human_summary};
use vibestack_core::errors::ExError;
use vibestack_core::{parse_patch_response, Manifest, ManifestBuilder};
use vibestack_store::repo::SqliteRepo;
use vibestack_store::snapshot::get_snapshot;

use super::Session;

#[derive(Debug, Args)]
pub struct FileArgs {
    #[command(subcommand)]
    pub command: FileCommand,
}

#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Create or replace a file
    Put(PutArgs),
    /// Remove a file (no-op if absent)
    Rm { path: String },
    /// List files in working-copy order
    Ls,
    /// Print a file's content
    Cat { path: String },
}

#[derive(Debug, Args)]
pub struct PutArgs {
    pub path: String,

    /// Inline content
    #[arg(long, conflicts_with = "from", required_unless_present = "from")]
    pub content: Option<String>,

    /// Read content from a local file
    #[arg(long)]
    pub from: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// File holding the AI response text
    pub response: PathBuf,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long, default_value = "main")]
    pub branch: String,
}

pub fn execute(args: FileArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let mut files = session.load_files(&project.id)?;

    match args.command {
        FileCommand::Put(put) => {
            let content = match (put.content, put.from) {
                (Some(text), _) => text.into_bytes(),
                (None, Some(source)) => std::fs::read(&source)
                    .with_context(|| format!("cannot read {}", source.display()))?,
                (None, None) => bail!("pass --content or --from"),
            };
            files
                .upsert_detected(&put.path, content)
                .map_err(ExError::from)?;
            session.save_files(&project.id, &files)?;
        }
        FileCommand::Rm { path } => {
            if files.remove(&path) {
                session.save_files(&project.id, &files)?;
            }
        }
        FileCommand::Ls => {
            for entry in files.list() {
                println!(
                    "{}  {}  {} bytes",
                    entry.path,
                    entry.language.as_str(),
                    entry.content.len()
                );
            }
        }
        FileCommand::Cat { path } => {
            let Some(entry) = files.get(&path) else {
                bail!("no file at {}", path);
            };
            std::io::stdout().write_all(&entry.content)?;
        }
    }
    Ok(())
}

pub fn execute_apply(args: ApplyArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let text = std::fs::read_to_string(&args.response)
        .with_context(|| format!("cannot read {}", args.response.display()))?;
    let patches = parse_patch_response(&text).map_err(ExError::from)?;

    let mut files = session.load_files(&project.id)?;
    let applied = files.apply_patches(&patches).map_err(ExError::from)?;
    session.save_files(&project.id, &files)?;

    for patch in &patches {
        println!("patched: {}", patch.path);
    }
    println!("applied: {}", applied);
    Ok(())
}

pub fn execute_status(args: StatusArgs, session: &mut Session) -> anyhow::Result<()> {
    let project = session.project()?;
    let files = session.load_files(&project.id)?;
    let working = ManifestBuilder::build(&files);

    let head = SqliteRepo::get_branch_by_name(&session.conn, &project.id, &args.branch)?
        .and_then(|b| b.head_snapshot_id);
    let base = match head {
        Some(id) => get_snapshot(&session.conn, &session.cas, &id)?
            .map(|s| s.manifest)
            .unwrap_or_default(),
        None => Manifest::default(),
    };

    let diff = compute_diff(&base, &working).map_err(ExError::from)?;
    if diff.is_identical() {
        println!("clean: working copy matches {}", args.branch);
    } else {
        print!("{}", render_human_summary(&diff));
    }
    Ok(())
}
