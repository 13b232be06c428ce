//! Subcommand implementations and the store session they share.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Args;
use rusqlite::Connection;
use vibestack_core::{FileSet, Project};
use vibestack_engine::commands::deploy::DirectoryPublisher;
use vibestack_engine::{EngineConfig, EngineContext, RequestContext, RequestId};
use vibestack_store::cas::FsStore;
use vibestack_store::db::open_store;
use vibestack_store::repo::SqliteRepo;

pub mod deploy;
pub mod file;
pub mod history;
pub mod project;

/// Flags accepted by every subcommand
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Project id; may be omitted when the store holds exactly one project
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// SQLite database (overrides the configuration file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Blob store directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub cas: Option<PathBuf>,

    /// Configuration file; a missing file means defaults
    #[arg(long, global = true, default_value = "vibestack.toml")]
    pub config: PathBuf,

    /// Correlation id for this invocation's engine commands (default: fresh)
    #[arg(long, global = true)]
    pub request_id: Option<String>,
}

/// An opened store plus the resolved configuration
pub struct Session {
    pub config: EngineConfig,
    pub conn: Connection,
    pub cas: FsStore,
    project: Option<String>,
    request: RequestContext,
}

impl Session {
    pub fn open(global: &GlobalArgs, config: EngineConfig) -> anyhow::Result<Self> {
        let db_path = global
            .db
            .clone()
            .unwrap_or_else(|| config.store.db_path.clone());
        let cas_dir = global
            .cas
            .clone()
            .unwrap_or_else(|| config.store.cas_dir.clone());

        let conn = open_store(&db_path)
            .with_context(|| format!("cannot open store at {}", db_path.display()))?;
        tracing::debug!(db = %db_path.display(), cas = %cas_dir.display(), "Opened store");

        Ok(Self {
            config,
            conn,
            cas: FsStore::new(cas_dir),
            project: global.project.clone(),
            request: global
                .request_id
                .clone()
                .map(|id| RequestContext::with_request_id(RequestId::from_string(id)))
                .unwrap_or_default(),
        })
    }

    /// Project id passed with `--project`, if any
    pub fn explicit_project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// The project this invocation works on
    pub fn project(&self) -> anyhow::Result<Project> {
        if let Some(id) = &self.project {
            return Ok(SqliteRepo::require_project(&self.conn, id, "select_project")?);
        }
        let mut projects = SqliteRepo::list_projects(&self.conn)?;
        match projects.len() {
            1 => Ok(projects.remove(0)),
            0 => Err(anyhow!("no projects yet; run `vibe project create <name>`")),
            n => Err(anyhow!("{} projects in this store; pass --project <id>", n)),
        }
    }

    pub fn load_files(&self, project_id: &str) -> anyhow::Result<FileSet> {
        Ok(SqliteRepo::load_file_set(&self.conn, project_id)?)
    }

    pub fn save_files(&mut self, project_id: &str, files: &FileSet) -> anyhow::Result<()> {
        Ok(SqliteRepo::save_file_set(&mut self.conn, project_id, files)?)
    }

    pub fn publisher(&self) -> DirectoryPublisher {
        DirectoryPublisher::from_config(&self.config.deploy)
    }

    /// Split borrow: the connection mutably, the engine context shared
    pub fn engine<'a>(
        &'a mut self,
        publisher: &'a DirectoryPublisher,
    ) -> (&'a mut Connection, EngineContext<'a>) {
        (
            &mut self.conn,
            EngineContext {
                cas: &self.cas,
                publisher,
                deploy: &self.config.deploy,
                request: &self.request,
            },
        )
    }
}
