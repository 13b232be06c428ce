//! `vibe project` - project registry

use clap::{Args, Subcommand};
use vibestack_store::repo::SqliteRepo;

use super::Session;

#[derive(Debug, Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Register a new project and print its id
    Create { name: String },
    /// List projects, oldest first
    Ls,
}

pub fn execute(args: ProjectArgs, session: &mut Session) -> anyhow::Result<()> {
    match args.command {
        ProjectCommand::Create { name } => {
            let project = SqliteRepo::create_project(&session.conn, &name)?;
            println!("project_id: {}", project.id);
            println!("name: {}", project.name);
        }
        ProjectCommand::Ls => {
            for project in SqliteRepo::list_projects(&session.conn)? {
                println!("{}  {}", project.id, project.name);
            }
        }
    }
    Ok(())
}
