use rusqlite::{Connection, OptionalExtension, Row};
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::Project;

use super::SqliteRepo;
use crate::db::now_ms;
use crate::errors::{not_found, sqlite_error, Result};

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl SqliteRepo {
    /// Register a new project with a fresh UUIDv7 id
    pub fn create_project(conn: &Connection, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("create_project")
                .with_message("project name must not be empty"));
        }

        let project = Project {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.to_string(),
            created_at: now_ms(),
        };
        conn.execute(
            "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![project.id, project.name, project.created_at],
        )
        .map_err(|e| sqlite_error("create_project", e))?;

        Ok(project)
    }

    pub fn get_project(conn: &Connection, project_id: &str) -> Result<Option<Project>> {
        conn.query_row(
            "SELECT id, name, created_at FROM projects WHERE id = ?1",
            [project_id],
            row_to_project,
        )
        .optional()
        .map_err(|e| sqlite_error("get_project", e))
    }

    /// Fetch a project or fail with `NotFound` stamped with `op`
    pub fn require_project(conn: &Connection, project_id: &str, op: &str) -> Result<Project> {
        Self::get_project(conn, project_id)?.ok_or_else(|| {
            not_found(op, "project", project_id).with_project_id(project_id)
        })
    }

    /// All projects in creation order
    pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM projects ORDER BY rowid")
            .map_err(|e| sqlite_error("list_projects", e))?;
        let projects = stmt
            .query_map([], row_to_project)
            .map_err(|e| sqlite_error("list_projects", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sqlite_error("list_projects", e))?;
        Ok(projects)
    }
}
