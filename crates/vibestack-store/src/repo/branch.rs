use rusqlite::{Connection, OptionalExtension, Row};
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::Branch;

use super::SqliteRepo;
use crate::db::now_ms;
use crate::errors::{sqlite_error, Result};

const BRANCH_COLUMNS: &str = "id, project_id, name, head_snapshot_id, created_at";

fn row_to_branch(row: &Row<'_>) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        head_snapshot_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn validate_branch_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if valid {
        Ok(())
    } else {
        Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("insert_branch")
            .with_branch(name)
            .with_message("branch names use letters, digits, '-', '_', '.', '/'"))
    }
}

fn branch_exists(project_id: &str, name: &str) -> ExError {
    ExError::new(ExErrorKind::Conflict)
        .with_op("insert_branch")
        .with_project_id(project_id)
        .with_branch(name)
        .with_message("branch already exists")
}

impl SqliteRepo {
    pub fn get_branch(conn: &Connection, branch_id: &str) -> Result<Option<Branch>> {
        conn.query_row(
            &format!("SELECT {} FROM branches WHERE id = ?1", BRANCH_COLUMNS),
            [branch_id],
            row_to_branch,
        )
        .optional()
        .map_err(|e| sqlite_error("get_branch", e))
    }

    pub fn get_branch_by_name(
        conn: &Connection,
        project_id: &str,
        name: &str,
    ) -> Result<Option<Branch>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM branches WHERE project_id = ?1 AND name = ?2",
                BRANCH_COLUMNS
            ),
            [project_id, name],
            row_to_branch,
        )
        .optional()
        .map_err(|e| sqlite_error("get_branch_by_name", e))
    }

    /// Branches of a project in creation order
    pub fn list_branches(conn: &Connection, project_id: &str) -> Result<Vec<Branch>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM branches WHERE project_id = ?1 ORDER BY rowid",
                BRANCH_COLUMNS
            ))
            .map_err(|e| sqlite_error("list_branches", e))?;
        let branches = stmt
            .query_map([project_id], row_to_branch)
            .map_err(|e| sqlite_error("list_branches", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sqlite_error("list_branches", e))?;
        Ok(branches)
    }

    /// Create a branch, optionally pointing at an initial head
    ///
    /// A taken name is reported before the head is looked at, so a fork onto
    /// an existing branch is a `Conflict` whatever snapshot it names.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed name
    /// - `Conflict` if the project already has a branch with this name
    /// - `NotFound` if `head_snapshot_id` does not belong to the project
    pub fn insert_branch(
        conn: &Connection,
        project_id: &str,
        name: &str,
        head_snapshot_id: Option<&str>,
    ) -> Result<Branch> {
        validate_branch_name(name)?;
        if Self::get_branch_by_name(conn, project_id, name)?.is_some() {
            return Err(branch_exists(project_id, name));
        }

        if let Some(head) = head_snapshot_id {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT project_id FROM snapshots WHERE id = ?1",
                    [head],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| sqlite_error("insert_branch", e))?;
            if owner.as_deref() != Some(project_id) {
                return Err(ExError::new(ExErrorKind::NotFound)
                    .with_op("insert_branch")
                    .with_entity_id(head)
                    .with_project_id(project_id)
                    .with_message("snapshot not found in project"));
            }
        }

        let now = now_ms();
        let branch = Branch {
            id: uuid::Uuid::now_v7().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            head_snapshot_id: head_snapshot_id.map(str::to_string),
            created_at: now,
        };

        conn.execute(
            "INSERT INTO branches (id, project_id, name, head_snapshot_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                branch.id,
                branch.project_id,
                branch.name,
                branch.head_snapshot_id,
                now,
                now
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref f, _)
                if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                branch_exists(project_id, name)
            }
            other => sqlite_error("insert_branch", other),
        })?;

        Ok(branch)
    }

    /// Look a branch up by name, creating it with no head if absent
    pub fn get_or_create_branch(conn: &Connection, project_id: &str, name: &str) -> Result<Branch> {
        match Self::get_branch_by_name(conn, project_id, name)? {
            Some(branch) => Ok(branch),
            None => {
                let branch = Self::insert_branch(conn, project_id, name, None)?;
                tracing::debug!(project_id, branch = name, "Created branch implicitly");
                Ok(branch)
            }
        }
    }

    /// Move a branch head from `expected` to `new_head` in one conditional update
    ///
    /// # Errors
    ///
    /// Returns `HeadMismatch` if the stored head is not `expected` (another
    /// writer moved it first).
    pub fn compare_and_set_head(
        conn: &Connection,
        branch_id: &str,
        expected: Option<&str>,
        new_head: &str,
    ) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE branches SET head_snapshot_id = ?1, updated_at = ?2
                 WHERE id = ?3 AND head_snapshot_id IS ?4",
                rusqlite::params![new_head, now_ms(), branch_id, expected],
            )
            .map_err(|e| sqlite_error("compare_and_set_head", e))?;

        if updated == 0 {
            return Err(ExError::new(ExErrorKind::HeadMismatch)
                .with_op("compare_and_set_head")
                .with_entity_id(branch_id)
                .with_message(format!(
                    "branch head is no longer {}",
                    expected.unwrap_or("<none>")
                )));
        }
        Ok(())
    }
}
