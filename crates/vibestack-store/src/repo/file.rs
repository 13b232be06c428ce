use rusqlite::Connection;
use vibestack_core::{FileSet, Language};

use super::SqliteRepo;
use crate::db::now_ms;
use crate::errors::{sqlite_error, Result};

impl SqliteRepo {
    /// Rebuild a project's working copy in stored position order
    ///
    /// The returned set is clean: nothing in it is unsaved.
    pub fn load_file_set(conn: &Connection, project_id: &str) -> Result<FileSet> {
        let mut stmt = conn
            .prepare(
                "SELECT path, content, language FROM files
                 WHERE project_id = ?1 ORDER BY position",
            )
            .map_err(|e| sqlite_error("load_file_set", e))?;
        let rows = stmt
            .query_map([project_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| sqlite_error("load_file_set", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sqlite_error("load_file_set", e))?;

        let mut files = FileSet::new();
        for (path, content, language) in rows {
            files.upsert(&path, content, Language::from_tag(&language))?;
        }
        files.mark_clean();
        Ok(files)
    }

    /// Replace a project's stored working copy with `files`
    ///
    /// Runs in its own transaction, so a reader sees either the old or the
    /// new working copy, never a mix.
    pub fn save_file_set(conn: &mut Connection, project_id: &str, files: &FileSet) -> Result<()> {
        let tx = conn
            .transaction()
            .map_err(|e| sqlite_error("save_file_set", e))?;

        tx.execute("DELETE FROM files WHERE project_id = ?1", [project_id])
            .map_err(|e| sqlite_error("save_file_set", e))?;

        let now = now_ms();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO files (project_id, path, position, content, language, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| sqlite_error("save_file_set", e))?;
            for (position, entry) in files.list().enumerate() {
                stmt.execute(rusqlite::params![
                    project_id,
                    entry.path,
                    position as i64,
                    entry.content,
                    entry.language.as_str(),
                    now,
                ])
                .map_err(|e| sqlite_error("save_file_set", e))?;
            }
        }

        tx.commit().map_err(|e| sqlite_error("save_file_set", e))?;
        Ok(())
    }
}
