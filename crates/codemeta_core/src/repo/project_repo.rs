//! Project registry contracts and SQLite implementation.
//!
//! # Responsibility
//! - Register project identities in the shared store.
//! - Resolve a config record id back to its registration.
//!
//! # Invariants
//! - The registry never stores a root directory.
//! - Ids are persisted in canonical hyphenated UUID form.

use crate::model::project::{ProjectId, ProjectRecord};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Store-side half of project identity.
pub trait ProjectRepository {
    /// Inserts one registration. Fails when the id already exists.
    fn register_project(&self, project: &ProjectRecord) -> RepoResult<()>;
    /// Looks up one registration by id.
    fn find_project(&self, id: ProjectId) -> RepoResult<Option<ProjectRecord>>;
    /// Removes one registration and, through the FK cascade, its notes.
    ///
    /// Returns whether a row was removed.
    fn unregister_project(&self, id: ProjectId) -> RepoResult<bool>;
}

/// SQLite-backed project registry.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn register_project(&self, project: &ProjectRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO projects (id, name) VALUES (?1, ?2);",
            params![project.id.to_string(), project.name.as_str()],
        )?;
        Ok(())
    }

    fn find_project(&self, id: ProjectId) -> RepoResult<Option<ProjectRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM projects WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let parsed = Uuid::parse_str(&id_text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{id_text}` in projects.id"))
            })?;
            return Ok(Some(ProjectRecord {
                id: parsed,
                name: row.get("name")?,
            }));
        }

        Ok(None)
    }

    fn unregister_project(&self, id: ProjectId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }
}
