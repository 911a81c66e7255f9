//! Note store gateway and SQLite implementation.
//!
//! # Responsibility
//! - Answer the two batched membership queries used by reconciliation.
//! - Provide editor-facing note writes keyed by `(project_id, file_path)`.
//!
//! # Invariants
//! - Each membership query is exactly one SQL statement regardless of how
//!   many candidate paths are passed; the set is bound via `rarray(?)`.
//! - A note counts only when its stored `plain_text` is non-empty.
//! - `file_path` is always stored in `CanonicalPath` form.

use crate::model::note::{extract_plain_text, NoteRecord};
use crate::model::path::CanonicalPath;
use crate::model::project::ProjectId;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::vtab::array::Array;
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Read contract consumed by the reconciliation engine.
pub trait NoteStore {
    /// Returns exactly the members of `candidates` that carry a non-empty
    /// note for `project_id`.
    fn query_noted_subset(
        &self,
        project_id: ProjectId,
        candidates: &BTreeSet<CanonicalPath>,
    ) -> RepoResult<Vec<CanonicalPath>>;

    /// Returns every non-empty noted path of `project_id` that is not in
    /// `candidates`, in insertion order.
    fn query_noted_outside_set(
        &self,
        project_id: ProjectId,
        candidates: &BTreeSet<CanonicalPath>,
    ) -> RepoResult<Vec<CanonicalPath>>;
}

/// Write contract used by the note editor shell.
pub trait NoteRepository {
    /// Creates or replaces the note at `(project_id, file_path)`.
    fn save_note(
        &self,
        project_id: ProjectId,
        file_path: &CanonicalPath,
        content: &str,
    ) -> RepoResult<NoteRecord>;
    /// Gets one note, empty or not.
    fn get_note(
        &self,
        project_id: ProjectId,
        file_path: &CanonicalPath,
    ) -> RepoResult<Option<NoteRecord>>;
    /// Deletes one note. Returns whether a row was removed.
    fn delete_note(&self, project_id: ProjectId, file_path: &CanonicalPath) -> RepoResult<bool>;
}

/// SQLite-backed note store.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_paths(
        &self,
        sql: &str,
        project_id: ProjectId,
        candidates: &BTreeSet<CanonicalPath>,
    ) -> RepoResult<Vec<CanonicalPath>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params![project_id.to_string(), path_array(candidates)])?;
        let mut paths = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            paths.push(parse_stored_path(&raw)?);
        }
        Ok(paths)
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn query_noted_subset(
        &self,
        project_id: ProjectId,
        candidates: &BTreeSet<CanonicalPath>,
    ) -> RepoResult<Vec<CanonicalPath>> {
        self.query_paths(
            "SELECT file_path
             FROM notes
             WHERE project_id = ?1
               AND length(plain_text) > 0
               AND file_path IN (SELECT value FROM rarray(?2))
             ORDER BY id ASC;",
            project_id,
            candidates,
        )
    }

    fn query_noted_outside_set(
        &self,
        project_id: ProjectId,
        candidates: &BTreeSet<CanonicalPath>,
    ) -> RepoResult<Vec<CanonicalPath>> {
        self.query_paths(
            "SELECT file_path
             FROM notes
             WHERE project_id = ?1
               AND length(plain_text) > 0
               AND file_path NOT IN (SELECT value FROM rarray(?2))
             ORDER BY id ASC;",
            project_id,
            candidates,
        )
    }
}

impl NoteRepository for SqliteNoteStore<'_> {
    fn save_note(
        &self,
        project_id: ProjectId,
        file_path: &CanonicalPath,
        content: &str,
    ) -> RepoResult<NoteRecord> {
        let plain_text = extract_plain_text(content);
        self.conn.execute(
            "INSERT INTO notes (project_id, file_path, content, plain_text)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (project_id, file_path) DO UPDATE SET
                content = excluded.content,
                plain_text = excluded.plain_text,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                project_id.to_string(),
                file_path.as_str(),
                content,
                plain_text
            ],
        )?;

        self.get_note(project_id, file_path)?.ok_or_else(|| {
            RepoError::InvalidData(format!("saved note for `{file_path}` missing in read-back"))
        })
    }

    fn get_note(
        &self,
        project_id: ProjectId,
        file_path: &CanonicalPath,
    ) -> RepoResult<Option<NoteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, content, plain_text, updated_at
             FROM notes
             WHERE project_id = ?1 AND file_path = ?2;",
        )?;
        let mut rows = stmt.query(params![project_id.to_string(), file_path.as_str()])?;
        if let Some(row) = rows.next()? {
            let raw: String = row.get("file_path")?;
            return Ok(Some(NoteRecord {
                project_id,
                file_path: parse_stored_path(&raw)?,
                content: row.get("content")?,
                plain_text: row.get("plain_text")?,
                updated_at: row.get("updated_at")?,
            }));
        }

        Ok(None)
    }

    fn delete_note(&self, project_id: ProjectId, file_path: &CanonicalPath) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM notes WHERE project_id = ?1 AND file_path = ?2;",
            params![project_id.to_string(), file_path.as_str()],
        )?;
        Ok(changed > 0)
    }
}

fn path_array(candidates: &BTreeSet<CanonicalPath>) -> Array {
    Rc::new(
        candidates
            .iter()
            .map(|path| Value::Text(path.as_str().to_string()))
            .collect(),
    )
}

fn parse_stored_path(raw: &str) -> RepoResult<CanonicalPath> {
    let parsed = CanonicalPath::parse(raw).map_err(|err| {
        RepoError::InvalidData(format!("invalid path `{raw}` in notes.file_path: {err}"))
    })?;
    if parsed.as_str() != raw {
        return Err(RepoError::InvalidData(format!(
            "non-canonical path `{raw}` in notes.file_path"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::{NoteRepository, NoteStore, SqliteNoteStore};
    use crate::db::open_db_in_memory;
    use crate::model::path::CanonicalPath;
    use crate::model::project::ProjectRecord;
    use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
    use crate::repo::RepoError;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn path(raw: &str) -> CanonicalPath {
        CanonicalPath::parse(raw).unwrap()
    }

    fn register(conn: &rusqlite::Connection) -> Uuid {
        let id = Uuid::new_v4();
        SqliteProjectRepository::new(conn)
            .register_project(&ProjectRecord {
                id,
                name: "p".to_string(),
            })
            .unwrap();
        id
    }

    #[test]
    fn save_note_upserts_and_derives_plain_text() {
        let conn = open_db_in_memory().unwrap();
        let project = register(&conn);
        let store = SqliteNoteStore::new(&conn);

        let first = store
            .save_note(project, &path("/p/a.txt"), "<p>&nbsp;</p>")
            .unwrap();
        assert!(first.is_empty());

        let second = store
            .save_note(project, &path("/p/a.txt"), "<p>real text</p>")
            .unwrap();
        assert_eq!(second.plain_text, "real text");
        assert!(!second.is_empty());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn save_note_requires_registered_project() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteNoteStore::new(&conn);
        let err = store
            .save_note(Uuid::new_v4(), &path("/p/a.txt"), "text")
            .unwrap_err();
        assert!(matches!(err, RepoError::Db(_)));
    }

    #[test]
    fn membership_queries_are_scoped_by_project_and_skip_empty_notes() {
        let conn = open_db_in_memory().unwrap();
        let project = register(&conn);
        let other = register(&conn);
        let store = SqliteNoteStore::new(&conn);

        store.save_note(project, &path("/p/a.txt"), "note a").unwrap();
        store.save_note(project, &path("/p/blank.txt"), "   ").unwrap();
        store.save_note(project, &path("/p/gone.txt"), "note gone").unwrap();
        store.save_note(other, &path("/p/b.txt"), "other project").unwrap();

        let candidates: BTreeSet<_> = [path("/p/a.txt"), path("/p/b.txt"), path("/p/blank.txt")]
            .into_iter()
            .collect();

        let subset = store.query_noted_subset(project, &candidates).unwrap();
        assert_eq!(subset, vec![path("/p/a.txt")]);

        let outside = store.query_noted_outside_set(project, &candidates).unwrap();
        assert_eq!(outside, vec![path("/p/gone.txt")]);
    }

    #[test]
    fn empty_candidate_set_returns_all_notes_as_outside() {
        let conn = open_db_in_memory().unwrap();
        let project = register(&conn);
        let store = SqliteNoteStore::new(&conn);
        store.save_note(project, &path("/p/z.txt"), "z").unwrap();
        store.save_note(project, &path("/p/a.txt"), "a").unwrap();

        let empty = BTreeSet::new();
        assert!(store.query_noted_subset(project, &empty).unwrap().is_empty());
        assert_eq!(
            store.query_noted_outside_set(project, &empty).unwrap(),
            vec![path("/p/z.txt"), path("/p/a.txt")]
        );
    }

    #[test]
    fn delete_note_reports_whether_row_existed() {
        let conn = open_db_in_memory().unwrap();
        let project = register(&conn);
        let store = SqliteNoteStore::new(&conn);
        store.save_note(project, &path("/p/a.txt"), "a").unwrap();

        assert!(store.delete_note(project, &path("/p/a.txt")).unwrap());
        assert!(!store.delete_note(project, &path("/p/a.txt")).unwrap());
        assert_eq!(store.get_note(project, &path("/p/a.txt")).unwrap(), None);
    }
}
