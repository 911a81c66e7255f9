//! Reconciliation engine.
//!
//! # Responsibility
//! - Classify a snapshot's file set against the note store.
//!
//! # Invariants
//! - `highlighted ∪ plain = snapshot`, `highlighted ∩ plain = ∅`.
//! - `dangling ∩ snapshot = ∅`.
//! - Exactly two store queries per run, independent of snapshot size.
//! - A failed query is an error, never an empty classification.

use crate::model::path::CanonicalPath;
use crate::model::project::ProjectId;
use crate::repo::note_repo::NoteStore;
use crate::repo::RepoError;
use crate::task::CancelToken;
use log::{error, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Three-way classification of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    /// Snapshot files with a non-empty note.
    pub highlighted: BTreeSet<CanonicalPath>,
    /// Snapshot files without a note.
    pub plain: BTreeSet<CanonicalPath>,
    /// Noted paths absent from the snapshot, in store insertion order.
    pub dangling: Vec<CanonicalPath>,
}

/// Reconciliation failure. Never confused with an empty result.
#[derive(Debug)]
pub enum ReconcileError {
    /// The store answered but the query failed.
    StoreQueryFailed(RepoError),
    /// The store could not be reached at all.
    StoreConnectionFailed(RepoError),
    /// Cancel token fired before the run finished.
    Cancelled,
}

impl ReconcileError {
    fn from_store(err: RepoError) -> Self {
        if err.is_connection_failure() {
            Self::StoreConnectionFailed(err)
        } else {
            Self::StoreQueryFailed(err)
        }
    }
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreQueryFailed(err) => write!(f, "note store query failed: {err}"),
            Self::StoreConnectionFailed(err) => write!(f, "note store unavailable: {err}"),
            Self::Cancelled => write!(f, "reconciliation cancelled"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreQueryFailed(err) | Self::StoreConnectionFailed(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

/// Classifies `snapshot` for `project_id`.
///
/// # Errors
/// - `StoreQueryFailed` / `StoreConnectionFailed` when either query fails.
/// - `Cancelled` when `cancel` fires between steps.
pub fn reconcile<S: NoteStore + ?Sized>(
    store: &S,
    project_id: ProjectId,
    snapshot: &BTreeSet<CanonicalPath>,
    cancel: &CancelToken,
) -> Result<Classification, ReconcileError> {
    let started_at = Instant::now();
    ensure_live(cancel)?;

    let noted = store
        .query_noted_subset(project_id, snapshot)
        .map_err(|err| log_failure("noted_subset", err))?;
    // Partition must hold even if the store over-reports.
    let highlighted: BTreeSet<CanonicalPath> = noted
        .into_iter()
        .filter(|path| snapshot.contains(path))
        .collect();
    let plain: BTreeSet<CanonicalPath> = snapshot.difference(&highlighted).cloned().collect();
    ensure_live(cancel)?;

    let mut seen = BTreeSet::new();
    let dangling: Vec<CanonicalPath> = store
        .query_noted_outside_set(project_id, snapshot)
        .map_err(|err| log_failure("noted_outside_set", err))?
        .into_iter()
        .filter(|path| !snapshot.contains(path) && seen.insert(path.clone()))
        .collect();
    ensure_live(cancel)?;

    info!(
        "event=reconcile module=service status=ok project_id={} snapshot={} highlighted={} plain={} dangling={} duration_ms={}",
        project_id,
        snapshot.len(),
        highlighted.len(),
        plain.len(),
        dangling.len(),
        started_at.elapsed().as_millis()
    );

    Ok(Classification {
        highlighted,
        plain,
        dangling,
    })
}

fn ensure_live(cancel: &CancelToken) -> Result<(), ReconcileError> {
    if cancel.is_cancelled() {
        info!("event=reconcile module=service status=cancelled");
        return Err(ReconcileError::Cancelled);
    }
    Ok(())
}

fn log_failure(query: &'static str, err: RepoError) -> ReconcileError {
    let mapped = ReconcileError::from_store(err);
    let error_code = match &mapped {
        ReconcileError::StoreConnectionFailed(_) => "store_connection_failed",
        _ => "store_query_failed",
    };
    error!(
        "event=reconcile module=service status=error query={} error_code={} error={}",
        query, error_code, mapped
    );
    mapped
}

#[cfg(test)]
mod tests {
    use super::{reconcile, ReconcileError};
    use crate::model::path::CanonicalPath;
    use crate::model::project::ProjectId;
    use crate::repo::note_repo::NoteStore;
    use crate::repo::{RepoError, RepoResult};
    use crate::task::CancelToken;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    /// In-memory store holding the non-empty noted set `N` in order.
    struct FakeStore {
        noted: Vec<CanonicalPath>,
        calls: Cell<usize>,
        fail_outside: bool,
    }

    impl FakeStore {
        fn new(noted: &[&str]) -> Self {
            Self {
                noted: noted.iter().map(|raw| path(raw)).collect(),
                calls: Cell::new(0),
                fail_outside: false,
            }
        }
    }

    impl NoteStore for FakeStore {
        fn query_noted_subset(
            &self,
            _project_id: ProjectId,
            candidates: &BTreeSet<CanonicalPath>,
        ) -> RepoResult<Vec<CanonicalPath>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self
                .noted
                .iter()
                .filter(|p| candidates.contains(*p))
                .cloned()
                .collect())
        }

        fn query_noted_outside_set(
            &self,
            _project_id: ProjectId,
            candidates: &BTreeSet<CanonicalPath>,
        ) -> RepoResult<Vec<CanonicalPath>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_outside {
                return Err(RepoError::InvalidData("boom".to_string()));
            }
            Ok(self
                .noted
                .iter()
                .filter(|p| !candidates.contains(*p))
                .cloned()
                .collect())
        }
    }

    fn path(raw: &str) -> CanonicalPath {
        CanonicalPath::parse(raw).unwrap()
    }

    fn set(raws: &[&str]) -> BTreeSet<CanonicalPath> {
        raws.iter().map(|raw| path(raw)).collect()
    }

    #[test]
    fn set_algebra_holds_with_two_queries() {
        let store = FakeStore::new(&["/r/c.txt", "/r/a.txt", "/r/sub/d.txt"]);
        let snapshot = set(&["/r/a.txt", "/r/b.txt", "/r/sub/d.txt", "/r/sub/e.txt"]);

        let result = reconcile(&store, Uuid::new_v4(), &snapshot, &CancelToken::new()).unwrap();

        assert_eq!(result.highlighted, set(&["/r/a.txt", "/r/sub/d.txt"]));
        assert_eq!(result.plain, set(&["/r/b.txt", "/r/sub/e.txt"]));
        assert_eq!(result.dangling, vec![path("/r/c.txt")]);
        assert_eq!(store.calls.get(), 2);

        let union: BTreeSet<_> = result.highlighted.union(&result.plain).cloned().collect();
        assert_eq!(union, snapshot);
        assert!(result.highlighted.is_disjoint(&result.plain));
        assert!(result.dangling.iter().all(|p| !snapshot.contains(p)));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let store = FakeStore::new(&["/r/a.txt", "/r/x.txt"]);
        let snapshot = set(&["/r/a.txt", "/r/b.txt"]);
        let project = Uuid::new_v4();
        let first = reconcile(&store, project, &snapshot, &CancelToken::new()).unwrap();
        let second = reconcile(&store, project, &snapshot, &CancelToken::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_snapshot_makes_every_note_dangling() {
        let store = FakeStore::new(&["/r/a.txt"]);
        let result =
            reconcile(&store, Uuid::new_v4(), &BTreeSet::new(), &CancelToken::new()).unwrap();
        assert!(result.highlighted.is_empty());
        assert!(result.plain.is_empty());
        assert_eq!(result.dangling, vec![path("/r/a.txt")]);
    }

    #[test]
    fn query_failure_is_an_error_not_an_empty_result() {
        let mut store = FakeStore::new(&["/r/a.txt"]);
        store.fail_outside = true;
        let err = reconcile(
            &store,
            Uuid::new_v4(),
            &set(&["/r/a.txt"]),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ReconcileError::StoreQueryFailed(_)));
    }

    #[test]
    fn cancelled_token_issues_no_queries() {
        let store = FakeStore::new(&[]);
        let token = CancelToken::new();
        token.cancel();
        let err = reconcile(&store, Uuid::new_v4(), &set(&["/r/a.txt"]), &token).unwrap_err();
        assert!(matches!(err, ReconcileError::Cancelled));
        assert_eq!(store.calls.get(), 0);
    }
}
