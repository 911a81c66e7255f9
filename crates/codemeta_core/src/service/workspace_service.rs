//! Workspace open/refresh orchestration.
//!
//! # Responsibility
//! - Chain identity resolution, snapshot walk, reconciliation and view
//!   building into one unit of work.
//! - Run that unit off the caller's thread with last-started-wins semantics.
//!
//! # Invariants
//! - A failed project open issues no walk and no store queries.
//! - Each worker owns its own SQLite connection.
//! - Walk warnings travel with a successful view; they never fail it.

use crate::db::{open_db, DbError};
use crate::fs::walker::{walk_snapshot, WalkError, WalkWarning};
use crate::model::project::ProjectContext;
use crate::repo::note_repo::{NoteStore, SqliteNoteStore};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::RepoError;
use crate::service::project_service::{ProjectError, ProjectService};
use crate::service::reconcile_service::{reconcile, ReconcileError};
use crate::task::{CancelToken, ReconcileHandle, ReconcileScheduler};
use crate::view::{build_dangling_list, build_tree_model, DanglingList, DecoratedTree};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Everything the rendering layer needs after opening a project.
#[derive(Debug, Clone)]
pub struct WorkspaceView {
    pub context: ProjectContext,
    pub tree: DecoratedTree,
    pub dangling: DanglingList,
    pub warnings: Vec<WalkWarning>,
}

/// Failure of one orchestrated open or refresh.
#[derive(Debug)]
pub enum WorkspaceError {
    Project(ProjectError),
    Walk(WalkError),
    Reconcile(ReconcileError),
}

impl WorkspaceError {
    /// Returns whether the run was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Walk(WalkError::Cancelled) | Self::Reconcile(ReconcileError::Cancelled)
        )
    }
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(err) => write!(f, "{err}"),
            Self::Walk(err) => write!(f, "{err}"),
            Self::Reconcile(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Project(err) => Some(err),
            Self::Walk(err) => Some(err),
            Self::Reconcile(err) => Some(err),
        }
    }
}

impl From<ProjectError> for WorkspaceError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}

impl From<WalkError> for WorkspaceError {
    fn from(value: WalkError) -> Self {
        Self::Walk(value)
    }
}

impl From<ReconcileError> for WorkspaceError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

/// Walks, reconciles and builds views for an already resolved project.
pub fn scan_project<S: NoteStore + ?Sized>(
    store: &S,
    context: &ProjectContext,
    cancel: &CancelToken,
) -> Result<WorkspaceView, WorkspaceError> {
    let snapshot = walk_snapshot(Path::new(context.root_dir.as_str()), cancel)?;
    let classification = reconcile(store, context.project_id, &snapshot.files, cancel)?;

    Ok(WorkspaceView {
        context: context.clone(),
        tree: build_tree_model(&snapshot.tree, &classification.highlighted, &context.name),
        dangling: build_dangling_list(classification.dangling),
        warnings: snapshot.warnings,
    })
}

/// Opens the project at `config_path` and scans it.
pub fn load_workspace<P, S>(
    projects: P,
    store: &S,
    config_path: &Path,
    cancel: &CancelToken,
) -> Result<WorkspaceView, WorkspaceError>
where
    P: ProjectRepository,
    S: NoteStore + ?Sized,
{
    let context = ProjectService::new(projects).open_project(config_path)?;
    scan_project(store, &context, cancel)
}

/// Session facade owning the shared database location and scheduler.
#[derive(Debug, Clone)]
pub struct WorkspaceService {
    db_path: PathBuf,
    scheduler: ReconcileScheduler,
}

impl WorkspaceService {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            scheduler: ReconcileScheduler::new(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates a project and schedules its first scan.
    pub fn create(
        &self,
        root_dir: &Path,
        name: &str,
    ) -> Result<ReconcileHandle<WorkspaceView, WorkspaceError>, ProjectError> {
        let conn = open_db(&self.db_path).map_err(|err| ProjectError::Store(err.into()))?;
        let context =
            ProjectService::new(SqliteProjectRepository::new(&conn)).create_project(root_dir, name)?;
        Ok(self.refresh(context))
    }

    /// Resolves the project synchronously, then schedules its scan.
    ///
    /// Identity errors are returned before any work is scheduled.
    pub fn open(
        &self,
        config_path: &Path,
    ) -> Result<ReconcileHandle<WorkspaceView, WorkspaceError>, ProjectError> {
        let conn = open_db(&self.db_path).map_err(|err| ProjectError::Store(err.into()))?;
        let context =
            ProjectService::new(SqliteProjectRepository::new(&conn)).open_project(config_path)?;
        Ok(self.refresh(context))
    }

    /// Schedules a scan, cancelling any in-flight scan of the same project.
    pub fn refresh(&self, context: ProjectContext) -> ReconcileHandle<WorkspaceView, WorkspaceError> {
        let db_path = self.db_path.clone();
        self.scheduler.spawn(context.project_id, move |cancel| {
            let conn = open_db(&db_path).map_err(connection_failed)?;
            scan_project(&SqliteNoteStore::new(&conn), &context, cancel)
        })
    }

    /// Cancels the latest scan of a project, if any.
    pub fn cancel(&self, context: &ProjectContext) -> bool {
        self.scheduler.cancel(context.project_id)
    }

    /// Drops scheduling state for a project being closed.
    pub fn close(&self, context: &ProjectContext) {
        self.scheduler.forget(context.project_id);
    }
}

fn connection_failed(err: DbError) -> WorkspaceError {
    WorkspaceError::Reconcile(ReconcileError::StoreConnectionFailed(RepoError::Db(err)))
}
