//! Core domain logic for Code Meta: per-file notes inside a project tree.
//! This crate owns identity, snapshot, reconciliation and view invariants.

pub mod db;
pub mod fs;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;
pub mod task;
pub mod view;

pub use fs::walker::{walk_snapshot, ShapeNode, Snapshot, TreeShape, WalkError, WalkWarning};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{extract_plain_text, NoteRecord};
pub use model::path::{CanonicalPath, PathError};
pub use model::project::{ConfigRecord, ProjectContext, ProjectId, ProjectRecord, CONFIG_FILE_NAME};
pub use repo::note_repo::{NoteRepository, NoteStore, SqliteNoteStore};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::{RepoError, RepoResult};
pub use service::project_service::{config_path_in, ProjectError, ProjectService};
pub use service::reconcile_service::{reconcile, Classification, ReconcileError};
pub use service::workspace_service::{
    load_workspace, scan_project, WorkspaceError, WorkspaceService, WorkspaceView,
};
pub use settings::{CoreSettings, SettingsError};
pub use task::{CancelToken, ReconcileHandle, ReconcileScheduler, TaskOutcome};
pub use view::{build_dangling_list, build_tree_model, DanglingList, DecoratedNode, DecoratedTree};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
