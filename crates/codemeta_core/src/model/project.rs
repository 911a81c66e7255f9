//! Project identity model.
//!
//! # Responsibility
//! - Define the persisted config record and the session-scoped context.
//!
//! # Invariants
//! - `ProjectId` is generated once and never changes.
//! - `root_dir` lives only in `ProjectContext`; the shared store never sees it.

use crate::model::path::CanonicalPath;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier scoping every note of one project.
pub type ProjectId = Uuid;

/// Fixed file name marking a directory as a project root.
pub const CONFIG_FILE_NAME: &str = "s_config.json";

/// On-disk config record stored at the project root.
///
/// `id` stays a string on the wire so hand-edited files fail validation in
/// one place instead of inside serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub id: String,
    pub name: String,
}

/// Registration row kept in the shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
}

/// Immutable project scope handed to every component call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub project_id: ProjectId,
    pub name: String,
    pub root_dir: CanonicalPath,
}

impl ProjectContext {
    /// Path of this project's config record.
    pub fn config_path(&self) -> std::path::PathBuf {
        std::path::Path::new(self.root_dir.as_str()).join(CONFIG_FILE_NAME)
    }
}
