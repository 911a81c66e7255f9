//! Project identity use-case service.
//!
//! # Responsibility
//! - Create a project: register identity in the store, write the config record.
//! - Open a project: read the config record and resolve its registration.
//!
//! # Invariants
//! - A directory holds at most one config record, named `s_config.json`.
//! - A failed config write leaves no registration behind (best-effort
//!   rollback, logged on failure).
//! - `open_project` performs no writes.

use crate::model::path::CanonicalPath;
use crate::model::project::{
    ConfigRecord, ProjectContext, ProjectRecord, CONFIG_FILE_NAME,
};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoError;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identity-layer errors. All are recoverable by retrying elsewhere.
#[derive(Debug)]
pub enum ProjectError {
    /// Project name is blank after trim.
    InvalidName,
    /// Root directory cannot be normalized.
    InvalidRoot(String),
    /// Target directory already holds a config record.
    ConfigAlreadyExists(PathBuf),
    /// No config record at the given path.
    ConfigMissing(PathBuf),
    /// Wrong file name, unparsable JSON, or malformed fields.
    ConfigInvalid { path: PathBuf, reason: String },
    /// Config record could not be written after registration.
    ConfigWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config id has no registration in the store.
    ProjectNotFound(Uuid),
    /// Store failure during registration or lookup.
    Store(RepoError),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "project name must not be blank"),
            Self::InvalidRoot(reason) => write!(f, "invalid project root: {reason}"),
            Self::ConfigAlreadyExists(path) => write!(
                f,
                "the selected directory already contains a configuration file: {}",
                path.display()
            ),
            Self::ConfigMissing(path) => {
                write!(f, "configuration file not found: {}", path.display())
            }
            Self::ConfigInvalid { path, reason } => write!(
                f,
                "invalid configuration file {}: {reason}",
                path.display()
            ),
            Self::ConfigWriteFailed { path, source } => write!(
                f,
                "failed to create configuration file {}: {source}",
                path.display()
            ),
            Self::ProjectNotFound(id) => write!(f, "project not registered: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConfigWriteFailed { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Project identity manager over a registry implementation.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a new project rooted at `root_dir`.
    ///
    /// # Errors
    /// - `InvalidName` for a blank name.
    /// - `ConfigAlreadyExists` when `root_dir` is already a project.
    /// - `Store` when registration fails.
    /// - `ConfigWriteFailed` when the record cannot be written; the
    ///   registration is rolled back first.
    pub fn create_project(
        &self,
        root_dir: &Path,
        name: &str,
    ) -> Result<ProjectContext, ProjectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProjectError::InvalidName);
        }
        let root = normalize_root(root_dir)?;
        let config_path = root_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            info!("event=project_create module=service status=rejected error_code=config_exists");
            return Err(ProjectError::ConfigAlreadyExists(config_path));
        }

        let record = ProjectRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.repo.register_project(&record)?;

        if let Err(err) = write_config(&config_path, &record) {
            self.rollback_registration(record.id);
            return Err(match err.kind() {
                ErrorKind::AlreadyExists => ProjectError::ConfigAlreadyExists(config_path),
                _ => {
                    error!(
                        "event=project_create module=service status=error project_id={} error_code=config_write_failed error={}",
                        record.id, err
                    );
                    ProjectError::ConfigWriteFailed {
                        path: config_path,
                        source: err,
                    }
                }
            });
        }

        info!(
            "event=project_create module=service status=ok project_id={}",
            record.id
        );
        Ok(ProjectContext {
            project_id: record.id,
            name: record.name,
            root_dir: root,
        })
    }

    /// Opens the project described by `config_path`.
    ///
    /// # Errors
    /// - `ConfigMissing` when the file does not exist.
    /// - `ConfigInvalid` for a wrong file name or malformed content.
    /// - `ProjectNotFound` when the id is not registered.
    pub fn open_project(&self, config_path: &Path) -> Result<ProjectContext, ProjectError> {
        let config = read_config(config_path)?;
        let invalid = |reason: String| ProjectError::ConfigInvalid {
            path: config_path.to_path_buf(),
            reason,
        };

        let id = Uuid::parse_str(config.id.trim())
            .map_err(|err| invalid(format!("`id` is not a valid identifier: {err}")))?;
        let registered = self.repo.find_project(id)?.ok_or_else(|| {
            warn!(
                "event=project_open module=service status=rejected project_id={} error_code=project_not_found",
                id
            );
            ProjectError::ProjectNotFound(id)
        })?;

        let root_dir = config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let root = normalize_root(root_dir)?;

        info!(
            "event=project_open module=service status=ok project_id={}",
            registered.id
        );
        Ok(ProjectContext {
            project_id: registered.id,
            name: config.name,
            root_dir: root,
        })
    }

    fn rollback_registration(&self, id: Uuid) {
        match self.repo.unregister_project(id) {
            Ok(_) => info!(
                "event=project_create_rollback module=service status=ok project_id={}",
                id
            ),
            Err(err) => error!(
                "event=project_create_rollback module=service status=error project_id={} error={}",
                id, err
            ),
        }
    }
}

/// Returns the config record path inside `root_dir`.
pub fn config_path_in(root_dir: &Path) -> PathBuf {
    root_dir.join(CONFIG_FILE_NAME)
}

fn normalize_root(root_dir: &Path) -> Result<CanonicalPath, ProjectError> {
    let absolute =
        std::path::absolute(root_dir).map_err(|err| ProjectError::InvalidRoot(err.to_string()))?;
    CanonicalPath::from_path(absolute).map_err(|err| ProjectError::InvalidRoot(err.to_string()))
}

fn write_config(config_path: &Path, record: &ProjectRecord) -> std::io::Result<()> {
    let body = serde_json::to_vec(&ConfigRecord {
        id: record.id.to_string(),
        name: record.name.clone(),
    })?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(config_path)?;
    file.write_all(&body)?;
    file.sync_all()
}

fn read_config(config_path: &Path) -> Result<ConfigRecord, ProjectError> {
    if !config_path.is_file() {
        return Err(ProjectError::ConfigMissing(config_path.to_path_buf()));
    }
    let invalid = |reason: String| ProjectError::ConfigInvalid {
        path: config_path.to_path_buf(),
        reason,
    };

    let file_name = config_path.file_name().and_then(|name| name.to_str());
    if file_name != Some(CONFIG_FILE_NAME) {
        return Err(invalid(format!("expected a file named `{CONFIG_FILE_NAME}`")));
    }

    let bytes = std::fs::read(config_path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ProjectError::ConfigMissing(config_path.to_path_buf()),
        _ => invalid(err.to_string()),
    })?;
    let record: ConfigRecord =
        serde_json::from_slice(&bytes).map_err(|err| invalid(err.to_string()))?;
    if record.name.trim().is_empty() {
        return Err(invalid("`name` must not be blank".to_string()));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::read_config;
    use super::ProjectError;
    use std::fs;

    #[test]
    fn read_config_rejects_wrong_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        fs::write(&path, r#"{"id":"x","name":"y"}"#).unwrap();
        assert!(matches!(
            read_config(&path),
            Err(ProjectError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn read_config_rejects_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s_config.json");
        fs::write(&path, r#"{"id":"x"}"#).unwrap();
        assert!(matches!(
            read_config(&path),
            Err(ProjectError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn read_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_config(&dir.path().join("s_config.json")),
            Err(ProjectError::ConfigMissing(_))
        ));
    }
}
