//! Process-level settings resolved from the environment.
//!
//! # Responsibility
//! - Locate the shared note database and the log directory.
//! - Pick the log level.
//!
//! # Invariants
//! - Resolution never touches the filesystem; directories are created by
//!   `open_db` and `init_logging` on first use.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Data directory holding `resources/` and `logs/`.
pub const DATA_DIR_ENV: &str = "CODE_META_DIR";
/// Optional log level override.
pub const LOG_LEVEL_ENV: &str = "CODE_META_LOG_LEVEL";

const DB_RELATIVE_PATH: &str = "resources/sc_note.db";
const LOG_RELATIVE_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    MissingDataDir,
    RelativeDataDir(PathBuf),
    InvalidLogLevel(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDataDir => write!(f, "environment variable {DATA_DIR_ENV} is not set"),
            Self::RelativeDataDir(path) => write!(
                f,
                "{DATA_DIR_ENV} must be an absolute path, got `{}`",
                path.display()
            ),
            Self::InvalidLogLevel(message) => write!(f, "{LOG_LEVEL_ENV}: {message}"),
        }
    }
}

impl Error for SettingsError {}

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSettings {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: &'static str,
}

impl CoreSettings {
    /// Builds settings rooted at `data_dir`.
    pub fn with_data_dir(
        data_dir: impl AsRef<Path>,
        log_level: Option<&str>,
    ) -> Result<Self, SettingsError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_absolute() {
            return Err(SettingsError::RelativeDataDir(data_dir.to_path_buf()));
        }
        let log_level = match log_level {
            Some(level) => normalize_level(level).map_err(SettingsError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db_path: data_dir.join(DB_RELATIVE_PATH),
            log_dir: data_dir.join(LOG_RELATIVE_DIR),
            log_level,
        })
    }

    /// Reads `CODE_META_DIR` and `CODE_META_LOG_LEVEL`.
    pub fn from_env() -> Result<Self, SettingsError> {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|value| !value.is_empty())
            .ok_or(SettingsError::MissingDataDir)?;
        let level = std::env::var(LOG_LEVEL_ENV).ok();
        Self::with_data_dir(PathBuf::from(data_dir), level.as_deref())
    }
}
