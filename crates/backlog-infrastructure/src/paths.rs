//! Path management for backlog configuration and data files.
//!
//! Platform directories come from the `dirs` crate (XDG on Linux, the
//! platform conventions elsewhere). A base directory override puts every file
//! under one root, which the CLI exposes as `--home` and tests use with a
//! temporary directory.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Cannot find the platform {0} directory")]
    DirNotFound(&'static str),
}

impl From<PathError> for backlog_core::BacklogError {
    fn from(e: PathError) -> Self {
        backlog_core::BacklogError::config(e.to_string())
    }
}

/// Resolves every file the backlog tool reads or writes.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/backlog/           # Config directory
/// └── config.toml              # BacklogConfig
///
/// ~/.local/share/backlog/      # Data directory
/// ├── backlog.toml             # Briefs and work items
/// └── audit.jsonl              # Default audit trail
/// ```
///
/// With a base override both trees collapse into `<base>/`.
#[derive(Debug, Clone, Default)]
pub struct BacklogPaths {
    base: Option<PathBuf>,
}

const APP_DIR: &str = "backlog";

impl BacklogPaths {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("config"))
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("data"))
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn backlog_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("backlog.toml"))
    }

    pub fn audit_log_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("audit.jsonl"))
    }
}
