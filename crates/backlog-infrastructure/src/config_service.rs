//! Configuration service implementation.
//!
//! Loads `BacklogConfig` from `config.toml` (by default
//! `~/.config/backlog/config.toml`) and caches it.

use crate::paths::BacklogPaths;
use crate::storage::AtomicTomlFile;
use backlog_core::config::BacklogConfig;
use backlog_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads, validates and caches the configuration.
///
/// A missing file yields the defaults; a file that fails to parse or
/// validate is an error rather than a silent fallback.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration; `None` until first access or after invalidation.
    config: Arc<RwLock<Option<BacklogConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service reading `config.toml` from the resolved config directory.
    pub fn from_paths(paths: &BacklogPaths) -> Result<Self> {
        Ok(Self::new(paths.config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<BacklogConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load()?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Writes the default configuration if no file exists yet.
    ///
    /// Returns `true` when a file was created.
    pub fn write_default_if_missing(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        AtomicTomlFile::<BacklogConfig>::new(self.path.clone()).save(&BacklogConfig::default())?;
        tracing::info!(
            "[ConfigService] Wrote default configuration to {}",
            self.path.display()
        );
        Ok(true)
    }

    fn load(&self) -> Result<BacklogConfig> {
        let config = match AtomicTomlFile::<BacklogConfig>::new(self.path.clone()).load()? {
            Some(config) => config,
            None => {
                tracing::debug!(
                    "[ConfigService] No configuration at {}, using defaults",
                    self.path.display()
                );
                BacklogConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }
}
