//! Wiring shared by the subcommands.

use anyhow::{Context, Result};
use backlog_core::audit::EventSink;
use backlog_core::config::BacklogConfig;
use backlog_infrastructure::{
    BacklogPaths, ConfigService, FanoutAuditSink, JsonlAuditSink, TomlWorkItemRepository,
    TracingAuditSink,
};
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppContext {
    pub paths: BacklogPaths,
    pub config_service: ConfigService,
}

impl AppContext {
    pub fn load(home: Option<PathBuf>) -> Result<Self> {
        let paths = BacklogPaths::new(home);
        let config_service =
            ConfigService::from_paths(&paths).context("Failed to locate the config directory")?;
        Ok(Self {
            paths,
            config_service,
        })
    }

    pub fn config(&self) -> Result<BacklogConfig> {
        self.config_service.get_config().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_service.path().display()
            )
        })
    }

    pub async fn repository(&self) -> Result<Arc<TomlWorkItemRepository>> {
        let path = self
            .paths
            .backlog_file()
            .context("Failed to locate the data directory")?;
        let repository = TomlWorkItemRepository::open(path.clone())
            .await
            .with_context(|| format!("Failed to open backlog at {}", path.display()))?;
        Ok(Arc::new(repository))
    }

    /// Audit events go to the log and to a JSON-lines file.
    pub fn audit_sink(&self, config: &BacklogConfig) -> Result<Arc<dyn EventSink>> {
        let log_file = match &config.audit.log_file {
            Some(path) => path.clone(),
            None => self
                .paths
                .audit_log_file()
                .context("Failed to locate the data directory")?,
        };
        tracing::debug!("[AppContext] Audit trail at {}", log_file.display());

        let sinks: Vec<Arc<dyn EventSink>> = vec![
            Arc::new(TracingAuditSink),
            Arc::new(JsonlAuditSink::new(log_file)),
        ];
        Ok(Arc::new(FanoutAuditSink::new(sinks)))
    }
}
