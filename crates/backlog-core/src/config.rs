//! Configuration model.
//!
//! Every field has a default so that an empty or partial `config.toml`
//! deserializes into a usable configuration.

use crate::error::{BacklogError, Result};
use crate::hierarchy::ItemKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BacklogConfig {
    pub generation: GenerationSettings,
    pub persistence: PersistenceSettings,
    pub audit: AuditSettings,
    pub generator: GeneratorSettings,
}

impl BacklogConfig {
    /// Rejects values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.generation.quantity_limits;
        for kind in [
            ItemKind::Initiative,
            ItemKind::Feature,
            ItemKind::Epic,
            ItemKind::Story,
        ] {
            if limits.max_for(kind) == 0 {
                return Err(BacklogError::config(format!(
                    "generation.quantity_limits for {} must be at least 1",
                    kind
                )));
            }
        }
        if self.persistence.max_concurrent_writes == 0 {
            return Err(BacklogError::config(
                "persistence.max_concurrent_writes must be at least 1",
            ));
        }
        if self.audit.channel_capacity == 0 {
            return Err(BacklogError::config(
                "audit.channel_capacity must be at least 1",
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(BacklogError::config("generator.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationSettings {
    pub quantity_limits: QuantityLimits,
    /// Finished sessions kept per owner.
    pub history_limit: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            quantity_limits: QuantityLimits::default(),
            history_limit: 20,
        }
    }
}

/// Maximum candidates per generation, by target type.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct QuantityLimits {
    pub initiative: u32,
    pub feature: u32,
    pub epic: u32,
    pub story: u32,
}

impl Default for QuantityLimits {
    fn default() -> Self {
        Self {
            initiative: 5,
            feature: 8,
            epic: 10,
            story: 15,
        }
    }
}

impl QuantityLimits {
    pub fn max_for(&self, target_type: ItemKind) -> u32 {
        match target_type {
            ItemKind::Initiative => self.initiative,
            ItemKind::Feature => self.feature,
            ItemKind::Epic => self.epic,
            ItemKind::Story => self.story,
            // Briefs are never generated
            ItemKind::BusinessBrief => 0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Upper bound on candidate writes in flight for one review.
    pub max_concurrent_writes: usize,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            max_concurrent_writes: 4,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AuditSettings {
    /// Events buffered before new ones are dropped.
    pub channel_capacity: usize,
    /// JSON-lines audit file; when unset, events only go to the log.
    pub log_file: Option<PathBuf>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            log_file: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeneratorSettings {
    pub model: Option<String>,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: 120,
        }
    }
}
