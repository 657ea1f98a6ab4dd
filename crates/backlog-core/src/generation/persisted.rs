//! Results of committing reviewed candidates.

use crate::hierarchy::{ItemKind, Lineage};
use serde::{Deserialize, Serialize};

/// Outcome of a single candidate write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PersistOutcome {
    Success,
    Failure { reason: String },
}

/// The committed result of one kept decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedItem {
    pub candidate_id: String,
    /// Durable ID of the stored row; `None` when the write failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub item_type: ItemKind,
    pub title: String,
    pub lineage: Lineage,
    pub outcome: PersistOutcome,
}

impl PersistedItem {
    pub fn is_success(&self) -> bool {
        self.outcome == PersistOutcome::Success
    }
}

/// How a completed session should be presented to the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Every kept candidate was stored.
    AllSaved,
    /// Some kept candidates were stored, some failed.
    PartiallySaved,
    /// Candidates were kept but every write failed.
    NothingSaved,
    /// Every candidate was discarded; nothing was written.
    NothingKept,
}

/// Aggregate result of one persistence run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceReport {
    /// One entry per kept decision, in decision order.
    pub items: Vec<PersistedItem>,
    pub success_count: usize,
    pub error_count: usize,
    pub discarded_count: usize,
}

impl PersistenceReport {
    pub fn from_items(items: Vec<PersistedItem>, discarded_count: usize) -> Self {
        let success_count = items.iter().filter(|item| item.is_success()).count();
        let error_count = items.len() - success_count;
        Self {
            items,
            success_count,
            error_count,
            discarded_count,
        }
    }

    pub fn outcome(&self) -> SaveOutcome {
        match (self.success_count, self.error_count) {
            (0, 0) => SaveOutcome::NothingKept,
            (_, 0) => SaveOutcome::AllSaved,
            (0, _) => SaveOutcome::NothingSaved,
            _ => SaveOutcome::PartiallySaved,
        }
    }
}
