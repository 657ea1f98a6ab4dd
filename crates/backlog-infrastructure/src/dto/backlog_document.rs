//! Storage rows for the backlog TOML document.
//!
//! Rows are flat: the ancestor chain is spread over one optional column per
//! level and `acceptance_criteria` is a JSON-encoded list, matching the shape
//! a relational store would use.

use backlog_core::error::{BacklogError, Result};
use backlog_core::hierarchy::{
    BusinessBrief, ItemKind, Lineage, Priority, WorkItem, WorkItemStatus,
};
use serde::{Deserialize, Serialize};

/// Current on-disk schema version.
pub const BACKLOG_DOCUMENT_VERSION: u32 = 1;

/// Root of `backlog.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogDocument {
    pub version: u32,
    #[serde(default)]
    pub briefs: Vec<BusinessBriefRow>,
    #[serde(default)]
    pub items: Vec<WorkItemRow>,
}

impl Default for BacklogDocument {
    fn default() -> Self {
        Self {
            version: BACKLOG_DOCUMENT_VERSION,
            briefs: Vec::new(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessBriefRow {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_objective: Option<String>,
    pub created_at: String,
}

impl From<&BusinessBrief> for BusinessBriefRow {
    fn from(brief: &BusinessBrief) -> Self {
        Self {
            id: brief.id.clone(),
            title: brief.title.clone(),
            description: brief.description.clone(),
            business_objective: brief.business_objective.clone(),
            created_at: brief.created_at.clone(),
        }
    }
}

impl From<BusinessBriefRow> for BusinessBrief {
    fn from(row: BusinessBriefRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            business_objective: row.business_objective,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRow {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// JSON array of strings.
    #[serde(default = "empty_json_list")]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub business_value: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub status: WorkItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_brief_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: String,
}

fn empty_json_list() -> String {
    "[]".to_string()
}

impl TryFrom<&WorkItem> for WorkItemRow {
    type Error = BacklogError;

    fn try_from(item: &WorkItem) -> Result<Self> {
        Ok(Self {
            id: item.id.clone(),
            kind: item.kind,
            title: item.title.clone(),
            description: item.description.clone(),
            acceptance_criteria: serde_json::to_string(&item.acceptance_criteria)?,
            priority: item.priority,
            business_value: item.business_value.clone(),
            rationale: item.rationale.clone(),
            tags: item.tags.clone(),
            labels: item.labels.clone(),
            story_points: item.story_points,
            estimated_effort: item.estimated_effort.clone(),
            status: item.status,
            business_brief_id: item.lineage.business_brief_id.clone(),
            initiative_id: item.lineage.initiative_id.clone(),
            feature_id: item.lineage.feature_id.clone(),
            epic_id: item.lineage.epic_id.clone(),
            source: item.source.clone(),
            created_at: item.created_at.clone(),
        })
    }
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = BacklogError;

    fn try_from(row: WorkItemRow) -> Result<Self> {
        let acceptance_criteria: Vec<String> = serde_json::from_str(&row.acceptance_criteria)
            .map_err(|e| {
                BacklogError::data_access(format!(
                    "row '{}' has invalid acceptance_criteria: {}",
                    row.id, e
                ))
            })?;

        Ok(Self {
            id: row.id,
            kind: row.kind,
            title: row.title,
            description: row.description,
            acceptance_criteria,
            priority: row.priority,
            business_value: row.business_value,
            rationale: row.rationale,
            tags: row.tags,
            labels: row.labels,
            story_points: row.story_points,
            estimated_effort: row.estimated_effort,
            status: row.status,
            lineage: Lineage {
                business_brief_id: row.business_brief_id,
                initiative_id: row.initiative_id,
                feature_id: row.feature_id,
                epic_id: row.epic_id,
            },
            source: row.source,
            created_at: row.created_at,
        })
    }
}
