//! Hierarchy domain model.
//!
//! The backlog is a strict tree: a `BusinessBrief` at the root, then
//! Initiatives, Features, Epics and Stories, each with exactly one parent at
//! the next level up.

use crate::error::{BacklogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The level of a node in the backlog hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    BusinessBrief,
    Initiative,
    Feature,
    Epic,
    Story,
}

impl ItemKind {
    /// All kinds, root first.
    pub const ALL: [ItemKind; 5] = [
        ItemKind::BusinessBrief,
        ItemKind::Initiative,
        ItemKind::Feature,
        ItemKind::Epic,
        ItemKind::Story,
    ];

    /// The kind one level up, or `None` for the root.
    pub fn parent(self) -> Option<ItemKind> {
        match self {
            ItemKind::BusinessBrief => None,
            ItemKind::Initiative => Some(ItemKind::BusinessBrief),
            ItemKind::Feature => Some(ItemKind::Initiative),
            ItemKind::Epic => Some(ItemKind::Feature),
            ItemKind::Story => Some(ItemKind::Epic),
        }
    }

    /// The kind one level down, or `None` for stories.
    pub fn child(self) -> Option<ItemKind> {
        match self {
            ItemKind::BusinessBrief => Some(ItemKind::Initiative),
            ItemKind::Initiative => Some(ItemKind::Feature),
            ItemKind::Feature => Some(ItemKind::Epic),
            ItemKind::Epic => Some(ItemKind::Story),
            ItemKind::Story => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::BusinessBrief => "BusinessBrief",
            ItemKind::Initiative => "Initiative",
            ItemKind::Feature => "Feature",
            ItemKind::Epic => "Epic",
            ItemKind::Story => "Story",
        }
    }

    /// Status given to rows committed from a review.
    ///
    /// Reviewed items are past the draft stage: initiatives enter planning,
    /// everything below enters the backlog.
    pub fn committed_status(self) -> WorkItemStatus {
        match self {
            ItemKind::Initiative => WorkItemStatus::Planning,
            _ => WorkItemStatus::Backlog,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = BacklogError;

    /// Accepts `BusinessBrief`, `business_brief`, `business-brief` and any casing.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "businessbrief" | "brief" => Ok(ItemKind::BusinessBrief),
            "initiative" => Ok(ItemKind::Initiative),
            "feature" => Ok(ItemKind::Feature),
            "epic" => Ok(ItemKind::Epic),
            "story" => Ok(ItemKind::Story),
            _ => Err(BacklogError::invalid_request(format!(
                "Unknown item type '{}'",
                s
            ))),
        }
    }
}

/// The only (parent, target) pairs a generation may use.
pub const LEGAL_EDGES: [(ItemKind, ItemKind); 4] = [
    (ItemKind::BusinessBrief, ItemKind::Initiative),
    (ItemKind::Initiative, ItemKind::Feature),
    (ItemKind::Feature, ItemKind::Epic),
    (ItemKind::Epic, ItemKind::Story),
];

/// A validated (parent type → target type) pair.
///
/// Fields are private: the only way to obtain a value is [`GenerationEdge::new`],
/// which checks the pair against [`LEGAL_EDGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEdge {
    parent_type: ItemKind,
    target_type: ItemKind,
}

impl GenerationEdge {
    pub fn new(parent_type: ItemKind, target_type: ItemKind) -> Result<Self> {
        if LEGAL_EDGES.contains(&(parent_type, target_type)) {
            Ok(Self {
                parent_type,
                target_type,
            })
        } else {
            Err(BacklogError::InvalidEdge {
                parent: parent_type,
                target: target_type,
            })
        }
    }

    pub fn parent_type(&self) -> ItemKind {
        self.parent_type
    }

    pub fn target_type(&self) -> ItemKind {
        self.target_type
    }
}

/// Work item priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl FromStr for Priority {
    type Err = BacklogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" | "urgent" => Ok(Priority::Critical),
            other => Err(BacklogError::invalid_request(format!(
                "Unknown priority '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle status of a stored work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    Draft,
    Planning,
    Backlog,
    InProgress,
    Done,
}

/// Ancestor foreign keys carried by a work item.
///
/// Every row stores the full chain above it, not just its immediate parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_brief_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<String>,
}

impl Lineage {
    /// The stored ID for the given ancestor level.
    pub fn get(&self, kind: ItemKind) -> Option<&str> {
        match kind {
            ItemKind::BusinessBrief => self.business_brief_id.as_deref(),
            ItemKind::Initiative => self.initiative_id.as_deref(),
            ItemKind::Feature => self.feature_id.as_deref(),
            ItemKind::Epic => self.epic_id.as_deref(),
            ItemKind::Story => None,
        }
    }

    /// Sets the ancestor ID for the given level. Stories are never ancestors.
    pub fn set(&mut self, kind: ItemKind, id: impl Into<String>) {
        let id = Some(id.into());
        match kind {
            ItemKind::BusinessBrief => self.business_brief_id = id,
            ItemKind::Initiative => self.initiative_id = id,
            ItemKind::Feature => self.feature_id = id,
            ItemKind::Epic => self.epic_id = id,
            ItemKind::Story => {}
        }
    }

    /// Whether every ancestor level required by `kind` is present.
    pub fn is_complete_for(&self, kind: ItemKind) -> bool {
        let mut level = kind.parent();
        while let Some(current) = level {
            if self.get(current).is_none() {
                return false;
            }
            level = current.parent();
        }
        true
    }
}

/// Root of the hierarchy: the business proposal everything is generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessBrief {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_objective: Option<String>,
    pub created_at: String,
}

/// A stored Initiative, Feature, Epic or Story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
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
    #[serde(default)]
    pub lineage: Lineage,
    /// Provenance of the row (e.g. the generation session that produced it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: String,
}

impl WorkItem {
    /// The foreign key pointing at this item's immediate parent.
    ///
    /// Returns `None` when the slot is empty, which for any work item is a
    /// data integrity violation.
    pub fn parent_id(&self) -> Option<&str> {
        self.kind.parent().and_then(|kind| self.lineage.get(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_edges_follow_parent_links() {
        for (parent, target) in LEGAL_EDGES {
            assert_eq!(target.parent(), Some(parent));
            assert_eq!(parent.child(), Some(target));
        }
    }

    #[test]
    fn test_edge_rejects_every_illegal_pair() {
        for parent in ItemKind::ALL {
            for target in ItemKind::ALL {
                let result = GenerationEdge::new(parent, target);
                if LEGAL_EDGES.contains(&(parent, target)) {
                    let edge = result.unwrap();
                    assert_eq!(edge.parent_type(), parent);
                    assert_eq!(edge.target_type(), target);
                } else {
                    assert_eq!(
                        result.unwrap_err(),
                        BacklogError::InvalidEdge { parent, target }
                    );
                }
            }
        }
    }

    #[test]
    fn test_item_kind_parsing_is_lenient() {
        assert_eq!("business_brief".parse::<ItemKind>().unwrap(), ItemKind::BusinessBrief);
        assert_eq!("BusinessBrief".parse::<ItemKind>().unwrap(), ItemKind::BusinessBrief);
        assert_eq!("EPIC".parse::<ItemKind>().unwrap(), ItemKind::Epic);
        assert!("task".parse::<ItemKind>().is_err());
    }

    #[test]
    fn test_lineage_completeness() {
        let mut lineage = Lineage::default();
        lineage.set(ItemKind::BusinessBrief, "BB-1");
        lineage.set(ItemKind::Initiative, "INI-1");
        assert!(lineage.is_complete_for(ItemKind::Feature));
        assert!(!lineage.is_complete_for(ItemKind::Story));

        lineage.set(ItemKind::Feature, "FEA-1");
        lineage.set(ItemKind::Epic, "EPIC-1");
        assert!(lineage.is_complete_for(ItemKind::Story));
        assert_eq!(lineage.get(ItemKind::Epic), Some("EPIC-1"));
    }

    #[test]
    fn test_committed_status_is_never_draft() {
        for kind in ItemKind::ALL.into_iter().filter(|k| *k != ItemKind::BusinessBrief) {
            assert_ne!(kind.committed_status(), WorkItemStatus::Draft);
        }
        assert_eq!(ItemKind::Initiative.committed_status(), WorkItemStatus::Planning);
    }

    #[test]
    fn test_priority_serializes_lowercase() {
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        assert_eq!("Normal".parse::<Priority>().unwrap(), Priority::Medium);
    }
}
