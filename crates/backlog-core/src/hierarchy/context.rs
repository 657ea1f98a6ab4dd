//! Resolved ancestor context for a generation parent.

use super::model::{BusinessBrief, ItemKind, Lineage, WorkItem};
use serde::Serialize;

/// One level of resolved context, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLevel<'a> {
    pub kind: ItemKind,
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
}

/// The generation parent plus every ancestor up to its business brief.
///
/// Levels below the parent are always `None`; levels between the parent and
/// the brief are always `Some` once resolution succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyContext {
    pub parent_kind: ItemKind,
    pub business_brief: BusinessBrief,
    pub initiative: Option<WorkItem>,
    pub feature: Option<WorkItem>,
    pub epic: Option<WorkItem>,
}

impl HierarchyContext {
    /// Context for a generation rooted directly at a business brief.
    pub fn from_brief(business_brief: BusinessBrief) -> Self {
        Self {
            parent_kind: ItemKind::BusinessBrief,
            business_brief,
            initiative: None,
            feature: None,
            epic: None,
        }
    }

    /// The work item stored for `kind`, if that level was resolved.
    pub fn work_item(&self, kind: ItemKind) -> Option<&WorkItem> {
        match kind {
            ItemKind::Initiative => self.initiative.as_ref(),
            ItemKind::Feature => self.feature.as_ref(),
            ItemKind::Epic => self.epic.as_ref(),
            ItemKind::BusinessBrief | ItemKind::Story => None,
        }
    }

    pub fn parent_id(&self) -> &str {
        self.work_item(self.parent_kind)
            .map(|item| item.id.as_str())
            .unwrap_or(self.business_brief.id.as_str())
    }

    /// Resolved levels from the business brief down to the parent.
    pub fn levels(&self) -> Vec<ContextLevel<'_>> {
        let mut levels = vec![ContextLevel {
            kind: ItemKind::BusinessBrief,
            id: &self.business_brief.id,
            title: &self.business_brief.title,
            description: &self.business_brief.description,
        }];

        for kind in [ItemKind::Initiative, ItemKind::Feature, ItemKind::Epic] {
            if let Some(item) = self.work_item(kind) {
                levels.push(ContextLevel {
                    kind,
                    id: &item.id,
                    title: &item.title,
                    description: &item.description,
                });
            }
        }

        levels
    }

    /// Foreign keys a child of the parent must carry.
    ///
    /// Built entirely from the resolved levels, so no further reads are needed
    /// when persisting children.
    pub fn child_lineage(&self) -> Lineage {
        let mut lineage = Lineage::default();
        for level in self.levels() {
            lineage.set(level.kind, level.id);
        }
        lineage
    }
}
