//! Hierarchy context resolution.

use backlog_core::error::{BacklogError, Result};
use backlog_core::hierarchy::{GenerationEdge, HierarchyContext, ItemKind, WorkItemRepository};
use std::sync::Arc;

/// Loads a generation parent and walks up to its business brief.
///
/// Read-only: one repository read per hierarchy level.
#[derive(Clone)]
pub struct HierarchyResolver {
    repository: Arc<dyn WorkItemRepository>,
}

impl HierarchyResolver {
    pub fn new(repository: Arc<dyn WorkItemRepository>) -> Self {
        Self { repository }
    }

    /// Resolves the full ancestor context for a generation.
    ///
    /// # Errors
    ///
    /// - `InvalidEdge` when `(parent_type, target_type)` is not legal
    /// - `ParentNotFound` when the parent row does not exist
    /// - `BrokenAncestryChain(level)` when a foreign key above the parent is
    ///   empty or points to a missing row; `level` is the ancestor that could
    ///   not be loaded
    pub async fn resolve(
        &self,
        parent_type: ItemKind,
        parent_id: &str,
        target_type: ItemKind,
    ) -> Result<HierarchyContext> {
        GenerationEdge::new(parent_type, target_type)?;

        if parent_type == ItemKind::BusinessBrief {
            let brief = self
                .repository
                .find_business_brief(parent_id)
                .await?
                .ok_or_else(|| BacklogError::ParentNotFound {
                    kind: parent_type,
                    id: parent_id.to_string(),
                })?;
            return Ok(HierarchyContext::from_brief(brief));
        }

        let parent = self
            .repository
            .find_work_item(parent_type, parent_id)
            .await?
            .ok_or_else(|| BacklogError::ParentNotFound {
                kind: parent_type,
                id: parent_id.to_string(),
            })?;

        let mut initiative = None;
        let mut feature = None;
        let mut epic = None;

        // Walk upward one hop at a time, following the FK stored on each child
        let mut current = parent;
        let business_brief = loop {
            let parent_kind = current.kind.parent().ok_or_else(|| {
                BacklogError::internal(format!("{} has no parent level", current.kind))
            })?;
            let parent_ref = current
                .parent_id()
                .map(str::to_string)
                .ok_or_else(|| {
                    BacklogError::broken_chain(
                        parent_kind,
                        format!(
                            "{} '{}' has no {} reference",
                            current.kind,
                            current.id,
                            parent_kind
                        ),
                    )
                })?;

            match current.kind {
                ItemKind::Initiative => initiative = Some(current),
                ItemKind::Feature => feature = Some(current),
                ItemKind::Epic => epic = Some(current),
                // Neither can be a generation parent or an ancestor
                ItemKind::BusinessBrief | ItemKind::Story => {}
            }

            if parent_kind == ItemKind::BusinessBrief {
                let brief = self
                    .repository
                    .find_business_brief(&parent_ref)
                    .await?
                    .ok_or_else(|| missing_row(parent_kind, &parent_ref))?;
                break brief;
            }

            current = self
                .repository
                .find_work_item(parent_kind, &parent_ref)
                .await?
                .ok_or_else(|| missing_row(parent_kind, &parent_ref))?;
        };

        tracing::debug!(
            "[HierarchyResolver] Resolved {} '{}' up to brief '{}'",
            parent_type,
            parent_id,
            business_brief.id
        );

        Ok(HierarchyContext {
            parent_kind: parent_type,
            business_brief,
            initiative,
            feature,
            epic,
        })
    }
}

fn missing_row(level: ItemKind, id: &str) -> BacklogError {
    BacklogError::broken_chain(level, format!("referenced {} '{}' does not exist", level, id))
}
