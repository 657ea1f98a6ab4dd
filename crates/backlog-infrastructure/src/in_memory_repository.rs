//! In-memory implementation of `WorkItemRepository` for tests and dry runs.

use async_trait::async_trait;
use backlog_core::error::{BacklogError, Result};
use backlog_core::hierarchy::{BusinessBrief, ItemKind, WorkItem, WorkItemRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryWorkItemRepository {
    briefs: RwLock<HashMap<String, BusinessBrief>>,
    items: RwLock<HashMap<String, WorkItem>>,
}

impl InMemoryWorkItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored work items.
    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }

    /// Every stored work item of `kind`, oldest first.
    pub async fn items_of_kind(&self, kind: ItemKind) -> Vec<WorkItem> {
        let mut items: Vec<WorkItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        items
    }
}

#[async_trait]
impl WorkItemRepository for InMemoryWorkItemRepository {
    async fn find_business_brief(&self, id: &str) -> Result<Option<BusinessBrief>> {
        Ok(self.briefs.read().await.get(id).cloned())
    }

    async fn find_work_item(&self, kind: ItemKind, id: &str) -> Result<Option<WorkItem>> {
        Ok(self
            .items
            .read()
            .await
            .get(id)
            .filter(|item| item.kind == kind)
            .cloned())
    }

    async fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(BacklogError::data_access(format!(
                "work item '{}' already exists",
                item.id
            )));
        }
        items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn save_business_brief(&self, brief: &BusinessBrief) -> Result<()> {
        self.briefs
            .write()
            .await
            .insert(brief.id.clone(), brief.clone());
        Ok(())
    }

    async fn list_business_briefs(&self) -> Result<Vec<BusinessBrief>> {
        let mut briefs: Vec<BusinessBrief> = self.briefs.read().await.values().cloned().collect();
        briefs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(briefs)
    }

    async fn list_children(&self, parent_kind: ItemKind, parent_id: &str) -> Result<Vec<WorkItem>> {
        let Some(child_kind) = parent_kind.child() else {
            return Ok(Vec::new());
        };
        Ok(self
            .items_of_kind(child_kind)
            .await
            .into_iter()
            .filter(|item| item.parent_id() == Some(parent_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_core::hierarchy::{Lineage, Priority, WorkItemStatus};

    fn feature(id: &str, initiative: &str) -> WorkItem {
        let mut lineage = Lineage::default();
        lineage.set(ItemKind::BusinessBrief, "BB-1");
        lineage.set(ItemKind::Initiative, initiative);
        WorkItem {
            id: id.to_string(),
            kind: ItemKind::Feature,
            title: id.to_string(),
            description: String::new(),
            acceptance_criteria: Vec::new(),
            priority: Priority::Low,
            business_value: String::new(),
            rationale: String::new(),
            tags: Vec::new(),
            labels: Vec::new(),
            story_points: None,
            estimated_effort: Some("1 sprint".to_string()),
            status: WorkItemStatus::Backlog,
            lineage,
            source: None,
            created_at: format!("2025-01-01T00:00:0{}Z", id.len()),
        }
    }

    #[tokio::test]
    async fn test_children_follow_parent_reference() {
        let repo = InMemoryWorkItemRepository::new();
        repo.insert_work_item(&feature("F-1", "I-1")).await.unwrap();
        repo.insert_work_item(&feature("F-2", "I-2")).await.unwrap();

        let children = repo.list_children(ItemKind::Initiative, "I-1").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "F-1");
        assert!(
            repo.list_children(ItemKind::Story, "S-1")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let repo = InMemoryWorkItemRepository::new();
        repo.insert_work_item(&feature("F-1", "I-1")).await.unwrap();
        assert!(repo.insert_work_item(&feature("F-1", "I-1")).await.is_err());
        assert_eq!(repo.item_count().await, 1);
        assert!(
            repo.find_work_item(ItemKind::Epic, "F-1")
                .await
                .unwrap()
                .is_none()
        );
    }
}
