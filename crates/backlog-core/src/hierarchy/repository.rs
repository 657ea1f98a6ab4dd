//! Work item repository trait.
//!
//! Defines the storage capability the orchestrator reads hierarchy context from
//! and commits reviewed candidates to.

use super::model::{BusinessBrief, ItemKind, WorkItem};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for the backlog hierarchy.
///
/// This trait decouples the orchestrator from the concrete store (TOML file,
/// relational database, remote API).
///
/// # Implementation Notes
///
/// Implementations must be safe for concurrent use: the persistence engine
/// issues several `insert_work_item` calls at once and owns no lock of its
/// own around them.
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    /// Finds a business brief by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(BusinessBrief))`: Brief found
    /// - `Ok(None)`: Brief not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_business_brief(&self, id: &str) -> Result<Option<BusinessBrief>>;

    /// Finds a work item of the given kind by its ID.
    ///
    /// Returns `Ok(None)` when no row exists or when the stored row has a
    /// different kind.
    async fn find_work_item(&self, kind: ItemKind, id: &str) -> Result<Option<WorkItem>>;

    /// Inserts a new work item. The item's ID must not exist yet.
    async fn insert_work_item(&self, item: &WorkItem) -> Result<()>;

    /// Saves (creates or replaces) a business brief.
    async fn save_business_brief(&self, brief: &BusinessBrief) -> Result<()>;

    /// Lists all business briefs.
    async fn list_business_briefs(&self) -> Result<Vec<BusinessBrief>>;

    /// Lists the direct children of a node.
    async fn list_children(&self, parent_kind: ItemKind, parent_id: &str) -> Result<Vec<WorkItem>>;
}
