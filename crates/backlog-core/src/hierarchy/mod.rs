//! Hierarchy domain module.
//!
//! # Module Structure
//!
//! - `model`: Node kinds, the legal generation edges and stored entities
//! - `context`: Resolved ancestor context (`HierarchyContext`)
//! - `repository`: Storage capability (`WorkItemRepository`)

mod context;
mod model;
mod repository;

pub use context::{ContextLevel, HierarchyContext};
pub use model::{
    BusinessBrief, GenerationEdge, ItemKind, LEGAL_EDGES, Lineage, Priority,
    WorkItem, WorkItemStatus,
};
pub use repository::WorkItemRepository;
