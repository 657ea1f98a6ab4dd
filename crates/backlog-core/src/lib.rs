//! Domain layer for the backlog generator.
//!
//! Holds the hierarchy model, the generation session state machine, the audit
//! event model and the capability traits (`WorkItemRepository`,
//! `ContentGenerator`, `EventSink`) the application layer is written against.

pub mod audit;
pub mod config;
pub mod error;
pub mod generation;
pub mod hierarchy;

// Re-export common error type
pub use error::{BacklogError, Result};
