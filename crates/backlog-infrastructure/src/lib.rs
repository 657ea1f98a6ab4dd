//! Infrastructure layer for the backlog generator.
//!
//! Concrete implementations of the domain capabilities: file and in-memory
//! repositories, audit sinks, configuration loading and path resolution.

pub mod audit;
pub mod config_service;
pub mod dto;
pub mod in_memory_repository;
pub mod paths;
pub mod storage;
pub mod toml_work_item_repository;

pub use audit::{FanoutAuditSink, JsonlAuditSink, TracingAuditSink};
pub use config_service::ConfigService;
pub use in_memory_repository::InMemoryWorkItemRepository;
pub use paths::{BacklogPaths, PathError};
pub use toml_work_item_repository::TomlWorkItemRepository;
