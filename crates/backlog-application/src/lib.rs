//! Application layer for the backlog generator.
//!
//! `GenerationUseCase` is the entry point: it owns the `SessionManager` and
//! coordinates the `HierarchyResolver`, the configured `ContentGenerator`, the
//! `SelectivePersistenceEngine` and the `AuditDispatcher`.

pub mod audit;
pub mod dto;
pub mod generation;
pub mod generation_usecase;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod test_support;

pub use audit::AuditDispatcher;
pub use generation_usecase::GenerationUseCase;
pub use resolver::HierarchyResolver;
pub use session::SessionManager;
