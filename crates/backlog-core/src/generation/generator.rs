//! Content generator capability.

use super::candidate::RawCandidate;
use crate::error::Result;
use crate::hierarchy::{HierarchyContext, ItemKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything a generator receives for one call.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub target_type: ItemKind,
    /// Parent plus every resolved ancestor.
    pub context: HierarchyContext,
    pub quantity: u32,
    pub additional_context: Option<String>,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Metadata recorded on the session for audit purposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// The exact prompt sent to the provider.
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Raw generator result, before the orchestrator normalizes it.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub candidates: Vec<RawCandidate>,
    pub metadata: GenerationMetadata,
}

/// Produces candidate work items for a resolved parent.
///
/// Calls are potentially slow (seconds) and have no side effects on storage,
/// so the orchestrator may abandon a result freely. Errors are surfaced
/// verbatim as the session's terminal error.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, input: &GenerationInput) -> Result<GenerationOutput>;
}
