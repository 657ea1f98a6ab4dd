//! Request and response bodies of the generation operations.
//!
//! Field names are camelCase so the bodies can travel over any JSON transport.

use backlog_core::generation::{
    GenerationCandidate, GenerationMetadata, PersistedItem, ReviewDecision, SaveOutcome,
    SessionStatus,
};
use backlog_core::hierarchy::ItemKind;
use serde::{Deserialize, Serialize};

/// `generation.start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGenerationRequest {
    pub parent_type: ItemKind,
    pub parent_id: String,
    pub target_type: ItemKind,
    #[serde(default)]
    pub page_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGenerationResponse {
    pub session_id: String,
}

/// `generation.submitPrompt`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPromptRequest {
    pub session_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPromptResponse {
    pub candidates: Vec<GenerationCandidate>,
    pub metadata: GenerationMetadata,
}

/// `generation.submitReview`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub session_id: String,
    pub decisions: Vec<ReviewDecision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewResponse {
    pub persisted_items: Vec<PersistedItem>,
    pub success_count: usize,
    pub error_count: usize,
    pub outcome: SaveOutcome,
}

/// `generation.cancel`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// `Cancelled`, or `Generating` when the cancel takes effect once the
    /// in-flight generation returns.
    pub status: SessionStatus,
    pub pending: bool,
}
