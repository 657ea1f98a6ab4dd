//! Generation request and prompt parameters.

use crate::error::{BacklogError, Result};
use crate::hierarchy::{GenerationEdge, ItemKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The immutable request a generation session is built around.
///
/// Constructed once through [`GenerationRequest::new`] and never mutated;
/// the edge inside has already been checked against the legal edge table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    id: String,
    #[serde(flatten)]
    edge: GenerationEdge,
    parent_id: String,
    page_source: String,
    created_at: String,
}

impl GenerationRequest {
    /// Validates the edge and parent ID and assigns a fresh session ID.
    ///
    /// # Errors
    ///
    /// - `InvalidEdge` when `(parent_type, target_type)` is not a legal edge
    /// - `InvalidRequest` when `parent_id` is blank
    pub fn new(
        parent_type: ItemKind,
        parent_id: impl Into<String>,
        target_type: ItemKind,
        page_source: impl Into<String>,
    ) -> Result<Self> {
        let edge = GenerationEdge::new(parent_type, target_type)?;

        let parent_id = parent_id.into().trim().to_string();
        if parent_id.is_empty() {
            return Err(BacklogError::invalid_request("parentId must not be empty"));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            edge,
            parent_id,
            page_source: page_source.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_type(&self) -> ItemKind {
        self.edge.parent_type()
    }

    pub fn target_type(&self) -> ItemKind {
        self.edge.target_type()
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn page_source(&self) -> &str {
        &self.page_source
    }
}

/// Parameters supplied with `SubmitPrompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParameters {
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl PromptParameters {
    pub fn new(quantity: u32, additional_context: Option<String>) -> Self {
        // Whitespace-only guidance carries no information
        let additional_context = additional_context
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        Self {
            quantity,
            additional_context,
        }
    }

    /// Checks `quantity` against `1..=max`.
    pub fn validate(&self, target_type: ItemKind, max: u32) -> Result<()> {
        if self.quantity == 0 || self.quantity > max {
            return Err(BacklogError::invalid_request(format!(
                "quantity for {} must be between 1 and {}, got {}",
                target_type, max, self.quantity
            )));
        }
        Ok(())
    }
}
