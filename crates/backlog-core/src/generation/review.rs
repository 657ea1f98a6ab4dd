//! Human review decisions.

use super::candidate::GenerationCandidate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Kept,
    Discarded,
}

/// The reviewer's verdict on one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    pub candidate_id: String,
    pub action: ReviewAction,
    /// Replacement payload when the reviewer edited the candidate before keeping it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited: Option<GenerationCandidate>,
}

impl ReviewDecision {
    pub fn kept(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            action: ReviewAction::Kept,
            edited: None,
        }
    }

    pub fn discarded(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            action: ReviewAction::Discarded,
            edited: None,
        }
    }

    pub fn kept_with_edit(candidate_id: impl Into<String>, edited: GenerationCandidate) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            action: ReviewAction::Kept,
            edited: Some(edited),
        }
    }

    pub fn is_kept(&self) -> bool {
        self.action == ReviewAction::Kept
    }
}
