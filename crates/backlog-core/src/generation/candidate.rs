//! Generated candidates.

use crate::hierarchy::Priority;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Acceptance criteria used when the generator provides none.
pub const DEFAULT_ACCEPTANCE_CRITERION: &str = "To be defined";

/// A proposed, not yet persisted work item awaiting review.
///
/// `candidate_id` is scoped to the session that produced it; it is not a
/// storage ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCandidate {
    #[serde(default)]
    pub candidate_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub business_value: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Story estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    /// Feature/Epic estimate (e.g. "2 sprints").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
}

/// Candidate record as returned by a content generator.
///
/// Providers sometimes wrap their JSON in prose, code fences or a second
/// layer of string encoding. Those payloads arrive as `NeedsReparse` and go
/// through a dedicated recovery step instead of normal parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCandidate {
    /// A JSON object with candidate fields.
    Structured(Map<String, Value>),
    /// Text that should contain one candidate object or an array of them.
    NeedsReparse(String),
}

impl RawCandidate {
    /// Classifies an arbitrary JSON value.
    ///
    /// Objects are structured; strings are queued for reparse; anything else
    /// is kept as its JSON text so the recovery step can report it.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => RawCandidate::Structured(map),
            Value::String(text) => RawCandidate::NeedsReparse(text),
            other => RawCandidate::NeedsReparse(other.to_string()),
        }
    }
}
