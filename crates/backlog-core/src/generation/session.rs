//! Generation session aggregate and its state machine.

use super::candidate::GenerationCandidate;
use super::generator::GenerationMetadata;
use super::persisted::PersistenceReport;
use super::request::{GenerationRequest, PromptParameters};
use super::review::ReviewDecision;
use crate::audit::Actor;
use crate::error::{BacklogError, Result};
use crate::hierarchy::HierarchyContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a generation session.
///
/// ```text
/// Prompting -> Generating -> Reviewing -> Persisting -> Completed
///     |            |  \          |            \
///     v            v   Error     v             Error
/// Cancelled    Cancelled     Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Prompting,
    Generating,
    Reviewing,
    Persisting,
    Completed,
    Cancelled,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::Error
        )
    }

    /// Whether `self -> next` is an edge of the state machine.
    ///
    /// `Generating -> Cancelled` exists only for cancellations requested while
    /// the generator was running; the result is discarded on arrival.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Prompting, Generating)
                | (Prompting, Cancelled)
                | (Generating, Reviewing)
                | (Generating, Error)
                | (Generating, Cancelled)
                | (Reviewing, Persisting)
                | (Reviewing, Cancelled)
                | (Persisting, Completed)
                | (Persisting, Error)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Prompting => "Prompting",
            SessionStatus::Generating => "Generating",
            SessionStatus::Reviewing => "Reviewing",
            SessionStatus::Persisting => "Persisting",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
            SessionStatus::Error => "Error",
        };
        f.write_str(name)
    }
}

/// The mutable aggregate driven by the orchestrator.
///
/// `status` is private so that every change goes through [`transition`],
/// which enforces the state machine.
///
/// [`transition`]: GenerationSession::transition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSession {
    pub request: GenerationRequest,
    pub owner: String,
    pub actor: Actor,
    /// Resolved hierarchy; `None` only for sessions that failed resolution.
    pub context: Option<HierarchyContext>,
    pub prompt: Option<PromptParameters>,
    pub candidates: Option<Vec<GenerationCandidate>>,
    pub metadata: Option<GenerationMetadata>,
    pub decisions: Option<Vec<ReviewDecision>>,
    pub report: Option<PersistenceReport>,
    status: SessionStatus,
    pub error: Option<String>,
    /// Set when a cancel arrives while generation is in flight.
    pub cancel_requested: bool,
    pub updated_at: String,
}

impl GenerationSession {
    /// Creates a session whose context has been resolved; it starts in `Prompting`.
    pub fn new(
        request: GenerationRequest,
        owner: impl Into<String>,
        actor: Actor,
        context: HierarchyContext,
    ) -> Self {
        Self {
            request,
            owner: owner.into(),
            actor,
            context: Some(context),
            prompt: None,
            candidates: None,
            metadata: None,
            decisions: None,
            report: None,
            status: SessionStatus::Prompting,
            error: None,
            cancel_requested: false,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates a session that failed context resolution.
    ///
    /// It is born in `Error`; `Prompting` is never observable for it.
    pub fn failed_resolution(
        request: GenerationRequest,
        owner: impl Into<String>,
        actor: Actor,
        error: &BacklogError,
    ) -> Self {
        Self {
            request,
            owner: owner.into(),
            actor,
            context: None,
            prompt: None,
            candidates: None,
            metadata: None,
            decisions: None,
            report: None,
            status: SessionStatus::Error,
            error: Some(error.to_string()),
            cancel_requested: false,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn id(&self) -> &str {
        self.request.id()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Moves to `next`, rejecting edges the state machine does not have.
    pub fn transition(&mut self, next: SessionStatus, operation: &str) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(BacklogError::invalid_transition(
                self.id(),
                self.status,
                operation,
            ));
        }
        self.status = next;
        self.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(())
    }

    /// Moves to `Error`, capturing the message.
    pub fn fail(&mut self, error: &BacklogError, operation: &str) -> Result<()> {
        self.transition(SessionStatus::Error, operation)?;
        self.error = Some(error.to_string());
        Ok(())
    }

    /// Fails with `InvalidTransition` unless the session is in `expected`.
    pub fn ensure_status(&self, expected: SessionStatus, operation: &str) -> Result<()> {
        if self.status != expected {
            return Err(BacklogError::invalid_transition(
                self.id(),
                self.status,
                operation,
            ));
        }
        Ok(())
    }

    /// The resolved context, which every non-failed session carries.
    pub fn context(&self) -> Result<&HierarchyContext> {
        self.context.as_ref().ok_or_else(|| {
            BacklogError::internal(format!("session '{}' has no resolved context", self.id()))
        })
    }
}
