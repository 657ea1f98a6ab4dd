use crate::generation::{GenerationSession, SessionStatus};
use crate::hierarchy::ItemKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated user on whose behalf an operation runs.
///
/// Authentication happens upstream; the orchestrator only carries the
/// identity through to audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// A significant session transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventKind {
    SessionStarted {
        parent_type: ItemKind,
        parent_id: String,
        target_type: ItemKind,
        page_source: String,
    },
    ResolutionFailed {
        error: String,
    },
    GenerationRequested {
        quantity: u32,
        has_additional_context: bool,
    },
    GenerationCompleted {
        candidate_count: usize,
        elapsed_ms: u64,
        #[serde(default)]
        total_tokens: Option<u32>,
    },
    GenerationFailed {
        error: String,
    },
    ReviewSubmitted {
        kept: usize,
        discarded: usize,
    },
    ItemsPersisted {
        success_count: usize,
        error_count: usize,
    },
    PersistenceFailed {
        error: String,
    },
    SessionCancelled {
        from: SessionStatus,
    },
}

/// One audit record, attributed to a session and an acting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub session_id: String,
    pub owner: String,
    pub actor: Actor,
    #[serde(flatten)]
    pub kind: AuditEventKind,
    pub occurred_at: String,
}

impl AuditEvent {
    pub fn new(
        session_id: impl Into<String>,
        owner: impl Into<String>,
        actor: Actor,
        kind: AuditEventKind,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            owner: owner.into(),
            actor,
            kind,
            occurred_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Builds an event attributed to the session's owner and actor.
    pub fn for_session(session: &GenerationSession, kind: AuditEventKind) -> Self {
        Self::new(session.id(), &session.owner, session.actor.clone(), kind)
    }

    /// Short machine-readable name of the event kind.
    pub fn name(&self) -> &'static str {
        match self.kind {
            AuditEventKind::SessionStarted { .. } => "session_started",
            AuditEventKind::ResolutionFailed { .. } => "resolution_failed",
            AuditEventKind::GenerationRequested { .. } => "generation_requested",
            AuditEventKind::GenerationCompleted { .. } => "generation_completed",
            AuditEventKind::GenerationFailed { .. } => "generation_failed",
            AuditEventKind::ReviewSubmitted { .. } => "review_submitted",
            AuditEventKind::ItemsPersisted { .. } => "items_persisted",
            AuditEventKind::PersistenceFailed { .. } => "persistence_failed",
            AuditEventKind::SessionCancelled { .. } => "session_cancelled",
        }
    }
}
