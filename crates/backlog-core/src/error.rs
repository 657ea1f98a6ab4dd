//! Error types for the backlog workspace.

use crate::generation::SessionStatus;
use crate::hierarchy::ItemKind;
use thiserror::Error;

/// A shared error type for the backlog domain.
///
/// Variants are grouped by how the orchestrator reacts to them:
/// validation errors are rejected before a session changes, resolution and
/// generation errors end the session, and data access errors raised while
/// persisting a single candidate stay local to that candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacklogError {
    /// The requested (parent, target) pair is not part of the legal edge table
    #[error("Invalid generation edge: {parent} cannot parent {target}")]
    InvalidEdge { parent: ItemKind, target: ItemKind },

    /// Request payload failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Review decisions do not match the generated candidate set
    #[error("Invalid review: {0}")]
    InvalidReview(String),

    /// The parent entity named by the request does not exist
    #[error("Parent not found: {kind} '{id}'")]
    ParentNotFound { kind: ItemKind, id: String },

    /// A stored foreign key is missing or points to a missing row
    #[error("Broken ancestry chain at {level}: {reason}")]
    BrokenAncestryChain { level: ItemKind, reason: String },

    /// The owner already has a session in progress
    #[error("Owner '{owner}' already has an active session '{session_id}'")]
    SessionAlreadyActive { owner: String, session_id: String },

    /// No session with this ID is known to the owner
    #[error("Session not found: '{session_id}'")]
    SessionNotFound { session_id: String },

    /// The operation is not valid for the session's current status
    #[error("Cannot {operation} session '{session_id}' in status {status}")]
    InvalidTransition {
        session_id: String,
        status: SessionStatus,
        operation: String,
    },

    /// The session was cancelled while an operation was in flight
    #[error("Session '{session_id}' was cancelled")]
    Cancelled { session_id: String },

    /// The content generator failed
    #[error("Generation failed: {message}")]
    Generation { message: String, retryable: bool },

    /// A generator payload embedded in text could not be recovered
    #[error("Candidate {index} could not be recovered: {message}")]
    CandidateRecovery { index: usize, message: String },

    /// A generated candidate is missing required content
    #[error("Candidate {index} is malformed: {reason}")]
    MalformedCandidate { index: usize, reason: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BacklogError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an InvalidRequest error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Creates an InvalidReview error
    pub fn invalid_review(message: impl Into<String>) -> Self {
        Self::InvalidReview(message.into())
    }

    /// Creates a BrokenAncestryChain error
    pub fn broken_chain(level: ItemKind, reason: impl Into<String>) -> Self {
        Self::BrokenAncestryChain {
            level,
            reason: reason.into(),
        }
    }

    /// Creates an InvalidTransition error
    pub fn invalid_transition(
        session_id: impl Into<String>,
        status: SessionStatus,
        operation: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            session_id: session_id.into(),
            status,
            operation: operation.into(),
        }
    }

    /// Creates a non-retryable Generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a Generation error the caller may retry with a fresh session
    pub fn generation_retryable(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Classification
    // ============================================================================

    /// Errors rejected synchronously, before any session state changes.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidEdge { .. } | Self::InvalidRequest(_) | Self::InvalidReview(_)
        )
    }

    /// Errors raised while resolving the parent hierarchy.
    ///
    /// These are terminal: they point at a bad ID or corrupted linkage, so
    /// starting a new session with the same input fails the same way.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::ParentNotFound { .. } | Self::BrokenAncestryChain { .. }
        )
    }

    /// Errors raised while producing candidates.
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            Self::Generation { .. } | Self::CandidateRecovery { .. } | Self::MalformedCandidate { .. }
        )
    }

    /// Whether a fresh session with the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation { retryable, .. } => *retryable,
            Self::Io { .. } | Self::DataAccess(_) => true,
            _ => false,
        }
    }

    /// Check if this is a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ParentNotFound { .. } | Self::SessionNotFound { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for BacklogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for BacklogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for BacklogError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for BacklogError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for BacklogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, BacklogError>`.
pub type Result<T> = std::result::Result<T, BacklogError>;
