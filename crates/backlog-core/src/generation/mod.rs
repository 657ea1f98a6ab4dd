//! Generation session domain module.
//!
//! # Module Structure
//!
//! - `request`: Immutable `GenerationRequest` and `PromptParameters`
//! - `candidate`: `GenerationCandidate` and the raw `RawCandidate` sum type
//! - `generator`: `ContentGenerator` capability and its input/output
//! - `review`: `ReviewDecision`
//! - `persisted`: `PersistedItem` and `PersistenceReport`
//! - `session`: `GenerationSession` and its `SessionStatus` state machine

mod candidate;
mod generator;
mod persisted;
mod request;
mod review;
mod session;

pub use candidate::{DEFAULT_ACCEPTANCE_CRITERION, GenerationCandidate, RawCandidate};
pub use generator::{
    ContentGenerator, GenerationInput, GenerationMetadata, GenerationOutput, TokenUsage,
};
pub use persisted::{PersistOutcome, PersistedItem, PersistenceReport, SaveOutcome};
pub use request::{GenerationRequest, PromptParameters};
pub use review::{ReviewAction, ReviewDecision};
pub use session::{GenerationSession, SessionStatus};
