//! Generation use case implementation.
//!
//! This module provides the `GenerationUseCase` which drives a generation
//! session through prompt configuration, AI generation, human review and
//! selective persistence, coordinating the `HierarchyResolver`, the
//! `ContentGenerator`, the `SelectivePersistenceEngine` and the audit trail.

use crate::audit::AuditDispatcher;
use crate::dto::{
    CancelRequest, CancelResponse, StartGenerationRequest, StartGenerationResponse,
    SubmitPromptRequest, SubmitPromptResponse, SubmitReviewRequest, SubmitReviewResponse,
};
use crate::generation::{CandidateNormalizer, SelectivePersistenceEngine};
use crate::resolver::HierarchyResolver;
use crate::session::SessionManager;
use backlog_core::audit::{Actor, AuditEvent, AuditEventKind};
use backlog_core::config::{BacklogConfig, QuantityLimits};
use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::{
    ContentGenerator, GenerationCandidate, GenerationInput, GenerationRequest, GenerationSession,
    PersistenceReport, PromptParameters, ReviewDecision, SessionStatus,
};
use backlog_core::hierarchy::{HierarchyContext, ItemKind, WorkItemRepository};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Use case orchestrating generation sessions.
///
/// # Responsibilities
///
/// - Validating the generation edge and resolving hierarchy context eagerly
/// - Enforcing one active session per owner
/// - Running generation and persistence in spawned tasks so that a caller
///   dropping its future does not strand the session
/// - Emitting one audit event per transition
///
/// # Thread Safety
///
/// All collaborators are shared through `Arc`. Session state is only touched
/// under the owner's lock inside `SessionManager`, which is never held across
/// a call to the generator or the repository.
pub struct GenerationUseCase {
    sessions: Arc<SessionManager>,
    resolver: HierarchyResolver,
    generator: Arc<dyn ContentGenerator>,
    persistence: SelectivePersistenceEngine,
    audit: AuditDispatcher,
    quantity_limits: QuantityLimits,
}

impl GenerationUseCase {
    /// Creates a new `GenerationUseCase`.
    ///
    /// # Arguments
    ///
    /// * `repository` - Hierarchy store read by the resolver and written by persistence
    /// * `generator` - Candidate generator
    /// * `audit` - Dispatcher for audit events
    /// * `config` - Quantity limits, history size and write concurrency
    pub fn new(
        repository: Arc<dyn WorkItemRepository>,
        generator: Arc<dyn ContentGenerator>,
        audit: AuditDispatcher,
        config: &BacklogConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(config.generation.history_limit)),
            resolver: HierarchyResolver::new(Arc::clone(&repository)),
            generator,
            persistence: SelectivePersistenceEngine::new(
                repository,
                config.persistence.max_concurrent_writes,
            ),
            audit,
            quantity_limits: config.generation.quantity_limits,
        }
    }

    /// `generation.start`: opens a session after resolving its context.
    ///
    /// # Errors
    ///
    /// - `InvalidEdge` / `InvalidRequest`: no session is created
    /// - `SessionAlreadyActive`: the owner already has an active session
    /// - `ParentNotFound` / `BrokenAncestryChain`: a session is recorded in
    ///   history with status `Error`
    pub async fn start_session(
        &self,
        owner: &str,
        actor: &Actor,
        request: StartGenerationRequest,
    ) -> Result<StartGenerationResponse> {
        let generation_request = GenerationRequest::new(
            request.parent_type,
            request.parent_id,
            request.target_type,
            request.page_source,
        )?;
        // Held until the session is installed or recorded as failed
        let _reservation = self
            .sessions
            .reserve(owner, generation_request.id())
            .await?;

        let context = match self
            .resolver
            .resolve(
                generation_request.parent_type(),
                generation_request.parent_id(),
                generation_request.target_type(),
            )
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(
                    "[GenerationUseCase] Context resolution failed for {} '{}': {}",
                    generation_request.parent_type(),
                    generation_request.parent_id(),
                    e
                );
                let session = GenerationSession::failed_resolution(
                    generation_request,
                    owner,
                    actor.clone(),
                    &e,
                );
                let event = AuditEvent::for_session(
                    &session,
                    AuditEventKind::ResolutionFailed {
                        error: e.to_string(),
                    },
                );
                self.sessions.record_finished(owner, session).await;
                self.audit.emit(event);
                return Err(e);
            }
        };

        let event_kind = AuditEventKind::SessionStarted {
            parent_type: generation_request.parent_type(),
            parent_id: generation_request.parent_id().to_string(),
            target_type: generation_request.target_type(),
            page_source: generation_request.page_source().to_string(),
        };
        let session = GenerationSession::new(generation_request, owner, actor.clone(), context);
        let session_id = session.id().to_string();
        let event = AuditEvent::for_session(&session, event_kind);

        self.sessions.begin(owner, session).await?;
        self.audit.emit(event);

        tracing::info!(
            "[GenerationUseCase] Started session {} for owner {}",
            session_id,
            owner
        );
        Ok(StartGenerationResponse { session_id })
    }

    /// `generation.submitPrompt`: runs the generator and surfaces candidates.
    ///
    /// A quantity outside the configured range is rejected and leaves the
    /// session in `Prompting`. Any generator or recovery failure ends the
    /// session in `Error`.
    pub async fn submit_prompt(
        &self,
        owner: &str,
        actor: &Actor,
        request: SubmitPromptRequest,
    ) -> Result<SubmitPromptResponse> {
        const OPERATION: &str = "submit_prompt";
        let session_id = request.session_id;
        let params = PromptParameters::new(request.quantity, request.additional_context);
        let limits = self.quantity_limits;

        let (input, event) = self
            .sessions
            .with_active(owner, &session_id, OPERATION, |session| {
                session.ensure_status(SessionStatus::Prompting, OPERATION)?;
                let target_type = session.request.target_type();
                params.validate(target_type, limits.max_for(target_type))?;

                let input = GenerationInput {
                    target_type,
                    context: session.context()?.clone(),
                    quantity: params.quantity,
                    additional_context: params.additional_context.clone(),
                };
                let event = AuditEvent::new(
                    session.id(),
                    owner,
                    actor.clone(),
                    AuditEventKind::GenerationRequested {
                        quantity: params.quantity,
                        has_additional_context: params.additional_context.is_some(),
                    },
                );
                session.prompt = Some(params.clone());
                session.transition(SessionStatus::Generating, OPERATION)?;
                Ok((input, event))
            })
            .await?;
        self.audit.emit(event);

        tracing::info!(
            "[GenerationUseCase] Session {}: generating {} {}(s)",
            session_id,
            input.quantity,
            input.target_type
        );

        let task = tokio::spawn(run_generation(
            Arc::clone(&self.sessions),
            Arc::clone(&self.generator),
            self.audit.clone(),
            owner.to_string(),
            actor.clone(),
            session_id,
            input,
        ));

        task.await
            .map_err(|e| BacklogError::internal(format!("generation task failed: {}", e)))?
    }

    /// `generation.submitReview`: commits the kept candidates.
    ///
    /// Decisions must cover every candidate exactly once; invalid decisions
    /// are rejected and leave the session in `Reviewing`. Individual write
    /// failures are reported per item and the session still completes.
    pub async fn submit_review(
        &self,
        owner: &str,
        actor: &Actor,
        request: SubmitReviewRequest,
    ) -> Result<SubmitReviewResponse> {
        const OPERATION: &str = "submit_review";
        let session_id = request.session_id;
        let decisions = request.decisions;

        let (plan, event) = self
            .sessions
            .with_active(owner, &session_id, OPERATION, |session| {
                session.ensure_status(SessionStatus::Reviewing, OPERATION)?;
                let candidates = session.candidates.clone().ok_or_else(|| {
                    BacklogError::internal(format!(
                        "session '{}' is reviewing without candidates",
                        session.id()
                    ))
                })?;
                SelectivePersistenceEngine::validate_decisions(&candidates, &decisions)?;

                let kept = decisions.iter().filter(|d| d.is_kept()).count();
                let plan = PersistPlan {
                    target_type: session.request.target_type(),
                    page_source: session.request.page_source().to_string(),
                    context: session.context()?.clone(),
                    candidates,
                    decisions: decisions.clone(),
                };
                let event = AuditEvent::new(
                    session.id(),
                    owner,
                    actor.clone(),
                    AuditEventKind::ReviewSubmitted {
                        kept,
                        discarded: decisions.len() - kept,
                    },
                );
                session.decisions = Some(decisions.clone());
                session.transition(SessionStatus::Persisting, OPERATION)?;
                Ok((plan, event))
            })
            .await?;
        self.audit.emit(event);

        let task = tokio::spawn(run_persistence(
            Arc::clone(&self.sessions),
            self.persistence.clone(),
            self.audit.clone(),
            owner.to_string(),
            actor.clone(),
            session_id,
            plan,
        ));

        let report = task
            .await
            .map_err(|e| BacklogError::internal(format!("persistence task failed: {}", e)))??;

        Ok(SubmitReviewResponse {
            outcome: report.outcome(),
            success_count: report.success_count,
            error_count: report.error_count,
            persisted_items: report.items,
        })
    }

    /// `generation.cancel`
    ///
    /// Immediate from `Prompting` or `Reviewing`. During `Generating` the
    /// cancel is recorded and applied when the generator returns; the
    /// response then reports `pending`. Rejected during `Persisting`.
    pub async fn cancel(
        &self,
        owner: &str,
        actor: &Actor,
        request: CancelRequest,
    ) -> Result<CancelResponse> {
        const OPERATION: &str = "cancel";

        let (response, event) = self
            .sessions
            .with_active(owner, &request.session_id, OPERATION, |session| {
                match session.status() {
                    from @ (SessionStatus::Prompting | SessionStatus::Reviewing) => {
                        session.transition(SessionStatus::Cancelled, OPERATION)?;
                        let event = AuditEvent::new(
                            session.id(),
                            owner,
                            actor.clone(),
                            AuditEventKind::SessionCancelled { from },
                        );
                        Ok((
                            CancelResponse {
                                status: SessionStatus::Cancelled,
                                pending: false,
                            },
                            Some(event),
                        ))
                    }
                    SessionStatus::Generating => {
                        session.cancel_requested = true;
                        Ok((
                            CancelResponse {
                                status: SessionStatus::Generating,
                                pending: true,
                            },
                            None,
                        ))
                    }
                    status => Err(BacklogError::invalid_transition(
                        session.id(),
                        status,
                        OPERATION,
                    )),
                }
            })
            .await?;

        if let Some(event) = event {
            self.audit.emit(event);
        }
        tracing::info!(
            "[GenerationUseCase] Session {} cancel accepted (pending: {})",
            request.session_id,
            response.pending
        );
        Ok(response)
    }

    /// Snapshot of the owner's active session.
    pub async fn active_session(&self, owner: &str) -> Option<GenerationSession> {
        self.sessions.active_session(owner).await
    }

    /// Finished sessions of the owner, most recent first.
    pub async fn history(&self, owner: &str) -> Vec<GenerationSession> {
        self.sessions.history(owner).await
    }

    /// A session of the owner, active or finished.
    pub async fn find_session(&self, owner: &str, session_id: &str) -> Option<GenerationSession> {
        self.sessions.find(owner, session_id).await
    }
}

/// Everything the persistence task needs, captured under the session lock.
struct PersistPlan {
    target_type: ItemKind,
    page_source: String,
    context: HierarchyContext,
    candidates: Vec<GenerationCandidate>,
    decisions: Vec<ReviewDecision>,
}

async fn run_generation(
    sessions: Arc<SessionManager>,
    generator: Arc<dyn ContentGenerator>,
    audit: AuditDispatcher,
    owner: String,
    actor: Actor,
    session_id: String,
    input: GenerationInput,
) -> Result<SubmitPromptResponse> {
    const OPERATION: &str = "complete_generation";
    let started = Instant::now();

    // A panicking adapter must still move the session to Error
    let outcome = AssertUnwindSafe(async {
        let output = generator.generate(&input).await?;
        CandidateNormalizer::normalize(input.target_type, output.candidates, input.quantity)
            .map(|candidates| (candidates, output.metadata))
    })
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| {
        Err(BacklogError::generation(format!(
            "generator panicked: {}",
            panic_message(panic.as_ref())
        )))
    });

    let (result, event_kind) = sessions
        .with_active(&owner, &session_id, OPERATION, |session| {
            if session.cancel_requested {
                let from = session.status();
                session.transition(SessionStatus::Cancelled, OPERATION)?;
                tracing::info!(
                    "[GenerationUseCase] Session {}: generation result discarded after cancel",
                    session_id
                );
                return Ok((
                    Err(BacklogError::Cancelled {
                        session_id: session_id.clone(),
                    }),
                    AuditEventKind::SessionCancelled { from },
                ));
            }

            match outcome {
                Ok((candidates, mut metadata)) => {
                    if metadata.elapsed_ms == 0 {
                        metadata.elapsed_ms = started.elapsed().as_millis() as u64;
                    }
                    let kind = AuditEventKind::GenerationCompleted {
                        candidate_count: candidates.len(),
                        elapsed_ms: metadata.elapsed_ms,
                        total_tokens: metadata.token_usage.map(|usage| usage.total_tokens),
                    };
                    session.candidates = Some(candidates.clone());
                    session.metadata = Some(metadata.clone());
                    session.transition(SessionStatus::Reviewing, OPERATION)?;
                    tracing::info!(
                        "[GenerationUseCase] Session {}: {} candidate(s) ready for review",
                        session_id,
                        candidates.len()
                    );
                    Ok((
                        Ok(SubmitPromptResponse {
                            candidates,
                            metadata,
                        }),
                        kind,
                    ))
                }
                Err(e) => {
                    tracing::error!(
                        "[GenerationUseCase] Session {}: generation failed: {}",
                        session_id,
                        e
                    );
                    session.fail(&e, OPERATION)?;
                    let kind = AuditEventKind::GenerationFailed {
                        error: e.to_string(),
                    };
                    Ok((Err(e), kind))
                }
            }
        })
        .await?;

    audit.emit(AuditEvent::new(&session_id, &owner, actor, event_kind));
    result
}

async fn run_persistence(
    sessions: Arc<SessionManager>,
    persistence: SelectivePersistenceEngine,
    audit: AuditDispatcher,
    owner: String,
    actor: Actor,
    session_id: String,
    plan: PersistPlan,
) -> Result<PersistenceReport> {
    const OPERATION: &str = "complete_persistence";

    let outcome = AssertUnwindSafe(persistence.persist(
        &session_id,
        &plan.page_source,
        plan.target_type,
        &plan.context,
        &plan.candidates,
        &plan.decisions,
    ))
    .catch_unwind()
    .await
    .unwrap_or_else(|panic| {
        Err(BacklogError::data_access(format!(
            "persistence panicked: {}",
            panic_message(panic.as_ref())
        )))
    });

    let (result, event_kind) = sessions
        .with_active(&owner, &session_id, OPERATION, |session| match outcome {
            Ok(report) => {
                let kind = AuditEventKind::ItemsPersisted {
                    success_count: report.success_count,
                    error_count: report.error_count,
                };
                session.report = Some(report.clone());
                session.transition(SessionStatus::Completed, OPERATION)?;
                Ok((Ok(report), kind))
            }
            Err(e) => {
                tracing::error!(
                    "[GenerationUseCase] Session {}: persistence failed: {}",
                    session_id,
                    e
                );
                session.fail(&e, OPERATION)?;
                let kind = AuditEventKind::PersistenceFailed {
                    error: e.to_string(),
                };
                Ok((Err(e), kind))
            }
        })
        .await?;

    audit.emit(AuditEvent::new(&session_id, &owner, actor, event_kind));
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
