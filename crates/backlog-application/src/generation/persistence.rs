//! Selective persistence of reviewed candidates.

use super::normalizer::CandidateNormalizer;
use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::{
    GenerationCandidate, PersistOutcome, PersistedItem, PersistenceReport, ReviewDecision,
};
use backlog_core::hierarchy::{HierarchyContext, ItemKind, Lineage, WorkItem, WorkItemRepository};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Commits the kept candidates of a review.
///
/// Writes are independent: one failed insert does not roll back or block the
/// others. At most `max_concurrent_writes` inserts are in flight, and the
/// report lists items in decision order regardless of completion order.
#[derive(Clone)]
pub struct SelectivePersistenceEngine {
    repository: Arc<dyn WorkItemRepository>,
    max_concurrent_writes: usize,
}

impl SelectivePersistenceEngine {
    pub fn new(repository: Arc<dyn WorkItemRepository>, max_concurrent_writes: usize) -> Self {
        Self {
            repository,
            max_concurrent_writes: max_concurrent_writes.max(1),
        }
    }

    /// Checks that `decisions` cover every candidate exactly once.
    pub fn validate_decisions(
        candidates: &[GenerationCandidate],
        decisions: &[ReviewDecision],
    ) -> Result<()> {
        let known: HashSet<&str> = candidates.iter().map(|c| c.candidate_id.as_str()).collect();
        let mut seen = HashSet::with_capacity(decisions.len());

        for decision in decisions {
            let id = decision.candidate_id.as_str();
            if !known.contains(id) {
                return Err(BacklogError::invalid_review(format!(
                    "unknown candidate '{}'",
                    id
                )));
            }
            if !seen.insert(id) {
                return Err(BacklogError::invalid_review(format!(
                    "duplicate decision for candidate '{}'",
                    id
                )));
            }
            if let Some(edited) = &decision.edited {
                if !decision.is_kept() {
                    return Err(BacklogError::invalid_review(format!(
                        "candidate '{}' is discarded but carries an edit",
                        id
                    )));
                }
                if edited.title.trim().is_empty() {
                    return Err(BacklogError::invalid_review(format!(
                        "edited candidate '{}' has an empty title",
                        id
                    )));
                }
            }
        }

        if let Some(missing) = candidates
            .iter()
            .find(|c| !seen.contains(c.candidate_id.as_str()))
        {
            return Err(BacklogError::invalid_review(format!(
                "no decision for candidate '{}'",
                missing.candidate_id
            )));
        }

        Ok(())
    }

    /// Inserts one work item per kept decision.
    ///
    /// Discarded decisions produce no write and no report entry. The edited
    /// payload, when present, is persisted instead of the generated one.
    pub async fn persist(
        &self,
        session_id: &str,
        page_source: &str,
        target_type: ItemKind,
        context: &HierarchyContext,
        candidates: &[GenerationCandidate],
        decisions: &[ReviewDecision],
    ) -> Result<PersistenceReport> {
        Self::validate_decisions(candidates, decisions)?;

        let by_id: HashMap<&str, &GenerationCandidate> = candidates
            .iter()
            .map(|c| (c.candidate_id.as_str(), c))
            .collect();

        let mut kept = Vec::new();
        for decision in decisions.iter().filter(|d| d.is_kept()) {
            let original = by_id.get(decision.candidate_id.as_str()).ok_or_else(|| {
                BacklogError::internal(format!(
                    "candidate '{}' vanished after validation",
                    decision.candidate_id
                ))
            })?;
            let mut payload = decision.edited.clone().unwrap_or_else(|| (*original).clone());
            payload.candidate_id = decision.candidate_id.clone();
            CandidateNormalizer::fill_defaults(&mut payload, target_type);
            kept.push(payload);
        }
        let discarded = decisions.len() - kept.len();

        if kept.is_empty() {
            tracing::info!(
                "[SelectivePersistence] Session {}: all {} candidate(s) discarded, nothing to write",
                session_id,
                discarded
            );
            return Ok(PersistenceReport::from_items(Vec::new(), discarded));
        }

        let lineage = context.child_lineage();
        let source = format!("generation:{}:{}", session_id, page_source);

        tracing::debug!(
            "[SelectivePersistence] Session {}: writing {} {}(s) with concurrency {}",
            session_id,
            kept.len(),
            target_type,
            self.max_concurrent_writes
        );

        let items: Vec<PersistedItem> = stream::iter(kept)
            .map(|candidate| {
                let repository = Arc::clone(&self.repository);
                let item = build_work_item(target_type, &candidate, &lineage, &source);
                async move {
                    let outcome = match repository.insert_work_item(&item).await {
                        Ok(()) => PersistOutcome::Success,
                        Err(e) => {
                            tracing::warn!(
                                "[SelectivePersistence] Failed to persist candidate {} ('{}'): {}",
                                candidate.candidate_id,
                                candidate.title,
                                e
                            );
                            PersistOutcome::Failure {
                                reason: e.to_string(),
                            }
                        }
                    };
                    let item_id = matches!(outcome, PersistOutcome::Success).then_some(item.id);
                    PersistedItem {
                        candidate_id: candidate.candidate_id,
                        item_id,
                        item_type: target_type,
                        title: item.title,
                        lineage: item.lineage,
                        outcome,
                    }
                }
            })
            .buffered(self.max_concurrent_writes)
            .collect()
            .await;

        let report = PersistenceReport::from_items(items, discarded);
        tracing::info!(
            "[SelectivePersistence] Session {}: {} saved, {} failed, {} discarded",
            session_id,
            report.success_count,
            report.error_count,
            report.discarded_count
        );
        Ok(report)
    }
}

fn build_work_item(
    kind: ItemKind,
    candidate: &GenerationCandidate,
    lineage: &Lineage,
    source: &str,
) -> WorkItem {
    WorkItem {
        id: Uuid::new_v4().to_string(),
        kind,
        title: candidate.title.trim().to_string(),
        description: candidate.description.clone(),
        acceptance_criteria: candidate.acceptance_criteria.clone(),
        priority: candidate.priority,
        business_value: candidate.business_value.clone(),
        rationale: candidate.rationale.clone(),
        tags: candidate.tags.clone(),
        labels: candidate.labels.clone(),
        story_points: candidate.story_points,
        estimated_effort: candidate.estimated_effort.clone(),
        status: kind.committed_status(),
        lineage: lineage.clone(),
        source: Some(source.to_string()),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}
