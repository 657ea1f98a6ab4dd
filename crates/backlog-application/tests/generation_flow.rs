mod common;

use backlog_application::dto::{
    StartGenerationRequest, SubmitPromptRequest, SubmitReviewRequest,
};
use backlog_core::BacklogError;
use backlog_core::audit::Actor;
use backlog_core::generation::{ReviewDecision, SaveOutcome, SessionStatus};
use backlog_core::hierarchy::{ItemKind, Lineage, WorkItemRepository};
use backlog_infrastructure::{InMemoryWorkItemRepository, TomlWorkItemRepository};
use common::{CollectingSink, FlakyRepository, brief, item, usecase};
use std::sync::Arc;
use tempfile::TempDir;

const OWNER: &str = "backlog-panel";

fn actor() -> Actor {
    Actor::new("u-42").with_display_name("Dana")
}

fn start(parent_type: ItemKind, parent_id: &str, target_type: ItemKind) -> StartGenerationRequest {
    StartGenerationRequest {
        parent_type,
        parent_id: parent_id.to_string(),
        target_type,
        page_source: "brief-detail".to_string(),
    }
}

fn prompt(session_id: &str, quantity: u32) -> SubmitPromptRequest {
    SubmitPromptRequest {
        session_id: session_id.to_string(),
        quantity,
        additional_context: None,
    }
}

#[tokio::test]
async fn test_brief_to_initiatives_keeps_two_of_three() {
    let repo = Arc::new(InMemoryWorkItemRepository::new());
    repo.save_business_brief(&brief("BB-001")).await.unwrap();
    let sink = Arc::new(CollectingSink::default());
    let usecase = usecase(repo.clone(), sink.clone());

    let session_id = usecase
        .start_session(
            OWNER,
            &actor(),
            start(ItemKind::BusinessBrief, "BB-001", ItemKind::Initiative),
        )
        .await
        .unwrap()
        .session_id;

    let generated = usecase
        .submit_prompt(OWNER, &actor(), prompt(&session_id, 3))
        .await
        .unwrap();
    assert_eq!(generated.candidates.len(), 3);
    assert_eq!(generated.metadata.token_usage.map(|u| u.total_tokens), Some(150));

    let decisions = vec![
        ReviewDecision::kept(generated.candidates[0].candidate_id.clone()),
        ReviewDecision::discarded(generated.candidates[1].candidate_id.clone()),
        ReviewDecision::kept(generated.candidates[2].candidate_id.clone()),
    ];
    let review = usecase
        .submit_review(
            OWNER,
            &actor(),
            SubmitReviewRequest {
                session_id: session_id.clone(),
                decisions,
            },
        )
        .await
        .unwrap();

    assert_eq!(review.persisted_items.len(), 2);
    assert_eq!(review.success_count, 2);
    assert_eq!(review.error_count, 0);

    let initiatives = repo.items_of_kind(ItemKind::Initiative).await;
    assert_eq!(initiatives.len(), 2);
    for initiative in &initiatives {
        assert_eq!(initiative.lineage.business_brief_id.as_deref(), Some("BB-001"));
        assert_eq!(initiative.acceptance_criteria, vec!["first", "second"]);
    }

    let finished = usecase.history(OWNER).await;
    assert_eq!(finished[0].status(), SessionStatus::Completed);
    assert_eq!(finished[0].actor.display_name.as_deref(), Some("Dana"));
}

#[tokio::test]
async fn test_dangling_feature_reference_fails_start() {
    let repo = Arc::new(InMemoryWorkItemRepository::new());
    repo.save_business_brief(&brief("BB-001")).await.unwrap();
    let mut lineage = Lineage::default();
    lineage.set(ItemKind::BusinessBrief, "BB-001");
    lineage.set(ItemKind::Initiative, "INIT-1");
    lineage.set(ItemKind::Feature, "FEAT-DELETED");
    repo.insert_work_item(&item(ItemKind::Epic, "EPIC-9", lineage))
        .await
        .unwrap();

    let usecase = usecase(repo.clone(), Arc::new(CollectingSink::default()));
    let err = usecase
        .start_session(OWNER, &actor(), start(ItemKind::Epic, "EPIC-9", ItemKind::Story))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BacklogError::BrokenAncestryChain {
            level: ItemKind::Feature,
            ..
        }
    ));
    assert!(usecase.active_session(OWNER).await.is_none());
    assert_eq!(usecase.history(OWNER).await[0].status(), SessionStatus::Error);
}

#[tokio::test]
async fn test_partial_write_failures_still_complete() {
    let inner = Arc::new(InMemoryWorkItemRepository::new());
    inner.save_business_brief(&brief("BB-001")).await.unwrap();
    let repo = Arc::new(FlakyRepository::new(inner.clone()));
    repo.reject("Initiative 2 for BB-001");
    repo.reject("Initiative 4 for BB-001");

    let usecase = usecase(repo, Arc::new(CollectingSink::default()));
    let session_id = usecase
        .start_session(
            OWNER,
            &actor(),
            start(ItemKind::BusinessBrief, "BB-001", ItemKind::Initiative),
        )
        .await
        .unwrap()
        .session_id;
    let generated = usecase
        .submit_prompt(OWNER, &actor(), prompt(&session_id, 5))
        .await
        .unwrap();

    let decisions = generated
        .candidates
        .iter()
        .map(|c| ReviewDecision::kept(c.candidate_id.clone()))
        .collect();
    let review = usecase
        .submit_review(
            OWNER,
            &actor(),
            SubmitReviewRequest {
                session_id,
                decisions,
            },
        )
        .await
        .unwrap();

    assert_eq!(review.persisted_items.len(), 5);
    assert_eq!(review.success_count, 3);
    assert_eq!(review.error_count, 2);
    assert_eq!(review.outcome, SaveOutcome::PartiallySaved);
    assert!(!review.persisted_items[1].is_success());
    assert!(!review.persisted_items[3].is_success());
    assert_eq!(inner.item_count().await, 3);
    assert_eq!(usecase.history(OWNER).await[0].status(), SessionStatus::Completed);
}

#[tokio::test]
async fn test_all_discarded_completes_without_writes() {
    let repo = Arc::new(InMemoryWorkItemRepository::new());
    repo.save_business_brief(&brief("BB-001")).await.unwrap();
    let usecase = usecase(repo.clone(), Arc::new(CollectingSink::default()));

    let session_id = usecase
        .start_session(
            OWNER,
            &actor(),
            start(ItemKind::BusinessBrief, "BB-001", ItemKind::Initiative),
        )
        .await
        .unwrap()
        .session_id;
    let generated = usecase
        .submit_prompt(OWNER, &actor(), prompt(&session_id, 2))
        .await
        .unwrap();
    let decisions = generated
        .candidates
        .iter()
        .map(|c| ReviewDecision::discarded(c.candidate_id.clone()))
        .collect();

    let review = usecase
        .submit_review(
            OWNER,
            &actor(),
            SubmitReviewRequest {
                session_id,
                decisions,
            },
        )
        .await
        .unwrap();

    assert_eq!(review.success_count, 0);
    assert_eq!(review.error_count, 0);
    assert_eq!(review.outcome, SaveOutcome::NothingKept);
    assert_eq!(repo.item_count().await, 0);
}

#[tokio::test]
async fn test_edited_story_is_persisted_to_toml_backlog() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("backlog.toml");
    let repo = Arc::new(TomlWorkItemRepository::open(path.clone()).await.unwrap());

    repo.save_business_brief(&brief("BB-001")).await.unwrap();
    let mut lineage = Lineage::default();
    lineage.set(ItemKind::BusinessBrief, "BB-001");
    repo.insert_work_item(&item(ItemKind::Initiative, "INIT-1", lineage.clone()))
        .await
        .unwrap();
    lineage.set(ItemKind::Initiative, "INIT-1");
    repo.insert_work_item(&item(ItemKind::Feature, "FEAT-1", lineage.clone()))
        .await
        .unwrap();
    lineage.set(ItemKind::Feature, "FEAT-1");
    repo.insert_work_item(&item(ItemKind::Epic, "EPIC-1", lineage))
        .await
        .unwrap();

    let usecase = usecase(repo.clone(), Arc::new(CollectingSink::default()));
    let session_id = usecase
        .start_session(OWNER, &actor(), start(ItemKind::Epic, "EPIC-1", ItemKind::Story))
        .await
        .unwrap()
        .session_id;
    let generated = usecase
        .submit_prompt(OWNER, &actor(), prompt(&session_id, 1))
        .await
        .unwrap();

    let mut edited = generated.candidates[0].clone();
    edited.title = "Merchant uploads a logo".to_string();
    edited.story_points = Some(5);
    usecase
        .submit_review(
            OWNER,
            &actor(),
            SubmitReviewRequest {
                session_id,
                decisions: vec![ReviewDecision::kept_with_edit(
                    edited.candidate_id.clone(),
                    edited,
                )],
            },
        )
        .await
        .unwrap();

    let reopened = TomlWorkItemRepository::open(path).await.unwrap();
    let stories = reopened
        .list_children(ItemKind::Epic, "EPIC-1")
        .await
        .unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].title, "Merchant uploads a logo");
    assert_eq!(stories[0].story_points, Some(5));
    assert_eq!(stories[0].lineage.feature_id.as_deref(), Some("FEAT-1"));
    assert_eq!(stories[0].lineage.initiative_id.as_deref(), Some("INIT-1"));
    assert_eq!(stories[0].lineage.business_brief_id.as_deref(), Some("BB-001"));
}
