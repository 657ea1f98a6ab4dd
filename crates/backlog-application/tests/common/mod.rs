#![allow(dead_code)]

use async_trait::async_trait;
use backlog_application::{AuditDispatcher, GenerationUseCase};
use backlog_core::audit::{AuditEvent, EventSink};
use backlog_core::config::BacklogConfig;
use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::{
    ContentGenerator, GenerationInput, GenerationMetadata, GenerationOutput, RawCandidate,
    TokenUsage,
};
use backlog_core::hierarchy::{
    BusinessBrief, ItemKind, Lineage, Priority, WorkItem, WorkItemRepository,
};
use backlog_infrastructure::InMemoryWorkItemRepository;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Returns `quantity` candidates titled after the parent.
pub struct EchoGenerator;

#[async_trait]
impl ContentGenerator for EchoGenerator {
    async fn generate(&self, input: &GenerationInput) -> Result<GenerationOutput> {
        let parent = input.context.parent_id().to_string();
        let candidates = (1..=input.quantity)
            .map(|n| {
                RawCandidate::from_value(json!({
                    "title": format!("{} {} for {}", input.target_type, n, parent),
                    "description": "generated",
                    "acceptanceCriteria": ["first", "second"],
                    "priority": "high"
                }))
            })
            .collect();

        Ok(GenerationOutput {
            candidates,
            metadata: GenerationMetadata {
                elapsed_ms: 5,
                token_usage: Some(TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 50,
                    total_tokens: 150,
                }),
                prompt: format!("Generate {} {}", input.quantity, input.target_type),
                model: Some("echo".to_string()),
            },
        })
    }
}

/// Delegates to an inner repository but refuses inserts with chosen titles.
pub struct FlakyRepository {
    pub inner: Arc<InMemoryWorkItemRepository>,
    rejected_titles: Mutex<HashSet<String>>,
}

impl FlakyRepository {
    pub fn new(inner: Arc<InMemoryWorkItemRepository>) -> Self {
        Self {
            inner,
            rejected_titles: Mutex::new(HashSet::new()),
        }
    }

    pub fn reject(&self, title: &str) {
        self.rejected_titles.lock().unwrap().insert(title.to_string());
    }
}

#[async_trait]
impl WorkItemRepository for FlakyRepository {
    async fn find_business_brief(&self, id: &str) -> Result<Option<BusinessBrief>> {
        self.inner.find_business_brief(id).await
    }

    async fn find_work_item(&self, kind: ItemKind, id: &str) -> Result<Option<WorkItem>> {
        self.inner.find_work_item(kind, id).await
    }

    async fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        if self.rejected_titles.lock().unwrap().contains(&item.title) {
            return Err(BacklogError::data_access("unique constraint violated"));
        }
        self.inner.insert_work_item(item).await
    }

    async fn save_business_brief(&self, brief: &BusinessBrief) -> Result<()> {
        self.inner.save_business_brief(brief).await
    }

    async fn list_business_briefs(&self) -> Result<Vec<BusinessBrief>> {
        self.inner.list_business_briefs().await
    }

    async fn list_children(&self, parent_kind: ItemKind, parent_id: &str) -> Result<Vec<WorkItem>> {
        self.inner.list_children(parent_kind, parent_id).await
    }
}

#[derive(Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub fn brief(id: &str) -> BusinessBrief {
    BusinessBrief {
        id: id.to_string(),
        title: "Merchant onboarding".to_string(),
        description: "Let merchants onboard without a sales call".to_string(),
        business_objective: None,
        created_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn item(kind: ItemKind, id: &str, lineage: Lineage) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        kind,
        title: id.to_string(),
        description: String::new(),
        acceptance_criteria: Vec::new(),
        priority: Priority::Medium,
        business_value: String::new(),
        rationale: String::new(),
        tags: Vec::new(),
        labels: Vec::new(),
        story_points: None,
        estimated_effort: None,
        status: kind.committed_status(),
        lineage,
        source: None,
        created_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn usecase(
    repository: Arc<dyn WorkItemRepository>,
    sink: Arc<CollectingSink>,
) -> GenerationUseCase {
    let config = BacklogConfig::default();
    let (audit, _drain) = AuditDispatcher::spawn(sink, config.audit.channel_capacity);
    GenerationUseCase::new(repository, Arc::new(EchoGenerator), audit, &config)
}
