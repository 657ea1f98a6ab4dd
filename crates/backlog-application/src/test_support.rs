//! Hand-written mocks shared by the unit tests of this crate.

use async_trait::async_trait;
use backlog_core::audit::{AuditEvent, EventSink};
use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::{
    ContentGenerator, GenerationInput, GenerationMetadata, GenerationOutput, RawCandidate,
};
use backlog_core::hierarchy::{
    BusinessBrief, ItemKind, Lineage, Priority, WorkItem, WorkItemRepository,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// In-memory repository with per-title write failures.
#[derive(Default)]
pub struct MockRepository {
    briefs: Mutex<HashMap<String, BusinessBrief>>,
    items: Mutex<HashMap<(ItemKind, String), WorkItem>>,
    inserted: Mutex<Vec<WorkItem>>,
    failing_titles: Mutex<HashSet<String>>,
    pub reads: AtomicUsize,
    /// Makes every insert panic instead of returning an error.
    pub panic_on_insert: AtomicBool,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_brief(&self, brief: BusinessBrief) {
        self.briefs.lock().unwrap().insert(brief.id.clone(), brief);
    }

    pub fn add_item(&self, item: WorkItem) {
        self.items
            .lock()
            .unwrap()
            .insert((item.kind, item.id.clone()), item);
    }

    pub fn fail_inserts_titled(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn inserted(&self) -> Vec<WorkItem> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkItemRepository for MockRepository {
    async fn find_business_brief(&self, id: &str) -> Result<Option<BusinessBrief>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.briefs.lock().unwrap().get(id).cloned())
    }

    async fn find_work_item(&self, kind: ItemKind, id: &str) -> Result<Option<WorkItem>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned())
    }

    async fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        tokio::task::yield_now().await;
        if self.panic_on_insert.load(Ordering::SeqCst) {
            panic!("storage driver fault on '{}'", item.title);
        }
        if self.failing_titles.lock().unwrap().contains(&item.title) {
            return Err(BacklogError::data_access(format!(
                "constraint violation on '{}'",
                item.title
            )));
        }
        self.inserted.lock().unwrap().push(item.clone());
        self.add_item(item.clone());
        Ok(())
    }

    async fn save_business_brief(&self, brief: &BusinessBrief) -> Result<()> {
        self.add_brief(brief.clone());
        Ok(())
    }

    async fn list_business_briefs(&self) -> Result<Vec<BusinessBrief>> {
        Ok(self.briefs.lock().unwrap().values().cloned().collect())
    }

    async fn list_children(&self, parent_kind: ItemKind, parent_id: &str) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.parent_id() == Some(parent_id))
            .filter(|item| item.kind.parent() == Some(parent_kind))
            .cloned()
            .collect())
    }
}

/// Generator returning a fixed script, optionally held until released.
pub struct ScriptedGenerator {
    response: Mutex<Option<Result<Vec<RawCandidate>>>>,
    gate: Option<Notify>,
    pub entered: Notify,
    pub calls: AtomicUsize,
    pub last_input: Mutex<Option<GenerationInput>>,
}

impl ScriptedGenerator {
    pub fn returning(candidates: Vec<RawCandidate>) -> Self {
        Self {
            response: Mutex::new(Some(Ok(candidates))),
            gate: None,
            entered: Notify::new(),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn failing(error: BacklogError) -> Self {
        Self {
            response: Mutex::new(Some(Err(error))),
            ..Self::returning(Vec::new())
        }
    }

    /// Holds `generate` until [`release`](Self::release) is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// `count` structured candidates titled "<prefix> 1".."<prefix> count".
    pub fn titled(prefix: &str, count: usize) -> Self {
        Self::returning(
            (1..=count)
                .map(|n| {
                    RawCandidate::from_value(json!({
                        "title": format!("{} {}", prefix, n),
                        "description": format!("Generated {} {}", prefix, n),
                        "priority": "high",
                    }))
                })
                .collect(),
        )
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, input: &GenerationInput) -> Result<GenerationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let candidates = self
            .response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))?;

        Ok(GenerationOutput {
            candidates,
            metadata: GenerationMetadata {
                elapsed_ms: 12,
                token_usage: None,
                prompt: format!("generate {} {}", input.quantity, input.target_type),
                model: Some("scripted".to_string()),
            },
        })
    }
}

/// Generator whose every call panics.
pub struct PanickingGenerator;

#[async_trait]
impl ContentGenerator for PanickingGenerator {
    async fn generate(&self, _input: &GenerationInput) -> Result<GenerationOutput> {
        panic!("provider SDK bug");
    }
}

/// Sink collecting every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
    pub fail: bool,
}

impl RecordingSink {
    /// A sink whose every `record` call fails.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        if self.fail {
            return Err(BacklogError::data_access("audit store offline"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Polls `condition` for up to one second.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn brief(id: &str) -> BusinessBrief {
    BusinessBrief {
        id: id.to_string(),
        title: "Self-service onboarding".to_string(),
        description: "Reduce onboarding time for new merchants".to_string(),
        business_objective: Some("Halve time-to-first-sale".to_string()),
        created_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn work_item(kind: ItemKind, id: &str, lineage: Lineage) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        kind,
        title: format!("{} {}", kind, id),
        description: format!("Description of {}", id),
        acceptance_criteria: vec!["Works".to_string()],
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

/// Seeds BB-1 > INIT-1 > FEAT-1 > EPIC-1.
pub fn seeded_repository() -> MockRepository {
    let repo = MockRepository::new();
    repo.add_brief(brief("BB-1"));

    let mut lineage = Lineage::default();
    lineage.set(ItemKind::BusinessBrief, "BB-1");
    repo.add_item(work_item(ItemKind::Initiative, "INIT-1", lineage.clone()));

    lineage.set(ItemKind::Initiative, "INIT-1");
    repo.add_item(work_item(ItemKind::Feature, "FEAT-1", lineage.clone()));

    lineage.set(ItemKind::Feature, "FEAT-1");
    repo.add_item(work_item(ItemKind::Epic, "EPIC-1", lineage));

    repo
}
