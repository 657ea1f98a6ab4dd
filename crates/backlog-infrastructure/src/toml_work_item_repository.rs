//! TOML-file backed implementation of `WorkItemRepository`.

use crate::dto::{BacklogDocument, BusinessBriefRow, WorkItemRow};
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use backlog_core::error::{BacklogError, Result};
use backlog_core::hierarchy::{BusinessBrief, ItemKind, WorkItem, WorkItemRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Keeps the whole backlog in one TOML document.
///
/// Reads are served from an in-memory mirror. Writes are serialized through
/// a mutex and committed on a blocking thread under an exclusive file lock;
/// the mirror is replaced only after the file write succeeded.
pub struct TomlWorkItemRepository {
    file: Arc<AtomicTomlFile<BacklogDocument>>,
    cache: RwLock<BacklogDocument>,
    write_lock: Mutex<()>,
}

impl TomlWorkItemRepository {
    /// Opens the document at `path`; a missing file starts an empty backlog.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let file = Arc::new(AtomicTomlFile::<BacklogDocument>::new(path));
        let loader = Arc::clone(&file);
        let document = tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| BacklogError::internal(format!("load task failed: {}", e)))??
            .unwrap_or_default();

        tracing::debug!(
            "[TomlWorkItemRepository] Loaded {} brief(s) and {} item(s) from {}",
            document.briefs.len(),
            document.items.len(),
            file.path().display()
        );

        Ok(Self {
            file,
            cache: RwLock::new(document),
            write_lock: Mutex::new(()),
        })
    }

    /// Runs `change` as a locked read-modify-write of the file, then swaps the
    /// written document into the mirror.
    ///
    /// The file is re-read under the lock, so rows written by another process
    /// since `open` are kept.
    async fn commit<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut BacklogDocument) -> Result<()> + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;

        let file = Arc::clone(&self.file);
        let written = tokio::task::spawn_blocking(move || {
            file.update(BacklogDocument::default(), |document| {
                change(document)?;
                Ok::<_, BacklogError>(document.clone())
            })
        })
        .await
        .map_err(|e| BacklogError::internal(format!("save task failed: {}", e)))??;

        *self.cache.write().await = written;
        Ok(())
    }
}

#[async_trait]
impl WorkItemRepository for TomlWorkItemRepository {
    async fn find_business_brief(&self, id: &str) -> Result<Option<BusinessBrief>> {
        let cache = self.cache.read().await;
        Ok(cache
            .briefs
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .map(BusinessBrief::from))
    }

    async fn find_work_item(&self, kind: ItemKind, id: &str) -> Result<Option<WorkItem>> {
        let row = {
            let cache = self.cache.read().await;
            cache
                .items
                .iter()
                .find(|row| row.kind == kind && row.id == id)
                .cloned()
        };
        row.map(WorkItem::try_from).transpose()
    }

    async fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        let row = WorkItemRow::try_from(item)?;
        self.commit(move |document| {
            if document.items.iter().any(|existing| existing.id == row.id) {
                return Err(BacklogError::data_access(format!(
                    "work item '{}' already exists",
                    row.id
                )));
            }
            document.items.push(row);
            Ok(())
        })
        .await?;

        tracing::debug!(
            "[TomlWorkItemRepository] Inserted {} '{}'",
            item.kind,
            item.id
        );
        Ok(())
    }

    async fn save_business_brief(&self, brief: &BusinessBrief) -> Result<()> {
        let row = BusinessBriefRow::from(brief);
        self.commit(move |document| {
            match document.briefs.iter_mut().find(|existing| existing.id == row.id) {
                Some(existing) => *existing = row,
                None => document.briefs.push(row),
            }
            Ok(())
        })
        .await
    }

    async fn list_business_briefs(&self) -> Result<Vec<BusinessBrief>> {
        let cache = self.cache.read().await;
        Ok(cache.briefs.iter().cloned().map(BusinessBrief::from).collect())
    }

    async fn list_children(&self, parent_kind: ItemKind, parent_id: &str) -> Result<Vec<WorkItem>> {
        let Some(child_kind) = parent_kind.child() else {
            return Ok(Vec::new());
        };

        let rows: Vec<WorkItemRow> = {
            let cache = self.cache.read().await;
            cache
                .items
                .iter()
                .filter(|row| row.kind == child_kind)
                .cloned()
                .collect()
        };

        let mut children = Vec::new();
        for row in rows {
            let item = WorkItem::try_from(row)?;
            if item.parent_id() == Some(parent_id) {
                children.push(item);
            }
        }
        Ok(children)
    }
}
