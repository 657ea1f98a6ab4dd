use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::GenerationSession;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, RwLock};

/// Owner -> ID of the session whose context is being resolved.
type StartingMap = Arc<std::sync::Mutex<HashMap<String, String>>>;

/// Active session and finished sessions of one owner.
#[derive(Default)]
struct OwnerSlot {
    active: Option<GenerationSession>,
    /// Oldest first.
    history: VecDeque<GenerationSession>,
}

impl OwnerSlot {
    fn archive(&mut self, session: GenerationSession, limit: usize) {
        self.history.push_back(session);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }
}

/// Owns the generation sessions of every owner.
///
/// `SessionManager` is responsible for:
/// - Enforcing a single active session per owner, including sessions that
///   are still resolving their context
/// - Applying mutations to the active session under the owner's lock
/// - Moving sessions that reach a terminal status into the owner's history
///
/// Each owner has its own `tokio::sync::Mutex`; callers never hold it across an
/// await because every mutation is a synchronous closure.
///
/// Owners are the panels or connections of one process, a bounded set. A
/// slot is only created when an owner starts a session; lookups never add one,
/// and each slot keeps at most `history_limit` finished sessions.
pub struct SessionManager {
    slots: Arc<RwLock<HashMap<String, Arc<Mutex<OwnerSlot>>>>>,
    starting: StartingMap,
    /// Finished sessions kept per owner.
    history_limit: usize,
}

/// Holds the owner's start slot until dropped.
///
/// Returned by [`SessionManager::reserve`]; dropping it (including when the
/// starting future is cancelled) lets the owner start again.
pub struct StartReservation {
    starting: StartingMap,
    owner: String,
}

impl Drop for StartReservation {
    fn drop(&mut self) {
        self.starting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.owner);
    }
}

impl SessionManager {
    pub fn new(history_limit: usize) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            starting: Arc::new(std::sync::Mutex::new(HashMap::new())),
            history_limit: history_limit.max(1),
        }
    }

    async fn existing_slot(&self, owner: &str) -> Option<Arc<Mutex<OwnerSlot>>> {
        self.slots.read().await.get(owner).cloned()
    }

    async fn slot(&self, owner: &str) -> Arc<Mutex<OwnerSlot>> {
        if let Some(slot) = self.slots.read().await.get(owner) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots.entry(owner.to_string()).or_default().clone()
    }

    /// Claims the owner's start slot for `session_id`.
    ///
    /// # Errors
    ///
    /// `SessionAlreadyActive` if the owner has an active session or another
    /// session is still being started.
    pub async fn reserve(&self, owner: &str, session_id: &str) -> Result<StartReservation> {
        let slot = self.slot(owner).await;
        let slot = slot.lock().await;
        if let Some(active) = &slot.active {
            return Err(BacklogError::SessionAlreadyActive {
                owner: owner.to_string(),
                session_id: active.id().to_string(),
            });
        }

        let mut starting = self
            .starting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = starting.get(owner) {
            return Err(BacklogError::SessionAlreadyActive {
                owner: owner.to_string(),
                session_id: pending.clone(),
            });
        }
        starting.insert(owner.to_string(), session_id.to_string());

        Ok(StartReservation {
            starting: Arc::clone(&self.starting),
            owner: owner.to_string(),
        })
    }

    /// Installs `session` as the owner's active session.
    ///
    /// # Errors
    ///
    /// `SessionAlreadyActive` if another session is active for the owner.
    pub async fn begin(&self, owner: &str, session: GenerationSession) -> Result<()> {
        let slot = self.slot(owner).await;
        let mut slot = slot.lock().await;
        if let Some(active) = &slot.active {
            return Err(BacklogError::SessionAlreadyActive {
                owner: owner.to_string(),
                session_id: active.id().to_string(),
            });
        }
        tracing::debug!(
            "[SessionManager] Session {} is now active for owner {}",
            session.id(),
            owner
        );
        slot.active = Some(session);
        Ok(())
    }

    /// Records a session that never became active (failed resolution).
    pub async fn record_finished(&self, owner: &str, session: GenerationSession) {
        let slot = self.slot(owner).await;
        slot.lock().await.archive(session, self.history_limit);
    }

    /// Applies `mutation` to the owner's active session `session_id`.
    ///
    /// The session is moved to history when the mutation leaves it in a
    /// terminal status, whether the mutation succeeded or not.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` when `session_id` is already in history
    /// - `SessionNotFound` when the owner never had such a session
    /// - whatever `mutation` returns
    pub async fn with_active<T, F>(
        &self,
        owner: &str,
        session_id: &str,
        operation: &str,
        mutation: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut GenerationSession) -> Result<T>,
    {
        let Some(slot) = self.existing_slot(owner).await else {
            return Err(BacklogError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        };
        let mut slot = slot.lock().await;

        let is_active = slot
            .active
            .as_ref()
            .is_some_and(|active| active.id() == session_id);
        if !is_active {
            if let Some(finished) = slot.history.iter().find(|s| s.id() == session_id) {
                return Err(BacklogError::invalid_transition(
                    session_id,
                    finished.status(),
                    operation,
                ));
            }
            return Err(BacklogError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }

        let Some(session) = slot.active.as_mut() else {
            return Err(BacklogError::internal("active session vanished under lock"));
        };

        let result = mutation(session);

        if session.status().is_terminal() {
            if let Some(finished) = slot.active.take() {
                tracing::debug!(
                    "[SessionManager] Session {} finished as {}",
                    finished.id(),
                    finished.status()
                );
                slot.archive(finished, self.history_limit);
            }
        }

        result
    }

    /// Snapshot of the owner's active session.
    pub async fn active_session(&self, owner: &str) -> Option<GenerationSession> {
        let slot = self.existing_slot(owner).await?;
        let slot = slot.lock().await;
        slot.active.clone()
    }

    /// Finished sessions of the owner, most recent first.
    pub async fn history(&self, owner: &str) -> Vec<GenerationSession> {
        let Some(slot) = self.existing_slot(owner).await else {
            return Vec::new();
        };
        let slot = slot.lock().await;
        slot.history.iter().rev().cloned().collect()
    }

    /// Looks a session up in the owner's active slot or history.
    pub async fn find(&self, owner: &str, session_id: &str) -> Option<GenerationSession> {
        let slot = self.existing_slot(owner).await?;
        let slot = slot.lock().await;
        slot.active
            .iter()
            .chain(slot.history.iter())
            .find(|s| s.id() == session_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::brief;
    use backlog_core::audit::Actor;
    use backlog_core::generation::{GenerationRequest, SessionStatus};
    use backlog_core::hierarchy::{HierarchyContext, ItemKind};

    fn session() -> GenerationSession {
        let request =
            GenerationRequest::new(ItemKind::BusinessBrief, "BB-1", ItemKind::Initiative, "test")
                .unwrap();
        GenerationSession::new(
            request,
            "panel-1",
            Actor::new("user-1"),
            HierarchyContext::from_brief(brief("BB-1")),
        )
    }

    #[tokio::test]
    async fn test_single_active_session_per_owner() {
        let manager = SessionManager::new(5);
        let first = session();
        let first_id = first.id().to_string();
        manager.begin("panel-1", first).await.unwrap();

        let err = manager.begin("panel-1", session()).await.unwrap_err();
        assert!(matches!(
            err,
            BacklogError::SessionAlreadyActive { ref session_id, .. } if *session_id == first_id
        ));
        assert!(manager.reserve("panel-1", "s-next").await.is_err());

        // Other owners are independent
        manager.begin("panel-2", session()).await.unwrap();
    }

    #[tokio::test]
    async fn test_terminal_session_moves_to_history() {
        let manager = SessionManager::new(5);
        let s = session();
        let id = s.id().to_string();
        manager.begin("panel-1", s).await.unwrap();

        manager
            .with_active("panel-1", &id, "cancel", |s| {
                s.transition(SessionStatus::Cancelled, "cancel")
            })
            .await
            .unwrap();

        assert!(manager.active_session("panel-1").await.is_none());
        let history = manager.history("panel-1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status(), SessionStatus::Cancelled);

        let err = manager
            .with_active("panel-1", &id, "submit_prompt", |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BacklogError::InvalidTransition {
                status: SessionStatus::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let manager = SessionManager::new(5);
        let err = manager
            .with_active("panel-1", "nope", "cancel", |_| Ok(()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_newest_first() {
        let manager = SessionManager::new(2);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let s = session();
            ids.push(s.id().to_string());
            manager.record_finished("panel-1", s).await;
        }

        let history: Vec<String> = manager
            .history("panel-1")
            .await
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(history, vec![ids[2].clone(), ids[1].clone()]);
    }

    #[tokio::test]
    async fn test_reservation_blocks_a_second_start_until_dropped() {
        let manager = SessionManager::new(5);
        let reservation = manager.reserve("panel-1", "s-1").await.unwrap();

        let err = manager.reserve("panel-1", "s-2").await.err().unwrap();
        assert!(matches!(
            err,
            BacklogError::SessionAlreadyActive { ref session_id, .. } if session_id == "s-1"
        ));
        manager.reserve("panel-2", "s-3").await.unwrap();

        drop(reservation);
        manager.reserve("panel-1", "s-2").await.unwrap();
    }

    #[tokio::test]
    async fn test_lookups_do_not_create_owner_slots() {
        let manager = SessionManager::new(5);
        assert!(manager.active_session("ghost").await.is_none());
        assert!(manager.history("ghost").await.is_empty());
        assert!(manager.find("ghost", "s-1").await.is_none());
        assert!(
            manager
                .with_active("ghost", "s-1", "cancel", |_| Ok(()))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(manager.slots.read().await.is_empty());
    }
}
