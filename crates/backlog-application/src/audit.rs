//! Non-blocking audit event dispatch.

use backlog_core::audit::{AuditEvent, EventSink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Hands audit events to a background task that forwards them to an `EventSink`.
///
/// `emit` never waits: when the buffer is full or the drain task is gone the
/// event is dropped and a warning is logged. Sink failures are logged by the
/// drain task and never reach the caller.
#[derive(Clone)]
pub struct AuditDispatcher {
    sender: mpsc::Sender<AuditEvent>,
}

impl AuditDispatcher {
    /// Spawns the drain task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn EventSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = sink.record(&event).await {
                    tracing::warn!(
                        target: "audit",
                        "[AuditDispatcher] Failed to record {} for session {}: {}",
                        event.name(),
                        event.session_id,
                        e
                    );
                }
            }
            tracing::debug!(target: "audit", "[AuditDispatcher] Channel closed, drain task exiting");
        });

        (Self { sender }, handle)
    }

    pub fn emit(&self, event: AuditEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    target: "audit",
                    "[AuditDispatcher] Buffer full, dropping {} for session {}",
                    event.name(),
                    event.session_id
                );
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    target: "audit",
                    "[AuditDispatcher] Drain task stopped, dropping {} for session {}",
                    event.name(),
                    event.session_id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, eventually};
    use backlog_core::audit::{Actor, AuditEventKind};

    fn event(session: &str) -> AuditEvent {
        AuditEvent::new(
            session,
            "panel-1",
            Actor::new("user-1"),
            AuditEventKind::GenerationFailed {
                error: "timeout".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_events_reach_sink_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, handle) = AuditDispatcher::spawn(sink.clone(), 8);

        dispatcher.emit(event("s-1"));
        dispatcher.emit(event("s-2"));
        drop(dispatcher);
        handle.await.unwrap();

        let sessions: Vec<String> = sink.events().into_iter().map(|e| e.session_id).collect();
        assert_eq!(sessions, vec!["s-1", "s-2"]);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink::failing());
        let (dispatcher, handle) = AuditDispatcher::spawn(sink.clone(), 8);

        dispatcher.emit(event("s-1"));
        drop(dispatcher);
        handle.await.unwrap();
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_emit_after_drain_stops_does_not_panic() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, handle) = AuditDispatcher::spawn(sink.clone(), 1);
        handle.abort();
        assert!(eventually(|| dispatcher.sender.is_closed()).await);

        dispatcher.emit(event("s-1"));
        assert!(sink.events().is_empty());
    }
}
