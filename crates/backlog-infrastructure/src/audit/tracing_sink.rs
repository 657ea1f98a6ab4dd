//! Audit sink that writes events to the `audit` tracing target.

use async_trait::async_trait;
use backlog_core::audit::{AuditEvent, EventSink};
use backlog_core::error::Result;

/// Logs each event as a structured `tracing` record.
///
/// The full event is attached as a JSON field so JSON log output keeps every
/// attribute.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl EventSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        let payload = serde_json::to_string(&event.kind)?;
        tracing::info!(
            target: "audit",
            event = event.name(),
            session_id = %event.session_id,
            owner = %event.owner,
            user_id = %event.actor.user_id,
            payload = %payload,
            "[Audit] {}",
            event.name()
        );
        Ok(())
    }
}
