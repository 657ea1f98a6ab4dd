use super::event::AuditEvent;
use crate::error::Result;
use async_trait::async_trait;

/// Transport for audit records (compliance log, message bus, ...).
///
/// The orchestrator never calls a sink directly: events go through a
/// background dispatcher, and any error returned here is logged and dropped.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<()>;
}
