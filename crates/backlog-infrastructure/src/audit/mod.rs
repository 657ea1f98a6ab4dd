//! Audit event sinks.
//!
//! - `jsonl_sink`: append-only JSON-lines file
//! - `tracing_sink`: structured log records under the `audit` target
//! - `FanoutAuditSink`: forwards each event to several sinks

mod jsonl_sink;
mod tracing_sink;

pub use jsonl_sink::JsonlAuditSink;
pub use tracing_sink::TracingAuditSink;

use async_trait::async_trait;
use backlog_core::audit::{AuditEvent, EventSink};
use backlog_core::error::Result;
use std::sync::Arc;

/// Records every event in each inner sink.
///
/// Every sink is attempted; the first failure is returned after all of them
/// ran.
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for FanoutAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(event).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
