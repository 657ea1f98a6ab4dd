//! Audit trail domain module.
//!
//! - `event`: `AuditEvent`, its `AuditEventKind` and the acting `Actor`
//! - `sink`: `EventSink` capability

mod event;
mod sink;

pub use event::{Actor, AuditEvent, AuditEventKind};
pub use sink::EventSink;
