//! On-disk data transfer objects.

mod backlog_document;

pub use backlog_document::{
    BACKLOG_DOCUMENT_VERSION, BacklogDocument, BusinessBriefRow, WorkItemRow,
};
