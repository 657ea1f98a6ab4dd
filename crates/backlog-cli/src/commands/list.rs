use crate::app::AppContext;
use anyhow::Result;
use backlog_core::hierarchy::{ItemKind, WorkItemRepository};

pub async fn children(app: &AppContext, parent_type: ItemKind, parent_id: &str) -> Result<()> {
    let repository = app.repository().await?;
    let children = repository.list_children(parent_type, parent_id).await?;

    if children.is_empty() {
        println!("{} {} has no children", parent_type, parent_id);
        return Ok(());
    }
    for item in children {
        println!(
            "{:<38} {:<10} {:?}  {}",
            item.id,
            item.kind.as_str(),
            item.priority,
            item.title
        );
    }
    Ok(())
}
