use crate::app::AppContext;
use anyhow::Result;
use backlog_core::hierarchy::{BusinessBrief, WorkItemRepository};
use chrono::Utc;

pub async fn add(
    app: &AppContext,
    id: String,
    title: String,
    description: String,
    business_objective: Option<String>,
) -> Result<()> {
    let repository = app.repository().await?;
    let brief = BusinessBrief {
        id,
        title,
        description,
        business_objective,
        created_at: Utc::now().to_rfc3339(),
    };
    repository.save_business_brief(&brief).await?;
    println!("Saved business brief {}", brief.id);
    Ok(())
}

pub async fn list(app: &AppContext) -> Result<()> {
    let repository = app.repository().await?;
    let briefs = repository.list_business_briefs().await?;
    if briefs.is_empty() {
        println!("No business briefs yet. Add one with `backlog brief add`.");
        return Ok(());
    }
    for brief in briefs {
        println!("{:<12} {}", brief.id, brief.title);
    }
    Ok(())
}
