//! Prompt rendering for candidate generation.

use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::GenerationInput;
use backlog_core::hierarchy::ItemKind;
use minijinja::{Environment, context};
use serde::Serialize;

const TEMPLATE_NAME: &str = "generate_children";

const GENERATE_CHILDREN: &str = r#"You are helping a product team break work down into a delivery backlog.

Hierarchy context, from the business brief down to the parent:
{% for level in levels %}
- {{ level.kind }} {{ level.id }}: {{ level.title }}
{% if level.description %}
  {{ level.description }}
{% endif %}
{% endfor %}

Propose exactly {{ quantity }} {{ target }} item(s) that belong directly under {{ parent_kind }} {{ parent_id }}.
Each item must be distinct and must not repeat work already described above.
{% if guidance %}

Additional guidance from the reviewer:
{{ guidance }}
{% endif %}

Respond with a JSON array only, no prose. Each element is an object with:
- "title": short imperative title
- "description": one or two paragraphs
- "acceptanceCriteria": array of testable statements
- "priority": one of "low", "medium", "high", "critical"
- "businessValue": why this matters to the business
- "rationale": why this item follows from its parent
- "tags": array of short keywords
{% if story_points %}
- "storyPoints": relative size as an integer (1, 2, 3, 5, 8 or 13)
{% endif %}
{% if estimated_effort %}
- "estimatedEffort": rough duration such as "2 sprints"
{% endif %}
"#;

#[derive(Serialize)]
struct LevelView<'a> {
    kind: &'static str,
    id: &'a str,
    title: &'a str,
    description: &'a str,
}

/// Renders the generation prompt from a resolved hierarchy.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(TEMPLATE_NAME, GENERATE_CHILDREN)
            .map_err(|e| BacklogError::internal(format!("invalid prompt template: {}", e)))?;
        Ok(Self { env })
    }

    pub fn render(&self, input: &GenerationInput) -> Result<String> {
        let levels: Vec<LevelView<'_>> = input
            .context
            .levels()
            .into_iter()
            .map(|level| LevelView {
                kind: level.kind.as_str(),
                id: level.id,
                title: level.title,
                description: level.description,
            })
            .collect();

        let guidance = input
            .additional_context
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        let template = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| BacklogError::internal(format!("prompt template missing: {}", e)))?;

        template
            .render(context! {
                levels => levels,
                quantity => input.quantity,
                target => input.target_type.as_str(),
                parent_kind => input.context.parent_kind.as_str(),
                parent_id => input.context.parent_id(),
                guidance => guidance,
                story_points => input.target_type == ItemKind::Story,
                estimated_effort => matches!(input.target_type, ItemKind::Feature | ItemKind::Epic),
            })
            .map_err(|e| BacklogError::generation(format!("failed to render prompt: {}", e)))
    }
}
