//! Post-processing of raw generator output.
//!
//! Turns `RawCandidate`s into typed `GenerationCandidate`s: recovers JSON
//! embedded in provider text, reads fields leniently (snake_case or
//! camelCase, strings or numbers), fills documented defaults and assigns
//! session-scoped candidate IDs.

use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::{DEFAULT_ACCEPTANCE_CRITERION, GenerationCandidate, RawCandidate};
use backlog_core::hierarchy::{ItemKind, Priority};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Matches a fenced code block, optionally tagged `json`.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex"));

/// Nested string encodings unwrapped before giving up.
const MAX_REPARSE_DEPTH: usize = 3;

/// Keys under which providers wrap candidate arrays.
const WRAPPER_KEYS: [&str; 3] = ["items", "candidates", "results"];

pub struct CandidateNormalizer;

impl CandidateNormalizer {
    /// Normalizes a generator result for `target_type`.
    ///
    /// # Errors
    ///
    /// - `CandidateRecovery` when a `NeedsReparse` payload holds no usable JSON
    /// - `MalformedCandidate` when a candidate has no title
    /// - `Generation` when nothing usable was returned
    pub fn normalize(
        target_type: ItemKind,
        raw: Vec<RawCandidate>,
        quantity: u32,
    ) -> Result<Vec<GenerationCandidate>> {
        let mut objects = Vec::new();
        for (index, candidate) in raw.into_iter().enumerate() {
            match candidate {
                RawCandidate::Structured(map) => objects.push(map),
                RawCandidate::NeedsReparse(text) => {
                    let recovered = recover(&text, 0).map_err(|message| {
                        tracing::warn!(
                            "[CandidateNormalizer] Failed to recover candidate {}: {}",
                            index,
                            message
                        );
                        BacklogError::CandidateRecovery { index, message }
                    })?;
                    tracing::debug!(
                        "[CandidateNormalizer] Recovered {} candidate(s) from raw entry {}",
                        recovered.len(),
                        index
                    );
                    objects.extend(recovered);
                }
            }
        }

        if objects.is_empty() {
            return Err(BacklogError::generation("generator returned no candidates"));
        }

        let limit = quantity as usize;
        if objects.len() > limit {
            tracing::warn!(
                "[CandidateNormalizer] Generator returned {} candidates, keeping the first {}",
                objects.len(),
                limit
            );
            objects.truncate(limit);
        }

        objects
            .into_iter()
            .enumerate()
            .map(|(index, map)| {
                let mut candidate = from_map(index, &map, target_type)?;
                candidate.candidate_id = candidate_id(index);
                Ok(candidate)
            })
            .collect()
    }

    /// Fills optional fields a reviewer or generator left empty.
    pub fn fill_defaults(candidate: &mut GenerationCandidate, target_type: ItemKind) {
        candidate
            .acceptance_criteria
            .retain(|criterion| !criterion.trim().is_empty());
        if candidate.acceptance_criteria.is_empty() {
            candidate.acceptance_criteria = vec![DEFAULT_ACCEPTANCE_CRITERION.to_string()];
        }
        if target_type != ItemKind::Story {
            candidate.story_points = None;
        }
        if target_type == ItemKind::Story || target_type == ItemKind::Initiative {
            candidate.estimated_effort = None;
        }
    }
}

/// Session-scoped ID for the candidate at `index`.
pub fn candidate_id(index: usize) -> String {
    format!("cand-{}", index + 1)
}

/// Extracts candidate objects from provider text.
fn recover(text: &str, depth: usize) -> std::result::Result<Vec<Map<String, Value>>, String> {
    if depth >= MAX_REPARSE_DEPTH {
        return Err("payload is nested too deeply".to_string());
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("payload is empty".to_string());
    }

    let body = CODE_FENCE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(direct_err) => {
            let slice = json_slice(body)
                .ok_or_else(|| format!("no JSON object or array found ({})", direct_err))?;
            serde_json::from_str::<Value>(slice).map_err(|e| format!("invalid JSON: {}", e))?
        }
    };

    match value {
        // Doubly encoded: the JSON was itself serialized into a string
        Value::String(inner) => recover(&inner, depth + 1),
        other => objects_from_value(other, depth),
    }
}

fn objects_from_value(
    value: Value,
    depth: usize,
) -> std::result::Result<Vec<Map<String, Value>>, String> {
    match value {
        Value::Array(values) => {
            let mut objects = Vec::with_capacity(values.len());
            for (position, element) in values.into_iter().enumerate() {
                match element {
                    Value::Object(map) => objects.push(map),
                    Value::String(inner) => objects.extend(recover(&inner, depth + 1)?),
                    other => {
                        return Err(format!(
                            "array element {} is not an object: {}",
                            position, other
                        ));
                    }
                }
            }
            Ok(objects)
        }
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(wrapped) = map.remove(key) {
                        return objects_from_value(wrapped, depth);
                    }
                }
            }
            Ok(vec![map])
        }
        other => Err(format!("expected an object or array, got {}", other)),
    }
}

/// The outermost `{...}` or `[...]` span in `text`.
fn json_slice(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    (end > start).then(|| &text[start..=end])
}

fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| map.get(*key))
        .filter(|value| !value.is_null())
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match field(map, keys)? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Reads a list given either as an array or as a delimited string.
fn list_field(map: &Map<String, Value>, keys: &[&str], separator: char) -> Vec<String> {
    let items: Vec<String> = match field(map, keys) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|value| match value {
                Value::String(text) => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(text)) => text.split(separator).map(str::to_string).collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(|item| {
            item.trim()
                .trim_start_matches(['-', '*'])
                .trim()
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

fn story_points(map: &Map<String, Value>) -> Option<u32> {
    match field(map, &["story_points", "storyPoints", "points"])? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().map(|f| f.round() as u64))
            .and_then(|points| u32::try_from(points).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn from_map(
    index: usize,
    map: &Map<String, Value>,
    target_type: ItemKind,
) -> Result<GenerationCandidate> {
    let title = text_field(map, &["title", "name", "summary"])
        .filter(|title| !title.is_empty())
        .ok_or_else(|| BacklogError::MalformedCandidate {
            index,
            reason: "missing title".to_string(),
        })?;

    let priority = match text_field(map, &["priority"]) {
        Some(raw) => raw.parse::<Priority>().unwrap_or_else(|_| {
            tracing::debug!(
                "[CandidateNormalizer] Unknown priority '{}' on candidate {}, using medium",
                raw,
                index
            );
            Priority::Medium
        }),
        None => Priority::Medium,
    };

    let mut candidate = GenerationCandidate {
        candidate_id: String::new(),
        title,
        description: text_field(map, &["description", "summary_description"]).unwrap_or_default(),
        acceptance_criteria: list_field(
            map,
            &["acceptance_criteria", "acceptanceCriteria"],
            '\n',
        ),
        priority,
        business_value: text_field(map, &["business_value", "businessValue"]).unwrap_or_default(),
        rationale: text_field(map, &["rationale", "justification"]).unwrap_or_default(),
        tags: list_field(map, &["tags"], ','),
        labels: list_field(map, &["labels"], ','),
        story_points: story_points(map),
        estimated_effort: text_field(
            map,
            &["estimated_effort", "estimatedEffort", "effort", "estimate"],
        ),
    };

    CandidateNormalizer::fill_defaults(&mut candidate, target_type);
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> RawCandidate {
        RawCandidate::from_value(value)
    }

    #[test]
    fn test_defaults_and_ids() {
        let raw = vec![
            structured(json!({"title": "Checkout revamp"})),
            structured(json!({
                "title": "Saved carts",
                "priority": "HIGH",
                "acceptanceCriteria": ["Cart persists", "Cart restores"],
                "storyPoints": 5
            })),
        ];

        let candidates = CandidateNormalizer::normalize(ItemKind::Story, raw, 5).unwrap();
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].candidate_id, "cand-1");
        assert_eq!(candidates[0].priority, Priority::Medium);
        assert_eq!(candidates[0].acceptance_criteria, vec!["To be defined"]);
        assert!(candidates[0].tags.is_empty());

        assert_eq!(candidates[1].candidate_id, "cand-2");
        assert_eq!(candidates[1].priority, Priority::High);
        assert_eq!(candidates[1].acceptance_criteria.len(), 2);
        assert_eq!(candidates[1].story_points, Some(5));
    }

    #[test]
    fn test_story_points_dropped_for_non_story_targets() {
        let raw = vec![structured(json!({"title": "Epic A", "story_points": 8, "effort": "2 sprints"}))];
        let candidates = CandidateNormalizer::normalize(ItemKind::Epic, raw, 1).unwrap();
        assert_eq!(candidates[0].story_points, None);
        assert_eq!(candidates[0].estimated_effort.as_deref(), Some("2 sprints"));
    }

    #[test]
    fn test_reparse_code_fenced_array() {
        let text = "Here are your features:\n```json\n[{\"title\": \"A\"}, {\"title\": \"B\"}]\n```\nEnjoy!";
        let candidates = CandidateNormalizer::normalize(
            ItemKind::Feature,
            vec![RawCandidate::NeedsReparse(text.to_string())],
            3,
        )
        .unwrap();
        let titles: Vec<&str> = candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_reparse_double_encoded_wrapper() {
        let inner = json!({"items": [{"name": "Loyalty program", "tags": "growth, retention"}]});
        let encoded = serde_json::to_string(&inner.to_string()).unwrap();
        let candidates = CandidateNormalizer::normalize(
            ItemKind::Initiative,
            vec![RawCandidate::NeedsReparse(encoded)],
            3,
        )
        .unwrap();
        assert_eq!(candidates[0].title, "Loyalty program");
        assert_eq!(candidates[0].tags, vec!["growth", "retention"]);
    }

    #[test]
    fn test_reparse_prose_around_object() {
        let text = "Sure! {\"title\": \"Single\", \"acceptance_criteria\": \"- first\\n- second\"} Let me know.";
        let candidates = CandidateNormalizer::normalize(
            ItemKind::Story,
            vec![RawCandidate::NeedsReparse(text.to_string())],
            3,
        )
        .unwrap();
        assert_eq!(candidates[0].acceptance_criteria, vec!["first", "second"]);
    }

    #[test]
    fn test_reparse_failure_is_distinct_error() {
        let err = CandidateNormalizer::normalize(
            ItemKind::Story,
            vec![
                structured(json!({"title": "ok"})),
                RawCandidate::NeedsReparse("I could not produce JSON today".to_string()),
            ],
            3,
        )
        .unwrap_err();
        assert!(matches!(err, BacklogError::CandidateRecovery { index: 1, .. }));
        assert!(err.is_generation());
    }

    #[test]
    fn test_missing_title_is_malformed() {
        let err = CandidateNormalizer::normalize(
            ItemKind::Story,
            vec![structured(json!({"description": "no title"}))],
            3,
        )
        .unwrap_err();
        assert!(matches!(err, BacklogError::MalformedCandidate { index: 0, .. }));
    }

    #[test]
    fn test_surplus_candidates_are_truncated() {
        let raw = (0..5)
            .map(|i| structured(json!({"title": format!("Story {}", i)})))
            .collect();
        let candidates = CandidateNormalizer::normalize(ItemKind::Story, raw, 3).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].candidate_id, "cand-3");
    }

    #[test]
    fn test_empty_output_is_generation_error() {
        let err = CandidateNormalizer::normalize(ItemKind::Story, vec![], 3).unwrap_err();
        assert!(matches!(err, BacklogError::Generation { .. }));
    }
}
