//! Deterministic, pure story renderer.
//!
//! Given a template and a `slot_id -> value` mapping, produces the final
//! story text. Never panics; unknown placeholders are left literal.

use crate::templates::{SlotType, Template};
use std::collections::HashMap;

/// Render `template.story`, substituting `{slot.id}` placeholders.
///
/// - A mapped, non-empty value is trimmed before substitution.
/// - `sound` values are wrapped in double quotes unless already quoted.
/// - Unmapped slots fall back to the literal `"something"`.
pub fn render(template: &Template, values: &HashMap<String, String>) -> String {
    let mut story = template.story.clone();

    for slot in &template.slots {
        let placeholder = format!("{{{}}}", slot.id);
        let replacement = resolve_value(slot.slot_type, values.get(&slot.id));
        story = story.replace(&placeholder, &replacement);
    }

    story
}

fn resolve_value(slot_type: SlotType, value: Option<&String>) -> String {
    match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(trimmed) => {
            if slot_type == SlotType::Sound && !is_double_quoted(trimmed) {
                format!("\"{trimmed}\"")
            } else {
                trimmed.to_string()
            }
        }
        None => "something".to_string(),
    }
}

fn is_double_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}
