//! Static story template catalogue.
//!
//! The catalogue is out of scope per the design spec (it's treated as an
//! external collaborator) but the crate still needs *a* catalogue to run and
//! to exercise the §8 end-to-end scenario, so a small hard-coded set is
//! provided here as a `Lazy` map, following the teacher's practice of
//! `once_cell`-backed static lookups for configuration-shaped data.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Adjective,
    Name,
    Verb,
    Place,
    Sound,
    Noun,
}

impl SlotType {
    /// Type-specific maximum length for a submitted value.
    pub const fn max_value_len(self) -> usize {
        match self {
            Self::Adjective => 30,
            Self::Name => 24,
            Self::Verb => 30,
            Self::Place => 40,
            Self::Sound => 20,
            Self::Noun => 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub label: String,
    pub slot_type: SlotType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub title: String,
    pub story: String,
    pub slots: Vec<Slot>,
}

fn slot(id: &str, label: &str, slot_type: SlotType) -> Slot {
    Slot {
        id: id.to_string(),
        label: label.to_string(),
        slot_type,
    }
}

static CATALOGUE: Lazy<HashMap<&'static str, Template>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        "t-forest-mishap",
        Template {
            id: "t-forest-mishap".to_string(),
            title: "Forest Mishap".to_string(),
            story: "It was a {adjective} day when {name} went for a walk. While {verb} \
                    through the {place}, a {sound} echoed overhead, and suddenly \
                    {noun} appeared out of nowhere!"
                .to_string(),
            slots: vec![
                slot("adjective", "An adjective", SlotType::Adjective),
                slot("name", "A person's name", SlotType::Name),
                slot("verb", "A verb ending in -ing", SlotType::Verb),
                slot("place", "A place", SlotType::Place),
                slot("sound", "A sound effect", SlotType::Sound),
                slot("noun", "A plural noun", SlotType::Noun),
            ],
        },
    );

    map.insert(
        "t-office-party",
        Template {
            id: "t-office-party".to_string(),
            title: "Office Party Disaster".to_string(),
            story: "The office party started {adjective}ly. {name} brought a {noun} \
                    and began {verb} near the {place}, until a {sound} silenced the room."
                .to_string(),
            slots: vec![
                slot("adjective", "An adjective", SlotType::Adjective),
                slot("name", "A person's name", SlotType::Name),
                slot("noun", "A noun", SlotType::Noun),
                slot("verb", "A verb ending in -ing", SlotType::Verb),
                slot("place", "A place", SlotType::Place),
                slot("sound", "A sound effect", SlotType::Sound),
            ],
        },
    );

    map
});

pub fn get(id: &str) -> Option<&'static Template> {
    CATALOGUE.get(id)
}

pub fn list() -> Vec<&'static Template> {
    let mut templates: Vec<_> = CATALOGUE.values().collect();
    templates.sort_by(|a, b| a.id.cmp(&b.id));
    templates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forest_mishap_has_six_slots() {
        let template = get("t-forest-mishap").expect("template exists");
        assert_eq!(template.slots.len(), 6);
    }

    #[test]
    fn unknown_template_id_returns_none() {
        assert!(get("does-not-exist").is_none());
    }

    #[test]
    fn list_is_nonempty_and_sorted() {
        let templates = list();
        assert!(!templates.is_empty());
        let ids: Vec<_> = templates.iter().map(|t| t.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
