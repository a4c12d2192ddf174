//! Key → section lookup built from the catalog.

use crate::model::{AvailabilityInput, MatchRecord, Section};
use crate::normalize::normalize;
use indexmap::IndexMap;
use indexmap::map::Entry;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Slot of a [`MatchRecord`] inside a [`SectionIndex`]. Valid for one index only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub u32);

impl RecordId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

fn leading_digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+").expect("valid regex"))
}

fn leading_alnum_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]+\d+").expect("valid regex"))
}

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

fn letter_prefixed_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z]+\d+").expect("valid regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().to_string())
}

fn hint_keys(section: &Section) -> Vec<String> {
    let Some(hint) = section.svg_path_hint.as_deref() else {
        return Vec::new();
    };
    let lower = hint.trim().to_lowercase();
    vec![
        lower.clone(),
        format!("{lower}-group"),
        format!("{lower}-section"),
        normalize(&lower),
    ]
}

fn hint_numeric_key(section: &Section) -> Vec<String> {
    let Some(hint) = section.svg_path_hint.as_deref() else {
        return Vec::new();
    };
    first_match(leading_digits_regex(), hint.trim())
        .into_iter()
        .collect()
}

fn hint_alnum_key(section: &Section) -> Vec<String> {
    let Some(hint) = section.svg_path_hint.as_deref() else {
        return Vec::new();
    };
    first_match(leading_alnum_regex(), &hint.trim().to_lowercase())
        .into_iter()
        .collect()
}

fn name_keys(section: &Section) -> Vec<String> {
    let lower = section.name.trim().to_lowercase();
    vec![
        normalize(&lower),
        lower.clone(),
        whitespace_regex().replace_all(&lower, "-").into_owned(),
        whitespace_regex().replace_all(&lower, "").into_owned(),
    ]
}

fn name_numeric_key(section: &Section) -> Vec<String> {
    first_match(digit_run_regex(), &section.name)
        .into_iter()
        .collect()
}

fn name_area_code_key(section: &Section) -> Vec<String> {
    first_match(letter_prefixed_number_regex(), &section.name.to_lowercase())
        .into_iter()
        .collect()
}

/// Key derivations in precedence order. Every tier is applied to the whole catalog
/// before the next one, so a hint key always beats a name-derived key.
const KEY_TIERS: &[fn(&Section) -> Vec<String>] = &[
    hint_keys,
    hint_numeric_key,
    hint_alnum_key,
    name_keys,
    name_numeric_key,
    name_area_code_key,
];

#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    records: Vec<MatchRecord>,
    keys: IndexMap<String, RecordId>,
}

impl SectionIndex {
    pub fn build(catalog: &[Section], availability: &AvailabilityInput) -> Self {
        let records: Vec<MatchRecord> = catalog
            .iter()
            .map(|section| MatchRecord {
                section: section.clone(),
                availability: availability.availability_for(&section.id),
                has_tickets: availability.has_tickets(&section.id),
            })
            .collect();

        let mut keys: IndexMap<String, RecordId> = IndexMap::new();
        let mut skipped = 0usize;
        for tier in KEY_TIERS {
            for (idx, section) in catalog.iter().enumerate() {
                for key in tier(section) {
                    if key.is_empty() {
                        continue;
                    }
                    match keys.entry(key) {
                        Entry::Vacant(slot) => {
                            slot.insert(RecordId(idx as u32));
                        }
                        Entry::Occupied(_) => skipped += 1,
                    }
                }
            }
        }

        tracing::debug!(
            sections = records.len(),
            keys = keys.len(),
            skipped,
            "built section index"
        );

        Self { records, keys }
    }

    pub fn get(&self, key: &str) -> Option<RecordId> {
        if key.is_empty() {
            return None;
        }
        self.keys.get(key).copied()
    }

    /// Looks candidates up in order and returns the first hit.
    pub fn first_hit<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Option<(RecordId, &'a str)> {
        candidates
            .into_iter()
            .find_map(|key| self.get(key).map(|id| (id, key)))
    }

    pub fn record(&self, id: RecordId) -> &MatchRecord {
        &self.records[id.index()]
    }

    pub fn records(&self) -> impl Iterator<Item = (RecordId, &MatchRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, r)| (RecordId(idx as u32), r))
    }

    pub fn record_for_section(&self, section_id: &str) -> Option<RecordId> {
        self.records
            .iter()
            .position(|r| r.section.id == section_id)
            .map(|idx| RecordId(idx as u32))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}
