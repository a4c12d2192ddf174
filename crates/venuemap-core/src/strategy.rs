//! Identifier, label and proximity matchers.
//!
//! The matchers run in that order and the first one to place an element wins; scores
//! are never blended across matchers.

use crate::classify::{Classification, LabelElement, is_generic_identifier};
use crate::config::ResolverConfig;
use crate::document::{ElementId, MapDocument};
use crate::geom::Point;
use crate::index::{RecordId, SectionIndex};
use crate::normalize::normalize;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::OnceLock;

fn id_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_\s]*(?:group|section|path|area|zone)$").expect("valid regex"))
}

fn digit_runs_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

fn short_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{1,3})(?:\D|$)").expect("valid regex"))
}

fn push_unique(out: &mut Vec<String>, key: String) {
    if !key.is_empty() && !out.contains(&key) {
        out.push(key);
    }
}

/// Lookup keys for an authored identifier, in lookup order.
pub fn identifier_candidates(raw_id: &str) -> Vec<String> {
    let lower = raw_id.trim().to_lowercase();
    let mut out = Vec::new();
    push_unique(&mut out, lower.clone());
    push_unique(&mut out, id_suffix_regex().replace(&lower, "").into_owned());
    push_unique(&mut out, normalize(&lower));
    for m in digit_runs_regex().find_iter(&lower) {
        push_unique(&mut out, m.as_str().to_string());
    }
    out
}

/// Lookup keys for a text label, in lookup order.
///
/// Only a standalone run of one to three digits becomes a bare number key, so
/// "Section 1234" yields no number key and is looked up by its full and normalized text.
pub fn label_candidates(text: &str) -> Vec<String> {
    let lower = text.trim().to_lowercase();
    let mut out = Vec::new();
    push_unique(&mut out, normalize(&lower));
    push_unique(&mut out, lower.clone());
    if let Some(c) = short_number_regex().captures(&lower) {
        if let Some(m) = c.get(1) {
            push_unique(&mut out, m.as_str().to_string());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MatchSource {
    Identifier { key: String },
    Label { key: String },
    Proximity { label: ElementId, distance: f64 },
    Heuristic { score: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementMatch {
    pub element: ElementId,
    pub record: RecordId,
    pub source: MatchSource,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyOutcome {
    /// Accepted matches in the order they were produced.
    pub matches: Vec<ElementMatch>,
    /// Labels no exact key resolved; input for the heuristic resolver.
    pub unmatched_labels: Vec<LabelElement>,
    /// Identified elements that resolved to nothing.
    pub unresolved_identifiers: usize,
}

struct LabelAnchor {
    center: Point,
    record: RecordId,
    label: ElementId,
}

pub fn run_strategies(
    doc: &MapDocument,
    classes: &Classification,
    index: &SectionIndex,
    config: &ResolverConfig,
) -> StrategyOutcome {
    let mut out = StrategyOutcome::default();
    let mut matched: FxHashMap<ElementId, RecordId> = FxHashMap::default();

    // (a) authored identifiers
    let mut generic_skipped = 0usize;
    for item in &classes.identified {
        let candidates = identifier_candidates(&item.raw_id);
        match index.first_hit(candidates.iter().map(String::as_str)) {
            Some((record, key)) => {
                matched.insert(item.element, record);
                out.matches.push(ElementMatch {
                    element: item.element,
                    record,
                    source: MatchSource::Identifier {
                        key: key.to_string(),
                    },
                });
            }
            None if is_generic_identifier(&item.raw_id) => generic_skipped += 1,
            None => {
                out.unresolved_identifiers += 1;
                tracing::trace!(raw_id = %item.raw_id, "identifier did not resolve");
            }
        }
    }

    // (b) text labels
    let mut anchors: Vec<LabelAnchor> = Vec::new();
    for label in &classes.labels {
        let existing = matched.get(&label.element).copied();
        let hit = existing.map(|r| (r, None)).or_else(|| {
            let candidates = label_candidates(&label.text);
            index
                .first_hit(candidates.iter().map(String::as_str))
                .map(|(r, key)| (r, Some(key.to_string())))
        });

        let Some((record, key)) = hit else {
            out.unmatched_labels.push(label.clone());
            continue;
        };
        if let Some(key) = key {
            matched.insert(label.element, record);
            out.matches.push(ElementMatch {
                element: label.element,
                record,
                source: MatchSource::Label { key },
            });
        }
        if let Some(center) = doc.center(label.element) {
            anchors.push(LabelAnchor {
                center,
                record,
                label: label.element,
            });
        }
    }

    // (c) geometric proximity
    let max_distance = config.geometry.max_label_distance;
    let mut proximity = 0usize;
    if !anchors.is_empty() && !classes.unlabeled.is_empty() {
        for shape in &classes.unlabeled {
            if matched.contains_key(shape) {
                continue;
            }
            let Some(center) = doc.center(*shape) else {
                continue;
            };
            let mut best: Option<(&LabelAnchor, f64)> = None;
            for anchor in &anchors {
                let d = (anchor.center - center).length();
                if best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((anchor, d));
                }
            }
            let Some((anchor, distance)) = best else {
                continue;
            };
            if distance <= max_distance {
                proximity += 1;
                matched.insert(*shape, anchor.record);
                out.matches.push(ElementMatch {
                    element: *shape,
                    record: anchor.record,
                    source: MatchSource::Proximity {
                        label: anchor.label,
                        distance,
                    },
                });
            }
        }
    }

    tracing::debug!(
        matches = out.matches.len(),
        proximity,
        unmatched_labels = out.unmatched_labels.len(),
        unresolved_identifiers = out.unresolved_identifiers,
        generic_skipped,
        "strategy chain finished"
    );
    out
}
