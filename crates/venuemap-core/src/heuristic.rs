//! Fallback resolution for labels and tokens that no exact key matched.
//!
//! Diagrams are often finer or coarser than the sales catalog: a map may print
//! "LEFT ORCH" where the catalog only sells "Orchestra". The resolver first looks for
//! a venue-area keyword and picks a section of that type; failing that it scores every
//! section and accepts the best one above a confidence floor.

use crate::config::HeuristicWeights;
use crate::index::{RecordId, SectionIndex};
use crate::model::{Section, SectionType};
use crate::normalize::normalize;
use serde::Serialize;

/// Venue-area keywords as whole words after synonym rewriting, mapped to section types.
const AREA_KEYWORDS: &[(&str, SectionType)] = &[
    ("orch", SectionType::Orchestra),
    ("mezz", SectionType::Mezzanine),
    ("balc", SectionType::Balcony),
    ("box", SectionType::Suite),
    ("loge", SectionType::Suite),
    ("suite", SectionType::Suite),
    ("floor", SectionType::Floor),
    ("pit", SectionType::Pit),
    ("lower", SectionType::Lower),
    ("upper", SectionType::Upper),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubArea {
    Front,
    Rear,
}

/// Alphabetic words of `raw`, lowercased with synonyms rewritten (`orchestra` becomes
/// `orch`). Keywords are only ever compared against whole words, so `hospitality`
/// never reads as `pit`.
fn words(raw: &str) -> Vec<String> {
    raw.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(normalize)
        .filter(|w| !w.is_empty())
        .collect()
}

fn has_word(words: &[String], keyword: &str) -> bool {
    words.iter().any(|w| {
        w == keyword
            || w.strip_suffix('s') == Some(keyword)
            || w.strip_suffix("es") == Some(keyword)
    })
}

fn sub_area(words: &[String]) -> Option<SubArea> {
    if has_word(words, "front") {
        Some(SubArea::Front)
    } else if has_word(words, "rear") || has_word(words, "back") {
        Some(SubArea::Rear)
    } else {
        None
    }
}

fn area_keyword(words: &[String]) -> Option<(&'static str, SectionType)> {
    AREA_KEYWORDS
        .iter()
        .find(|(kw, _)| has_word(words, kw))
        .copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeuristicPath {
    /// Picked among sections of the type named by an area keyword.
    AreaKeyword,
    /// Best score across the whole catalog.
    Scored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeuristicMatch {
    pub record: RecordId,
    pub score: u32,
    pub path: HeuristicPath,
}

pub struct HeuristicResolver<'a> {
    index: &'a SectionIndex,
    weights: &'a HeuristicWeights,
}

impl<'a> HeuristicResolver<'a> {
    pub fn new(index: &'a SectionIndex, weights: &'a HeuristicWeights) -> Self {
        Self { index, weights }
    }

    pub fn resolve(&self, input: &str) -> Option<HeuristicMatch> {
        let needle = normalize(input);
        if needle.is_empty() || self.index.is_empty() {
            return None;
        }
        let needle_words = words(input);

        let found = self
            .resolve_by_area_keyword(&needle_words)
            .or_else(|| self.resolve_by_score(&needle, &needle_words));
        match found {
            Some(m) => tracing::trace!(input, score = m.score, path = ?m.path, "heuristic match"),
            None => tracing::trace!(input, "heuristic found nothing"),
        }
        found
    }

    fn resolve_by_area_keyword(&self, needle_words: &[String]) -> Option<HeuristicMatch> {
        let (_, section_type) = area_keyword(needle_words)?;
        let wanted = sub_area(needle_words);

        let mut first = None;
        let mut preferred = None;
        for (id, record) in self.index.records() {
            if record.section.section_type != section_type {
                continue;
            }
            first.get_or_insert(id);
            let name_area = sub_area(&words(&record.section.name));
            let hit = match wanted {
                Some(w) => name_area == Some(w),
                None => name_area == Some(SubArea::Front),
            };
            if hit {
                preferred = Some(id);
                break;
            }
        }

        let w = self.weights;
        let (record, score) = match (preferred, wanted) {
            (Some(id), Some(_)) => (id, w.type_keyword + w.sub_area_keyword),
            (Some(id), None) => (id, w.type_keyword + w.front_default),
            (None, _) => (first?, w.type_keyword),
        };
        Some(HeuristicMatch {
            record,
            score,
            path: HeuristicPath::AreaKeyword,
        })
    }

    fn score(&self, needle: &str, needle_words: &[String], section: &Section) -> u32 {
        let w = self.weights;
        let name = normalize(&section.name);
        let name_words = words(&section.name);
        let mut score = 0;

        if needle == name {
            score += w.exact_match;
        }
        if !name.is_empty() && (needle.contains(&name) || name.contains(needle)) {
            let shorter = needle.len().min(name.len()) as u32;
            score += w.containment_max.min(shorter);
        }

        let agrees = area_keyword(needle_words)
            .is_some_and(|(kw, ty)| ty == section.section_type || has_word(&name_words, kw));
        if agrees {
            score += w.type_keyword;
        }

        match (sub_area(needle_words), sub_area(&name_words)) {
            (Some(a), Some(b)) if a == b => score += w.sub_area_keyword,
            (None, Some(SubArea::Front)) => score += w.front_default,
            _ => {}
        }
        score
    }

    fn resolve_by_score(&self, needle: &str, needle_words: &[String]) -> Option<HeuristicMatch> {
        let mut best: Option<(RecordId, u32)> = None;
        for (id, record) in self.index.records() {
            let score = self.score(needle, needle_words, &record.section);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((id, score));
            }
        }
        let (record, score) = best?;
        (score >= self.weights.min_confidence).then_some(HeuristicMatch {
            record,
            score,
            path: HeuristicPath::Scored,
        })
    }
}
