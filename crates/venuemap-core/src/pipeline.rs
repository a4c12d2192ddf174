//! One full resolution pass over a diagram.

use crate::binder::{AssociationTable, VisualState};
use crate::classify::classify;
use crate::config::ResolverConfig;
use crate::document::{ElementId, MapDocument};
use crate::heuristic::HeuristicResolver;
use crate::index::SectionIndex;
use crate::model::{AvailabilityInput, MatchRecord, Section};
use crate::sanitize::sanitize_markup;
use crate::strategy::{ElementMatch, MatchSource, run_strategies};
use crate::Result;
use serde::Serialize;

/// Counters describing how a pass went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub elements: usize,
    pub sections: usize,
    pub identified: usize,
    pub labels: usize,
    pub unlabeled_shapes: usize,
    pub identifier_matches: usize,
    pub label_matches: usize,
    pub proximity_matches: usize,
    pub heuristic_matches: usize,
    pub unresolved_identifiers: usize,
    pub unmatched_labels: usize,
    pub geometry_unavailable: usize,
    pub dropped_aliases: usize,
    pub shape_cap_reached: bool,
}

/// Parsed document, section index and association table of one pass.
#[derive(Debug)]
pub struct ResolvedMap {
    document: MapDocument,
    index: SectionIndex,
    table: AssociationTable,
    config: ResolverConfig,
    summary: PassSummary,
}

impl ResolvedMap {
    /// Sanitizes `raw_markup` and resolves it against `catalog`.
    pub fn build(
        raw_markup: &str,
        catalog: &[Section],
        availability: &AvailabilityInput,
        config: &ResolverConfig,
    ) -> Result<Self> {
        let sanitized = sanitize_markup(raw_markup);
        let document = MapDocument::parse(&sanitized)?;
        Ok(Self::from_document(document, catalog, availability, config))
    }

    pub fn from_document(
        document: MapDocument,
        catalog: &[Section],
        availability: &AvailabilityInput,
        config: &ResolverConfig,
    ) -> Self {
        let index = SectionIndex::build(catalog, availability);
        let classes = classify(&document, config);
        let mut outcome = run_strategies(&document, &classes, &index, config);

        let mut heuristic_matches = 0usize;
        let mut unmatched_labels = outcome.unmatched_labels.len();
        if config.bind_heuristic_labels {
            let resolver = HeuristicResolver::new(&index, &config.heuristic);
            for label in &outcome.unmatched_labels {
                let Some(m) = resolver.resolve(&label.text) else {
                    continue;
                };
                heuristic_matches += 1;
                unmatched_labels -= 1;
                outcome.matches.push(ElementMatch {
                    element: label.element,
                    record: m.record,
                    source: MatchSource::Heuristic { score: m.score },
                });
            }
        }

        let table = AssociationTable::bind(&document, &outcome.matches);
        let count = |f: fn(&MatchSource) -> bool| {
            outcome.matches.iter().filter(|m| f(&m.source)).count()
        };
        let summary = PassSummary {
            elements: document.len(),
            sections: index.len(),
            identified: classes.identified.len(),
            labels: classes.labels.len(),
            unlabeled_shapes: classes.unlabeled.len(),
            identifier_matches: count(|s| matches!(s, MatchSource::Identifier { .. })),
            label_matches: count(|s| matches!(s, MatchSource::Label { .. })),
            proximity_matches: count(|s| matches!(s, MatchSource::Proximity { .. })),
            heuristic_matches,
            unresolved_identifiers: outcome.unresolved_identifiers,
            unmatched_labels,
            geometry_unavailable: classes.geometry_unavailable,
            dropped_aliases: table.dropped_aliases(),
            shape_cap_reached: classes.capped,
        };

        tracing::debug!(
            bindings = table.len(),
            heuristic_matches,
            unmatched_labels,
            "resolution pass complete"
        );

        Self {
            document,
            index,
            table,
            config: config.clone(),
            summary,
        }
    }

    pub fn document(&self) -> &MapDocument {
        &self.document
    }

    pub fn index(&self) -> &SectionIndex {
        &self.index
    }

    pub fn table(&self) -> &AssociationTable {
        &self.table
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn summary(&self) -> &PassSummary {
        &self.summary
    }

    /// Record for a pointer hovering `target`, looked up through its ancestors.
    pub fn hover(&self, target: ElementId) -> Option<&MatchRecord> {
        self.table
            .lookup_upwards(&self.document, target, self.config.max_ancestor_depth)
            .map(|(_, record)| self.index.record(record))
    }

    pub fn visual_states(&self, selection: Option<&str>) -> Vec<(ElementId, VisualState)> {
        self.table.visual_states(&self.index, selection)
    }

    /// `(element, section id)` pairs for every binding, sorted by element.
    pub fn section_pairs(&self) -> Vec<(ElementId, &str)> {
        self.table.section_pairs(&self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionType;

    fn orchestra() -> Vec<Section> {
        vec![Section {
            id: "orch".to_string(),
            name: "Orchestra".to_string(),
            svg_path_hint: None,
            section_type: SectionType::Orchestra,
            capacity: None,
        }]
    }

    #[test]
    fn heuristic_labels_stay_unbound_by_default() {
        let svg = r#"<svg><g><path d="M0 0H100V100H0Z"/><text x="10" y="50">LEFT ORCH</text></g></svg>"#;

        let map = ResolvedMap::build(svg, &orchestra(), &AvailabilityInput::default(), &ResolverConfig::default()).unwrap();
        assert!(map.table().is_empty());
        assert!(map.visual_states(None).is_empty());
        assert_eq!(map.summary().heuristic_matches, 0);
        assert_eq!(map.summary().unmatched_labels, 1);

        let config = ResolverConfig {
            bind_heuristic_labels: true,
            ..ResolverConfig::default()
        };
        let map = ResolvedMap::build(svg, &orchestra(), &AvailabilityInput::default(), &config).unwrap();
        assert_eq!(map.summary().heuristic_matches, 1);
        assert_eq!(map.summary().unmatched_labels, 0);
        let path = map.document().ids().find(|id| map.document().element(*id).tag() == "path").unwrap();
        assert_eq!(map.hover(path).map(|r| r.section.id.as_str()), Some("orch"));
    }

    #[test]
    fn decorative_group_with_a_keyword_label_is_not_painted() {
        let catalog = vec![Section {
            id: "u301".to_string(),
            name: "Upper 301".to_string(),
            svg_path_hint: None,
            section_type: SectionType::Upper,
            capacity: None,
        }];
        let svg = r#"<svg><g id="walk"><path id="concourse-walkway" d="M0 0H300V40H0Z"/><text x="20" y="25">UPPER CONCOURSE</text></g></svg>"#;
        let map = ResolvedMap::build(svg, &catalog, &AvailabilityInput::from_counts([("u301".to_string(), 4)]), &ResolverConfig::default()).unwrap();
        assert!(map.table().is_empty());
        assert!(map.visual_states(None).is_empty());
        let path = map.document().find_by_id("concourse-walkway").unwrap();
        assert!(map.hover(path).is_none());
    }

    #[test]
    fn markup_without_a_diagram_is_an_error() {
        let err = ResolvedMap::build("<p>nothing</p>", &[], &AvailabilityInput::default(), &ResolverConfig::default())
            .unwrap_err();
        assert!(matches!(err, crate::Error::NoDiagramRoot));
    }
}
