//! Association table: which diagram elements stand for which section.
//!
//! Every accepted match is registered on its source element and then aliased onto the
//! enclosing group and the group's first painted shape, so a pointer landing anywhere
//! in a section's artwork finds the record. The table is built once per pass and
//! dropped whole; nothing in it is mutated after construction.

use crate::document::{ElementId, MapDocument};
use crate::index::{RecordId, SectionIndex};
use crate::model::MatchRecord;
use crate::strategy::{ElementMatch, MatchSource};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AliasRole {
    /// The element a strategy matched.
    Source,
    /// Nearest enclosing `<g>` of a matched shape.
    Group,
    /// First painted shape inside that group.
    GroupShape,
    /// Nearest enclosing `<g>` of a matched label.
    LabelGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub element: ElementId,
    pub record: RecordId,
    pub role: AliasRole,
    pub source: MatchSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualState {
    Selected,
    Available,
    Unavailable,
}

impl VisualState {
    pub fn for_record(record: &MatchRecord, selection: Option<&str>) -> Self {
        if selection == Some(record.section.id.as_str()) {
            Self::Selected
        } else if record.has_tickets {
            Self::Available
        } else {
            Self::Unavailable
        }
    }
}

/// Class names and stylesheet for the three visual states.
///
/// Owned by the hosting surface and handed to each pass; the engine never injects
/// styles anywhere on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleResource {
    pub selected_class: String,
    pub available_class: String,
    pub unavailable_class: String,
}

impl Default for StyleResource {
    fn default() -> Self {
        Self {
            selected_class: "venue-section-selected".to_string(),
            available_class: "venue-section-available".to_string(),
            unavailable_class: "venue-section-unavailable".to_string(),
        }
    }
}

impl StyleResource {
    pub fn class_for(&self, state: VisualState) -> &str {
        match state {
            VisualState::Selected => &self.selected_class,
            VisualState::Available => &self.available_class,
            VisualState::Unavailable => &self.unavailable_class,
        }
    }

    pub fn stylesheet(&self) -> String {
        format!(
            ".{sel} {{ fill: #1d4ed8; fill-opacity: 0.85; cursor: pointer; }}\n\
             .{avail} {{ fill: #22c55e; fill-opacity: 0.6; cursor: pointer; }}\n\
             .{avail}:hover {{ fill-opacity: 0.8; }}\n\
             .{unavail} {{ fill: #9ca3af; fill-opacity: 0.4; cursor: not-allowed; }}\n",
            sel = self.selected_class,
            avail = self.available_class,
            unavail = self.unavailable_class,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct AliasProposal {
    record: RecordId,
    role: AliasRole,
    conflicting: bool,
    origin: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AssociationTable {
    slots: Vec<Option<RecordId>>,
    bindings: Vec<Binding>,
    dropped_aliases: usize,
}

impl AssociationTable {
    pub fn bind(doc: &MapDocument, matches: &[ElementMatch]) -> Self {
        let mut table = Self {
            slots: vec![None; doc.len()],
            bindings: Vec::new(),
            dropped_aliases: 0,
        };

        for m in matches {
            let slot = &mut table.slots[m.element.index()];
            if slot.is_some() {
                continue;
            }
            *slot = Some(m.record);
            table.bindings.push(Binding {
                element: m.element,
                record: m.record,
                role: AliasRole::Source,
                source: m.source.clone(),
            });
        }

        let mut proposals: IndexMap<ElementId, AliasProposal> = IndexMap::new();
        let mut propose = |element: ElementId, record: RecordId, role: AliasRole, origin: usize| {
            proposals
                .entry(element)
                .and_modify(|p| p.conflicting |= p.record != record)
                .or_insert(AliasProposal {
                    record,
                    role,
                    conflicting: false,
                    origin,
                });
        };
        for (origin, b) in table.bindings.iter().enumerate() {
            let Some(group) = doc.nearest_group(b.element) else {
                continue;
            };
            let group_role = if matches!(b.source, MatchSource::Label { .. }) {
                AliasRole::LabelGroup
            } else {
                AliasRole::Group
            };
            propose(group, b.record, group_role, origin);
            if let Some(shape) = doc.first_drawable_descendant(group) {
                propose(shape, b.record, AliasRole::GroupShape, origin);
            }
        }

        for (element, p) in proposals {
            if table.slots[element.index()].is_some() {
                continue;
            }
            if p.conflicting {
                table.dropped_aliases += 1;
                tracing::trace!(element = element.0, "group alias dropped: conflicting sections");
                continue;
            }
            table.slots[element.index()] = Some(p.record);
            let source = table.bindings[p.origin].source.clone();
            table.bindings.push(Binding {
                element,
                record: p.record,
                role: p.role,
                source,
            });
        }

        tracing::debug!(
            bindings = table.bindings.len(),
            dropped_aliases = table.dropped_aliases,
            "association table bound"
        );
        table
    }

    pub fn record_for(&self, element: ElementId) -> Option<RecordId> {
        self.slots.get(element.index()).copied().flatten()
    }

    pub fn binding_for(&self, element: ElementId) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.element == element)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Bindings that came straight from a strategy, not from aliasing.
    pub fn source_bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(|b| b.role == AliasRole::Source)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn dropped_aliases(&self) -> usize {
        self.dropped_aliases
    }

    /// Nearest bound element at or above `target`, walking at most `max_depth`
    /// ancestors.
    pub fn lookup_upwards(
        &self,
        doc: &MapDocument,
        target: ElementId,
        max_depth: usize,
    ) -> Option<(ElementId, RecordId)> {
        doc.ancestors_inclusive(target)
            .take(max_depth + 1)
            .find_map(|el| self.record_for(el).map(|r| (el, r)))
    }

    /// Visual state of every bound source element, in binding order.
    pub fn visual_states(
        &self,
        index: &SectionIndex,
        selection: Option<&str>,
    ) -> Vec<(ElementId, VisualState)> {
        self.source_bindings()
            .map(|b| (b.element, VisualState::for_record(index.record(b.record), selection)))
            .collect()
    }

    /// `(element, section id)` pairs, sorted by element.
    pub fn section_pairs<'i>(&self, index: &'i SectionIndex) -> Vec<(ElementId, &'i str)> {
        let mut pairs: Vec<_> = self
            .bindings
            .iter()
            .map(|b| (b.element, index.record(b.record).section.id.as_str()))
            .collect();
        pairs.sort();
        pairs
    }
}
