//! Click resolution.
//!
//! The host calls [`ClickResolver::dispatch`] exactly once per physical input. The
//! resolver walks three stages in order (association table, literal key lookup,
//! heuristic) and stops at the first that resolves. Every attempted stage reports a
//! [`ResolutionDiagnostic`]; an unresolvable click is an outcome, never an error.

use crate::binder::AssociationTable;
use crate::classify::{element_identifier, is_generic_identifier};
use crate::document::{ElementId, MapDocument};
use crate::geom::Point;
use crate::heuristic::HeuristicResolver;
use crate::index::RecordId;
use crate::pipeline::ResolvedMap;
use crate::strategy::{MatchSource, identifier_candidates, label_candidates};
use rustc_hash::FxHashSet;
use serde::Serialize;

/// One physical pointer input, as seen by the host's input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerInput {
    /// Identity of the physical input; the same id is resolved at most once per pass.
    pub input_id: u64,
    pub target: Option<ElementId>,
    /// Event path from the target outwards, when the host has one.
    pub path: Vec<ElementId>,
}

impl PointerInput {
    pub fn on_element(input_id: u64, target: ElementId) -> Self {
        Self {
            input_id,
            target: Some(target),
            path: Vec::new(),
        }
    }

    /// Hit-tests `p` against the document's bounding boxes.
    pub fn at_point(input_id: u64, doc: &MapDocument, p: Point) -> Self {
        let target = doc.topmost_at(p);
        Self {
            input_id,
            target,
            path: target
                .map(|t| doc.ancestors_inclusive(t).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStage {
    /// Association table walk from the target upwards.
    Primary,
    /// Identifier and label keys looked up in the section index.
    Secondary,
    /// Heuristic fallback on the label text or identifier tokens.
    Tertiary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPath {
    Mapping,
    Proximity,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDiagnostic {
    pub input_id: u64,
    pub stage: ResolutionStage,
    pub path: ResolutionPath,
    pub candidate_count: usize,
    /// Section id the stage resolved to.
    pub matched: Option<String>,
    /// Identifiers or lookup keys that produced the match; empty when nothing matched.
    pub matched_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ClickOutcome {
    /// The host should emit the click and suppress the default action.
    #[serde(rename_all = "camelCase")]
    Resolved {
        section_id: String,
        record: RecordId,
        stage: ResolutionStage,
    },
    Unresolved,
    /// `input_id` was already dispatched in this pass.
    AlreadyHandled,
}

impl ClickOutcome {
    pub fn suppresses_default(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Click resolution state for one render pass.
#[derive(Debug, Default)]
pub struct ClickResolver {
    handled: FxHashSet<u64>,
}

impl ClickResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(
        &mut self,
        map: &ResolvedMap,
        input: &PointerInput,
        diagnostics: &mut dyn FnMut(ResolutionDiagnostic),
    ) -> ClickOutcome {
        if !self.handled.insert(input.input_id) {
            tracing::trace!(input_id = input.input_id, "input already dispatched");
            return ClickOutcome::AlreadyHandled;
        }
        let Some(target) = input.target.filter(|t| map.document().get(*t).is_some()) else {
            diagnostics(ResolutionDiagnostic {
                input_id: input.input_id,
                stage: ResolutionStage::Primary,
                path: ResolutionPath::None,
                candidate_count: 0,
                matched: None,
                matched_keys: Vec::new(),
            });
            return ClickOutcome::Unresolved;
        };

        let mut attempt = Attempt {
            map,
            input,
            target,
            label: label_text(map.document(), input, target),
            diagnostics,
        };

        let resolved = attempt
            .primary()
            .map(|r| (r, ResolutionStage::Primary))
            .or_else(|| attempt.secondary().map(|r| (r, ResolutionStage::Secondary)))
            .or_else(|| attempt.tertiary().map(|r| (r, ResolutionStage::Tertiary)));

        match resolved {
            Some((record, stage)) => {
                let section_id = map.index().record(record).section.id.clone();
                tracing::debug!(input_id = input.input_id, %section_id, ?stage, "click resolved");
                ClickOutcome::Resolved {
                    section_id,
                    record,
                    stage,
                }
            }
            None => {
                tracing::debug!(input_id = input.input_id, "click unresolved");
                ClickOutcome::Unresolved
            }
        }
    }

    pub fn handled_inputs(&self) -> usize {
        self.handled.len()
    }
}

/// Text of the interesting label for a click: the event path first, then the
/// target's ancestors.
fn label_text(doc: &MapDocument, input: &PointerInput, target: ElementId) -> Option<String> {
    let text_of = |id: &ElementId| {
        let el = doc.get(*id)?;
        if !el.is_text() {
            return None;
        }
        el.text_content()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    input
        .path
        .iter()
        .find_map(text_of)
        .or_else(|| doc.ancestors_inclusive(target).find_map(|id| text_of(&id)))
}

struct Attempt<'a, 'd> {
    map: &'a ResolvedMap,
    input: &'a PointerInput,
    target: ElementId,
    label: Option<String>,
    diagnostics: &'d mut dyn FnMut(ResolutionDiagnostic),
}

impl Attempt<'_, '_> {
    fn report(
        &mut self,
        stage: ResolutionStage,
        path: ResolutionPath,
        candidate_count: usize,
        record: Option<RecordId>,
        matched_keys: Vec<String>,
    ) {
        (self.diagnostics)(ResolutionDiagnostic {
            input_id: self.input.input_id,
            stage,
            path,
            candidate_count,
            matched: record.map(|r| self.map.index().record(r).section.id.clone()),
            matched_keys,
        });
    }

    fn depth(&self) -> usize {
        self.map.config().max_ancestor_depth
    }

    fn primary(&mut self) -> Option<RecordId> {
        let map = self.map;
        let doc = map.document();
        let table: &AssociationTable = map.table();
        let walked = doc.ancestors_inclusive(self.target).take(self.depth() + 1).count();
        let hit = table.lookup_upwards(doc, self.target, self.depth());

        let mut keys = Vec::new();
        let path = match hit {
            None => ResolutionPath::None,
            Some((el, _)) => {
                let source = table.binding_for(el).map(|b| &b.source);
                if let Some(MatchSource::Identifier { key } | MatchSource::Label { key }) = source {
                    keys.push(key.clone());
                }
                if let Some(raw) = doc.element(el).raw_id() {
                    if !keys.iter().any(|k| k == raw) {
                        keys.push(raw.to_string());
                    }
                }
                match source {
                    Some(MatchSource::Proximity { .. }) => ResolutionPath::Proximity,
                    _ => ResolutionPath::Mapping,
                }
            }
        };
        let record = hit.map(|(_, r)| r);
        self.report(ResolutionStage::Primary, path, walked, record, keys);
        record
    }

    /// Raw identifiers on the target and its ancestors, generic ones excluded.
    fn raw_identifiers(&self) -> Vec<String> {
        let doc = self.map.document();
        let attrs = &self.map.config().identifier_attributes;
        doc.ancestors_inclusive(self.target)
            .take(self.depth() + 1)
            .filter(|id| *id != doc.root())
            .filter_map(|id| element_identifier(doc.element(id), attrs))
            .filter(|raw| !is_generic_identifier(raw))
            .map(str::to_string)
            .collect()
    }

    fn secondary(&mut self) -> Option<RecordId> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(text) = &self.label {
            candidates.extend(label_candidates(text));
        }
        for raw in self.raw_identifiers() {
            for key in identifier_candidates(&raw) {
                if !candidates.contains(&key) {
                    candidates.push(key);
                }
            }
        }

        let map = self.map;
        let hit = map.index().first_hit(candidates.iter().map(String::as_str));
        let record = hit.map(|(r, _)| r);
        let keys: Vec<String> = hit.map(|(_, key)| key.to_string()).into_iter().collect();
        let path = if record.is_some() {
            ResolutionPath::Mapping
        } else {
            ResolutionPath::None
        };
        self.report(ResolutionStage::Secondary, path, candidates.len(), record, keys);
        record
    }

    fn tertiary(&mut self) -> Option<RecordId> {
        let input = match &self.label {
            Some(text) => text.clone(),
            None => self.raw_identifiers().join(" "),
        };
        let map = self.map;
        let (record, candidate_count) = if input.trim().is_empty() {
            (None, 0)
        } else {
            let found = HeuristicResolver::new(map.index(), &map.config().heuristic)
                .resolve(&input)
                .map(|m| m.record);
            (found, map.index().len())
        };
        let (path, keys) = match record {
            Some(_) => (ResolutionPath::Mapping, vec![input.trim().to_string()]),
            None => (ResolutionPath::None, Vec::new()),
        };
        self.report(ResolutionStage::Tertiary, path, candidate_count, record, keys);
        record
    }
}
