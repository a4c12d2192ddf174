//! Render-pass lifecycle for a hosting surface.
//!
//! A [`MapSurface`] owns at most one live [`RenderPass`]. Each pass carries a
//! [`Generation`]; pointer events are tagged with the generation they were bound under
//! and ignored once that pass is gone. Rebuilds are skipped when the
//! [`RenderSignature`] of the inputs is unchanged. Markup supplied by reference is
//! fetched through a [`MarkupFetcher`]; a fetch that completes after newer input
//! arrived is dropped.

use crate::binder::{StyleResource, VisualState};
use crate::config::ResolverConfig;
use crate::delegate::{ClickOutcome, ClickResolver, PointerInput, ResolutionDiagnostic};
use crate::document::{ElementId, MapDocument};
use crate::geom::Rect;
use crate::model::{Availability, AvailabilityInput, Section};
use crate::pipeline::ResolvedMap;
use crate::sanitize::sanitize_markup;
use crate::signature::RenderSignature;
use crate::{Error, Result};
use std::future::Future;

/// Where the raw diagram markup comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupSource {
    Inline(String),
    /// URL-like reference resolved by a [`MarkupFetcher`].
    Reference(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderInput {
    pub markup: MarkupSource,
    /// Explicit coordinate frame; derived from the markup when absent.
    pub view_box: Option<Rect>,
    pub catalog: Vec<Section>,
    pub availability: AvailabilityInput,
    pub selection: Option<String>,
}

/// Callbacks into the host.
pub trait MapEvents {
    fn on_hover(&mut self, section: Option<&Section>, availability: Option<&Availability>);

    fn on_click(&mut self, section_id: &str, section: &Section, availability: Option<&Availability>);

    fn on_diagnostic(&mut self, _diagnostic: &ResolutionDiagnostic) {}
}

/// Fetches markup supplied by reference.
pub trait MarkupFetcher {
    fn fetch_text(&self, reference: &str) -> impl Future<Output = Result<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

/// Handle for one in-flight markup fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    reference: String,
}

impl FetchTicket {
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildStatus {
    Rebuilt(Generation),
    /// The pass could not be built; an empty "no diagram" pass is installed instead.
    Degraded(Generation),
    /// Inputs are unchanged; the current pass stays.
    Unchanged(Generation),
    /// Markup must be fetched first; complete with [`MapSurface::complete_fetch`].
    AwaitingFetch(FetchTicket),
    /// The fetch was superseded by newer input.
    StaleFetch,
}

/// Everything one render pass owns. Dropped whole when the next pass is installed.
#[derive(Debug)]
pub struct RenderPass {
    generation: Generation,
    signature: RenderSignature,
    view_box: Option<Rect>,
    selection: Option<String>,
    map: Option<ResolvedMap>,
    states: Vec<(ElementId, VisualState)>,
    resolver: ClickResolver,
}

impl RenderPass {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn signature(&self) -> RenderSignature {
        self.signature
    }

    /// `None` when the pass degraded to "no diagram".
    pub fn map(&self) -> Option<&ResolvedMap> {
        self.map.as_ref()
    }

    pub fn document(&self) -> Option<&MapDocument> {
        self.map.as_ref().map(ResolvedMap::document)
    }

    pub fn view_box(&self) -> Option<Rect> {
        self.view_box
            .or_else(|| self.document().and_then(MapDocument::view_box))
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn visual_states(&self) -> &[(ElementId, VisualState)] {
        &self.states
    }
}

pub struct MapSurface<E: MapEvents> {
    events: E,
    style: StyleResource,
    config: ResolverConfig,
    pass: Option<RenderPass>,
    next_generation: u64,
    fetch_seq: u64,
    pending_fetch: Option<u64>,
}

impl<E: MapEvents> MapSurface<E> {
    pub fn new(events: E, style: StyleResource, config: ResolverConfig) -> Self {
        Self {
            events,
            style,
            config,
            pass: None,
            next_generation: 1,
            fetch_seq: 0,
            pending_fetch: None,
        }
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn style(&self) -> &StyleResource {
        &self.style
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn current(&self) -> Option<&RenderPass> {
        self.pass.as_ref()
    }

    pub fn generation(&self) -> Option<Generation> {
        self.pass.as_ref().map(RenderPass::generation)
    }

    /// `(element, class name)` for every bound source element of the live pass.
    pub fn class_assignments(&self) -> Vec<(ElementId, &str)> {
        let Some(pass) = &self.pass else {
            return Vec::new();
        };
        pass.states
            .iter()
            .map(|(el, state)| (*el, self.style.class_for(*state)))
            .collect()
    }

    /// Starts a pass for `input`. Inline markup is resolved immediately; a reference
    /// returns a ticket to complete once the markup has been fetched.
    pub fn render(&mut self, input: &RenderInput) -> RebuildStatus {
        match &input.markup {
            MarkupSource::Inline(raw) => {
                self.pending_fetch = None;
                self.rebuild(raw, input)
            }
            MarkupSource::Reference(reference) => {
                self.fetch_seq += 1;
                self.pending_fetch = Some(self.fetch_seq);
                tracing::debug!(reference = %reference, seq = self.fetch_seq, "markup fetch started");
                RebuildStatus::AwaitingFetch(FetchTicket {
                    seq: self.fetch_seq,
                    reference: reference.clone(),
                })
            }
        }
    }

    /// Applies the result of a fetch started by [`Self::render`]. Superseded tickets are
    /// ignored; a failed fetch degrades to an empty pass.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        fetched: Result<String>,
        input: &RenderInput,
    ) -> RebuildStatus {
        if self.pending_fetch != Some(ticket.seq) {
            tracing::debug!(reference = %ticket.reference, seq = ticket.seq, "stale markup fetch ignored");
            return RebuildStatus::StaleFetch;
        }
        self.pending_fetch = None;
        match fetched {
            Ok(raw) => self.rebuild(&raw, input),
            Err(err) => self.install_empty(err, input),
        }
    }

    /// Renders `input`, fetching referenced markup with `fetcher`.
    pub async fn render_with<F: MarkupFetcher>(
        &mut self,
        input: &RenderInput,
        fetcher: &F,
    ) -> RebuildStatus {
        match self.render(input) {
            RebuildStatus::AwaitingFetch(ticket) => {
                let fetched = fetcher.fetch_text(ticket.reference()).await;
                self.complete_fetch(ticket, fetched, input)
            }
            status => status,
        }
    }

    /// Tears the live pass down and cancels any pending fetch.
    pub fn unmount(&mut self) {
        self.pending_fetch = None;
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(old) = self.pass.take() {
            tracing::debug!(generation = old.generation.0, "listeners torn down");
            drop(old);
        }
    }

    fn next_generation(&mut self) -> Generation {
        let g = Generation(self.next_generation);
        self.next_generation += 1;
        g
    }

    fn rebuild(&mut self, raw: &str, input: &RenderInput) -> RebuildStatus {
        let sanitized = sanitize_markup(raw);
        let signature = RenderSignature::compute(
            &sanitized,
            input.view_box,
            input.selection.as_deref(),
            &input.catalog,
            &input.availability,
        );
        if let Some(pass) = &self.pass {
            if pass.signature == signature {
                tracing::trace!(generation = pass.generation.0, "rebuild skipped: inputs unchanged");
                return RebuildStatus::Unchanged(pass.generation);
            }
        }

        tracing::debug!(markup_bytes = sanitized.len(), sections = input.catalog.len(), "rebuilding map");
        let built = MapDocument::parse(&sanitized).map(|doc| {
            ResolvedMap::from_document(doc, &input.catalog, &input.availability, &self.config)
        });
        self.install(signature, built, input)
    }

    fn install_empty(&mut self, err: Error, input: &RenderInput) -> RebuildStatus {
        let signature = RenderSignature::compute(
            "",
            input.view_box,
            input.selection.as_deref(),
            &input.catalog,
            &input.availability,
        );
        self.install(signature, Err(err), input)
    }

    /// Drops the previous pass, then installs the new one under a fresh generation.
    fn install(
        &mut self,
        signature: RenderSignature,
        built: Result<ResolvedMap>,
        input: &RenderInput,
    ) -> RebuildStatus {
        self.teardown();
        let generation = self.next_generation();
        let map = match built {
            Ok(map) => Some(map),
            Err(err) => {
                tracing::warn!(error = %err, generation = generation.0, "no diagram for this pass");
                None
            }
        };
        let states = map
            .as_ref()
            .map(|m| m.visual_states(input.selection.as_deref()))
            .unwrap_or_default();
        let degraded = map.is_none();
        self.pass = Some(RenderPass {
            generation,
            signature,
            view_box: input.view_box,
            selection: input.selection.clone(),
            map,
            states,
            resolver: ClickResolver::new(),
        });
        if degraded {
            RebuildStatus::Degraded(generation)
        } else {
            RebuildStatus::Rebuilt(generation)
        }
    }

    fn live_map(&self, generation: Generation) -> Option<&ResolvedMap> {
        let pass = self.pass.as_ref()?;
        if pass.generation != generation {
            tracing::trace!(stale = generation.0, live = pass.generation.0, "stale event ignored");
            return None;
        }
        pass.map.as_ref()
    }

    /// Pointer entered `target`. Returns `false` when the event was stale.
    pub fn pointer_enter(&mut self, generation: Generation, target: ElementId) -> bool {
        let Some(map) = self.live_map(generation) else {
            return false;
        };
        match map.hover(target) {
            Some(record) => {
                let (section, availability) = (record.section.clone(), record.availability.clone());
                self.events.on_hover(Some(&section), availability.as_ref());
            }
            None => self.events.on_hover(None, None),
        }
        true
    }

    pub fn pointer_leave(&mut self, generation: Generation) -> bool {
        if self.live_map(generation).is_none() {
            return false;
        }
        self.events.on_hover(None, None);
        true
    }

    /// Resolves one physical click. `None` when the event belongs to a pass that is no
    /// longer live.
    pub fn dispatch(&mut self, generation: Generation, input: &PointerInput) -> Option<ClickOutcome> {
        let Self { pass, events, .. } = self;
        let pass = pass.as_mut().filter(|p| p.generation == generation)?;
        let map = pass.map.as_ref()?;

        let outcome = pass
            .resolver
            .dispatch(map, input, &mut |d| events.on_diagnostic(&d));
        if let ClickOutcome::Resolved { section_id, record, .. } = &outcome {
            let record = map.index().record(*record);
            events.on_click(section_id, &record.section, record.availability.as_ref());
        }
        Some(outcome)
    }
}
