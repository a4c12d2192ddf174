#![forbid(unsafe_code)]

//! Venue diagram section resolution (headless).
//!
//! Takes third-party SVG venue diagrams (untrusted markup, inconsistent ids, sometimes no
//! ids at all) and a catalog of sellable sections, and maps diagram elements onto
//! exactly one section each. The mapping drives visual state and hover/click
//! resolution.
//!
//! Design goals:
//! - deterministic, idempotent passes (same inputs, same association table)
//! - no global state: styles, listeners and tables belong to one render pass
//! - runtime-agnostic async markup fetching (no specific executor required)

pub mod binder;
pub mod classify;
pub mod config;
pub mod delegate;
pub mod document;
pub mod error;
pub mod geom;
pub mod heuristic;
pub mod index;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod sanitize;
pub mod signature;
pub mod strategy;
pub mod surface;

pub use binder::{AssociationTable, StyleResource, VisualState};
pub use config::{GeometryLimits, HeuristicWeights, ResolverConfig};
pub use delegate::{ClickOutcome, ClickResolver, PointerInput, ResolutionDiagnostic, ResolutionPath, ResolutionStage};
pub use document::{ElementId, MapDocument};
pub use error::{Error, Result};
pub use heuristic::{HeuristicMatch, HeuristicResolver};
pub use index::{RecordId, SectionIndex};
pub use model::{
    Availability, AvailabilityInput, AvailabilityRecord, CatalogDocument, MatchRecord, Section,
    SectionType,
};
pub use normalize::normalize;
pub use pipeline::{PassSummary, ResolvedMap};
pub use sanitize::sanitize_markup;
pub use signature::RenderSignature;
pub use surface::{
    FetchTicket, Generation, MapEvents, MapSurface, MarkupFetcher, MarkupSource, RebuildStatus,
    RenderInput, RenderPass,
};
