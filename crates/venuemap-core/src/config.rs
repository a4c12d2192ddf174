//! Tuning table for the resolution pipeline.
//!
//! The defaults were tuned against real venue exports at a typical diagram scale (a
//! viewBox on the order of 1000–3000 units across). They are kept here, and only here,
//! so hosts and tests can inspect or override them without touching matching logic.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Scores used by the heuristic fallback resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeuristicWeights {
    /// Normalized label equals normalized section name.
    pub exact_match: u32,
    /// Upper bound for the substring-containment bonus. The bonus is further capped by
    /// the length of the shorter of the two strings.
    pub containment_max: u32,
    /// Label and section agree on a venue-area keyword (orchestra, mezzanine, ...).
    pub type_keyword: u32,
    /// Label and section name agree on a front/rear sub-area keyword.
    pub sub_area_keyword: u32,
    /// Bonus for a "front" variant when the label does not say front or rear.
    pub front_default: u32,
    /// Best score must reach this value to be accepted.
    pub min_confidence: u32,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            exact_match: 100,
            containment_max: 40,
            type_keyword: 80,
            sub_area_keyword: 60,
            front_default: 20,
            min_confidence: 60,
        }
    }
}

/// Limits applied while classifying elements and matching by geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometryLimits {
    /// Maximum center-to-center distance between a shape and a matched label.
    pub max_label_distance: f64,
    /// Shapes with a smaller bounding-box area are treated as decoration.
    pub min_shape_area: f64,
    /// Hard cap on unlabeled shapes considered for proximity matching.
    pub max_unlabeled_shapes: usize,
    /// Text longer than this (in chars, trimmed) is not treated as a section label.
    pub label_max_chars: usize,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            max_label_distance: 220.0,
            min_shape_area: 80.0,
            max_unlabeled_shapes: 1500,
            label_max_chars: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    pub heuristic: HeuristicWeights,
    pub geometry: GeometryLimits,
    /// Attributes that carry an authored identifier, in lookup order.
    pub identifier_attributes: Vec<String>,
    /// Ancestor levels walked from a click target during primary resolution.
    pub max_ancestor_depth: usize,
    /// Bind labels that only the heuristic resolver could place. Off by default: such
    /// labels are left to the tertiary click stage and never painted as sections.
    pub bind_heuristic_labels: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            heuristic: HeuristicWeights::default(),
            geometry: GeometryLimits::default(),
            identifier_attributes: vec![
                "id".to_string(),
                "data-section-id".to_string(),
                "data-section".to_string(),
            ],
            max_ancestor_depth: 8,
            bind_heuristic_labels: false,
        }
    }
}

impl ResolverConfig {
    /// Parses a (possibly partial) JSON override on top of the defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::InvalidConfig)
    }
}
