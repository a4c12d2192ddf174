//! One pass over the parsed diagram, bucketing elements for the matchers.

use crate::config::ResolverConfig;
use crate::document::{ElementId, MapDocument, MapElement};
use regex::Regex;
use std::sync::OnceLock;

fn generic_identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?:defs|clip|clippath|mask|gradient|lineargradient|radialgradient|filter|pattern|symbol|marker)[\w\-]*|layer[-_ ]?\d*|xmlid_\d+_?|(?:path|g|rect|polygon|polyline|circle|ellipse|line|text|tspan|group|image|use|shape|svg)[-_]?\d+(?:[-_]\d+)*)$",
        )
        .expect("valid regex")
    })
}

fn backdrop_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)background|outline|stage").expect("valid regex"))
}

/// Ids that editors generate for infrastructure (`defs`, `clip0_1`, `Layer_1`,
/// `path1234`, `XMLID_12_`). They say nothing about which section a shape is.
pub fn is_generic_identifier(raw: &str) -> bool {
    generic_identifier_regex().is_match(raw.trim())
}

/// The first configured identifier attribute carried by `el`.
pub fn element_identifier<'d>(el: &'d MapElement, attributes: &[String]) -> Option<&'d str> {
    attributes
        .iter()
        .find_map(|name| el.attr(name).map(str::trim).filter(|v| !v.is_empty()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedElement {
    pub element: ElementId,
    pub raw_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelElement {
    pub element: ElementId,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub identified: Vec<IdentifiedElement>,
    /// Text labels; hosts must keep pointer interaction enabled on these.
    pub labels: Vec<LabelElement>,
    pub unlabeled: Vec<ElementId>,
    /// Unlabeled candidates dropped because their geometry could not be resolved.
    pub geometry_unavailable: usize,
    /// Candidates dropped by the area floor.
    pub below_min_area: usize,
    /// Whether the shape cap cut the candidate scan short.
    pub capped: bool,
}

fn has_no_fill(el: &MapElement) -> bool {
    el.style_property("fill")
        .is_some_and(|f| f.eq_ignore_ascii_case("none"))
}

fn is_backdrop(el: &MapElement) -> bool {
    let re = backdrop_marker_regex();
    el.raw_id().is_some_and(|id| re.is_match(id)) || el.class().is_some_and(|c| re.is_match(c))
}

fn is_leaf_text(doc: &MapDocument, id: ElementId) -> bool {
    let el = doc.element(id);
    el.is_text()
        && !el
            .children()
            .iter()
            .any(|c| doc.element(*c).is_text())
}

pub fn classify(doc: &MapDocument, config: &ResolverConfig) -> Classification {
    let limits = &config.geometry;
    let mut out = Classification::default();
    let mut examined = 0usize;

    for id in doc.ids() {
        if id == doc.root() || doc.is_non_rendered(id) {
            continue;
        }
        let el = doc.element(id);
        let identifier = element_identifier(el, &config.identifier_attributes);

        if let Some(raw_id) = identifier {
            out.identified.push(IdentifiedElement {
                element: id,
                raw_id: raw_id.to_string(),
            });
        }

        if is_leaf_text(doc, id) {
            if let Some(text) = el.text_content() {
                let chars = text.trim().chars().count();
                if chars > 0 && chars <= limits.label_max_chars {
                    out.labels.push(LabelElement {
                        element: id,
                        text: text.trim().to_string(),
                    });
                }
            }
            continue;
        }

        if !el.is_drawable() || identifier.is_some_and(|raw| !is_generic_identifier(raw)) {
            continue;
        }
        if has_no_fill(el) || is_backdrop(el) {
            continue;
        }
        if out.capped {
            continue;
        }
        if examined >= limits.max_unlabeled_shapes {
            out.capped = true;
            tracing::debug!(
                cap = limits.max_unlabeled_shapes,
                "unlabeled shape cap reached"
            );
            continue;
        }
        examined += 1;

        match doc.bounding_box(id) {
            None => out.geometry_unavailable += 1,
            Some(b) if b.area() <= limits.min_shape_area => out.below_min_area += 1,
            Some(_) => out.unlabeled.push(id),
        }
    }

    tracing::debug!(
        identified = out.identified.len(),
        labels = out.labels.len(),
        unlabeled = out.unlabeled.len(),
        geometry_unavailable = out.geometry_unavailable,
        below_min_area = out.below_min_area,
        "classified diagram elements"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(svg: &str, config: &ResolverConfig) -> (MapDocument, Classification) {
        let doc = MapDocument::parse(svg).unwrap();
        let c = classify(&doc, config);
        (doc, c)
    }

    #[test]
    fn generic_identifiers_are_recognized() {
        for id in ["defs", "clip0_12", "Layer_1", "path1234", "XMLID_12_", "g45", "linearGradient3"] {
            assert!(is_generic_identifier(id), "{id}");
        }
        for id in ["232-group", "t305", "orchestra-left", "section_101"] {
            assert!(!is_generic_identifier(id), "{id}");
        }
    }

    #[test]
    fn buckets_identified_labels_and_unlabeled_shapes() {
        let svg = r#"<svg viewBox="0 0 500 500">
  <defs><path id="clip-shape" d="M0 0H100V100Z"/></defs>
  <rect id="background" width="500" height="500"/>
  <path id="101" d="M0 0H50V50H0Z"/>
  <path id="path77" d="M100 0H150V50H100Z"/>
  <path d="M200 0H250V50H200Z"/>
  <path d="M300 0H302V2H300Z"/>
  <path fill="none" d="M0 100H100V200H0Z"/>
  <path class="venue-outline" d="M0 300H100V400H0Z"/>
  <text x="10" y="10"><tspan>A</tspan><tspan>B</tspan></text>
  <text x="20" y="20">This paragraph is far too long to be a section label on a map</text>
</svg>"#;
        let (doc, c) = classify_str(svg, &ResolverConfig::default());

        let ids: Vec<&str> = c.identified.iter().map(|e| e.raw_id.as_str()).collect();
        assert_eq!(ids, vec!["background", "101", "path77"]);

        let labels: Vec<&str> = c.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(labels, vec!["A", "B"]);

        let unlabeled: Vec<Option<&str>> = c
            .unlabeled
            .iter()
            .map(|id| doc.element(*id).raw_id())
            .collect();
        assert_eq!(unlabeled, vec![Some("path77"), None]);
        assert_eq!(c.below_min_area, 1);
        assert!(!c.capped);
    }

    #[test]
    fn shape_cap_bounds_the_scan() {
        let mut svg = String::from(r#"<svg viewBox="0 0 10000 100">"#);
        for i in 0..10 {
            let x = i * 100;
            svg.push_str(&format!(r#"<rect x="{x}" width="50" height="50"/>"#));
        }
        svg.push_str("</svg>");
        let mut config = ResolverConfig::default();
        config.geometry.max_unlabeled_shapes = 4;
        let (_, c) = classify_str(&svg, &config);
        assert_eq!(c.unlabeled.len(), 4);
        assert!(c.capped);
    }

    #[test]
    fn shapes_without_geometry_are_skipped_not_fatal() {
        let svg = r#"<svg><path d="not a path"/><rect width="20" height="20"/></svg>"#;
        let (_, c) = classify_str(svg, &ResolverConfig::default());
        assert_eq!(c.geometry_unavailable, 1);
        assert_eq!(c.unlabeled.len(), 1);
    }
}
