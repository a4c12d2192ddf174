//! Owned, arena-backed view of a sanitized diagram.
//!
//! Elements live in a `Vec` in document (pre-)order and are addressed by [`ElementId`].
//! The whole arena is dropped on rebuild, so handles never outlive the pass that
//! produced them. Geometry is resolved lazily and memoized per element.

use crate::geom::{self, Bounds, Point, Rect, Size, TextAnchor, Transform};
use crate::{Error, Result};
use serde::Serialize;
use std::cell::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shapes that paint an area and can stand for a section.
pub const DRAWABLE_TAGS: &[&str] = &["path", "polygon", "polyline", "rect", "circle", "ellipse"];

pub const TEXT_TAGS: &[&str] = &["text", "tspan", "textPath"];

/// Containers whose content is never painted directly.
pub const NON_RENDERED_CONTAINERS: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "linearGradient",
    "radialGradient",
    "pattern",
    "symbol",
    "marker",
    "filter",
];

#[derive(Debug)]
pub struct MapElement {
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    subtree_end: u32,
    bbox: OnceCell<Option<Bounds>>,
    ctm: OnceCell<Transform>,
}

impl MapElement {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn raw_id(&self) -> Option<&str> {
        self.attr("id").map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn class(&self) -> Option<&str> {
        self.attr("class")
    }

    /// Collapsed text content; only populated for text-bearing elements.
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn is_drawable(&self) -> bool {
        DRAWABLE_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_text(&self) -> bool {
        TEXT_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_group(&self) -> bool {
        self.tag == "g"
    }

    /// A CSS property from the inline `style` attribute, falling back to the
    /// presentation attribute of the same name.
    pub fn style_property(&self, name: &str) -> Option<&str> {
        let from_style = self.attr("style").and_then(|style| {
            style.split(';').find_map(|decl| {
                let (k, v) = decl.split_once(':')?;
                (k.trim() == name).then(|| v.trim())
            })
        });
        from_style.or_else(|| self.attr(name).map(str::trim))
    }
}

#[derive(Debug)]
pub struct MapDocument {
    elements: Vec<MapElement>,
    view_box: Option<Rect>,
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl MapDocument {
    /// Parses sanitized markup. The root element must be `<svg>`.
    pub fn parse(markup: &str) -> Result<Self> {
        if markup.trim().is_empty() {
            return Err(Error::NoDiagramRoot);
        }
        let doc = roxmltree::Document::parse(markup)?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(Error::NoDiagramRoot);
        }

        let mut elements: Vec<MapElement> = Vec::new();
        push_subtree(root, None, &mut elements);

        let view_box = root
            .attribute("viewBox")
            .and_then(geom::parse_view_box)
            .or_else(|| {
                let w = root.attribute("width").and_then(geom::parse_number)?;
                let h = root.attribute("height").and_then(geom::parse_number)?;
                (w > 0.0 && h > 0.0).then(|| Rect::new(geom::point(0.0, 0.0), Size::new(w, h)))
            });

        tracing::trace!(elements = elements.len(), ?view_box, "parsed diagram");
        Ok(Self { elements, view_box })
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&MapElement> {
        self.elements.get(id.index())
    }

    pub fn element(&self, id: ElementId) -> &MapElement {
        &self.elements[id.index()]
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = ElementId> + '_ {
        (0..self.elements.len() as u32).map(ElementId)
    }

    /// The coordinate frame declared by the root element (`viewBox`, then
    /// `width`/`height`).
    pub fn view_box(&self) -> Option<Rect> {
        self.view_box
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.get(id).and_then(MapElement::parent), move |cur| {
            self.element(*cur).parent
        })
    }

    /// `id` followed by its ancestors.
    pub fn ancestors_inclusive(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.get(id).map(|_| id), move |cur| self.element(*cur).parent)
    }

    /// Descendants of `id` in document order.
    pub fn descendants(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        let end = self.get(id).map(|el| el.subtree_end).unwrap_or(id.0);
        (id.0 + 1..end).map(ElementId)
    }

    pub fn find_by_id(&self, raw_id: &str) -> Option<ElementId> {
        self.ids()
            .find(|id| self.element(*id).raw_id() == Some(raw_id))
    }

    /// Nearest enclosing `<g>` that is not the document root.
    pub fn nearest_group(&self, id: ElementId) -> Option<ElementId> {
        self.ancestors(id)
            .find(|a| *a != self.root() && self.element(*a).is_group())
    }

    pub fn first_drawable_descendant(&self, id: ElementId) -> Option<ElementId> {
        self.descendants(id)
            .find(|d| self.element(*d).is_drawable() && !self.is_non_rendered(*d))
    }

    /// Whether `id` sits inside `<defs>`, `<clipPath>`, gradients and similar.
    pub fn is_non_rendered(&self, id: ElementId) -> bool {
        self.ancestors_inclusive(id)
            .any(|a| NON_RENDERED_CONTAINERS.contains(&self.element(a).tag()))
    }

    /// Nearest inherited value of a presentation property.
    pub fn inherited_property(&self, id: ElementId, name: &str) -> Option<&str> {
        self.ancestors_inclusive(id)
            .find_map(|a| self.element(a).style_property(name))
    }

    /// Accumulated transform from element space into document space.
    pub fn ctm(&self, id: ElementId) -> Transform {
        let el = self.element(id);
        *el.ctm.get_or_init(|| {
            let own = el
                .attr("transform")
                .and_then(geom::parse_transform)
                .unwrap_or_else(Transform::identity);
            match el.parent {
                Some(parent) => own.then(&self.ctm(parent)),
                None => own,
            }
        })
    }

    /// Bounding box in document coordinates, or `None` when the element has no
    /// resolvable geometry.
    pub fn bounding_box(&self, id: ElementId) -> Option<Bounds> {
        let el = self.get(id)?;
        *el.bbox.get_or_init(|| self.compute_bounds(id))
    }

    pub fn center(&self, id: ElementId) -> Option<Point> {
        self.bounding_box(id).map(|b| b.center())
    }

    fn number_attr(&self, id: ElementId, name: &str) -> Option<f64> {
        self.element(id).attr(name).and_then(geom::parse_number)
    }

    fn compute_bounds(&self, id: ElementId) -> Option<Bounds> {
        let el = self.element(id);
        let num = |name: &str| self.number_attr(id, name).unwrap_or(0.0);
        let points = match el.tag() {
            "path" => geom::path_points(el.attr("d")?),
            "polygon" | "polyline" => geom::polygon_points(el.attr("points")?),
            "rect" => geom::rect_points(num("x"), num("y"), num("width"), num("height")),
            "circle" => {
                let r = num("r");
                geom::ellipse_points(num("cx"), num("cy"), r, r)
            }
            "ellipse" => geom::ellipse_points(num("cx"), num("cy"), num("rx"), num("ry")),
            "line" => vec![
                geom::point(num("x1"), num("y1")),
                geom::point(num("x2"), num("y2")),
            ],
            "text" | "tspan" | "textPath" => self.text_points(id)?,
            "g" | "svg" | "a" | "switch" => {
                return self
                    .element(id)
                    .children
                    .iter()
                    .filter(|c| !self.is_non_rendered(**c))
                    .filter_map(|c| self.bounding_box(*c))
                    .reduce(|a, b| a.union(&b));
            }
            _ => return None,
        };
        geom::bounds_of(&points, &self.ctm(id))
    }

    fn text_points(&self, id: ElementId) -> Option<Vec<Point>> {
        let el = self.element(id);
        let chars = el.text_content()?.chars().count();
        // tspans without their own position inherit the enclosing text anchor point.
        let coord = |name: &str| {
            self.ancestors_inclusive(id)
                .take_while(|a| self.element(*a).is_text())
                .find_map(|a| self.element(a).attr(name).and_then(geom::parse_first_number))
        };
        let x = coord("x").unwrap_or(0.0);
        let y = coord("y").unwrap_or(0.0);
        let font_size = self
            .inherited_property(id, "font-size")
            .and_then(geom::parse_number);
        let anchor = self
            .inherited_property(id, "text-anchor")
            .map(TextAnchor::parse)
            .unwrap_or(TextAnchor::Start);
        Some(geom::text_points(x, y, chars, font_size, anchor))
    }

    /// Topmost painted element whose bounding box contains `p`.
    ///
    /// A bbox hit test for hosts without a live DOM; later elements paint over
    /// earlier ones, so the scan runs back to front.
    pub fn topmost_at(&self, p: Point) -> Option<ElementId> {
        self.ids().rev().find(|id| {
            let el = self.element(*id);
            (el.is_drawable() || el.is_text())
                && !self.is_non_rendered(*id)
                && self
                    .bounding_box(*id)
                    .is_some_and(|b| b.min.x <= p.x && p.x <= b.max.x && b.min.y <= p.y && p.y <= b.max.y)
        })
    }
}

fn push_subtree(
    node: roxmltree::Node<'_, '_>,
    parent: Option<ElementId>,
    out: &mut Vec<MapElement>,
) -> ElementId {
    let id = ElementId(out.len() as u32);
    let tag = node.tag_name().name().to_string();

    let attrs = node
        .attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect();

    let text = TEXT_TAGS.contains(&tag.as_str()).then(|| {
        let raw: String = node
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        collapse_whitespace(&raw)
    });

    out.push(MapElement {
        tag,
        attrs,
        text: text.filter(|t| !t.is_empty()),
        parent,
        children: Vec::new(),
        subtree_end: id.0 + 1,
        bbox: OnceCell::new(),
        ctm: OnceCell::new(),
    });

    let mut children = Vec::new();
    for child in node.children().filter(|c| c.is_element()) {
        children.push(push_subtree(child, Some(id), out));
    }

    let end = out.len() as u32;
    let el = &mut out[id.index()];
    el.children = children;
    el.subtree_end = end;
    id
}
