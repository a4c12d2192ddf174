#![forbid(unsafe_code)]

use std::str::FromStr;
use svgtypes::{PointsParser, SimplePathSegment, SimplifyingPathParser};

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;
pub type Bounds = euclid::Box2D<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

/// Approximate advance of one glyph relative to the font size. Labels only need a
/// plausible center, not a measured extent.
const GLYPH_ADVANCE_EM: f64 = 0.6;
const DEFAULT_FONT_SIZE: f64 = 16.0;

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches("px").trim();
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// First number of a coordinate list attribute (`x="10 20 30"` on text).
pub(crate) fn parse_first_number(raw: &str) -> Option<f64> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .find(|s| !s.is_empty())
        .and_then(parse_number)
}

pub(crate) fn parse_transform(raw: &str) -> Option<Transform> {
    let ts = svgtypes::Transform::from_str(raw).ok()?;
    Some(Transform::new(ts.a, ts.b, ts.c, ts.d, ts.e, ts.f))
}

pub(crate) fn parse_view_box(raw: &str) -> Option<Rect> {
    let vb = svgtypes::ViewBox::from_str(raw).ok()?;
    if vb.w <= 0.0 || vb.h <= 0.0 {
        return None;
    }
    Some(Rect::new(point(vb.x, vb.y), Size::new(vb.w, vb.h)))
}

/// Every coordinate a path touches, control points included. The hull of those points
/// contains the curve, which is all proximity matching needs.
pub(crate) fn path_points(d: &str) -> Vec<Point> {
    let mut out = Vec::new();
    for seg in SimplifyingPathParser::from(d) {
        let Ok(seg) = seg else {
            break;
        };
        match seg {
            SimplePathSegment::MoveTo { x, y } | SimplePathSegment::LineTo { x, y } => {
                out.push(point(x, y));
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                out.push(point(x1, y1));
                out.push(point(x, y));
            }
            SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                out.push(point(x1, y1));
                out.push(point(x2, y2));
                out.push(point(x, y));
            }
            SimplePathSegment::ClosePath => {}
        }
    }
    out
}

pub(crate) fn polygon_points(points: &str) -> Vec<Point> {
    PointsParser::from(points)
        .map(|(x, y)| point(x, y))
        .collect()
}

pub(crate) fn rect_points(x: f64, y: f64, w: f64, h: f64) -> Vec<Point> {
    if w <= 0.0 || h <= 0.0 {
        return Vec::new();
    }
    vec![point(x, y), point(x + w, y + h)]
}

pub(crate) fn ellipse_points(cx: f64, cy: f64, rx: f64, ry: f64) -> Vec<Point> {
    if rx <= 0.0 || ry <= 0.0 {
        return Vec::new();
    }
    vec![
        point(cx - rx, cy - ry),
        point(cx + rx, cy - ry),
        point(cx - rx, cy + ry),
        point(cx + rx, cy + ry),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub(crate) fn parse(raw: &str) -> Self {
        match raw.trim() {
            "middle" => Self::Middle,
            "end" => Self::End,
            _ => Self::Start,
        }
    }
}

/// Estimated box of a single-line text run anchored at `(x, y)` (the baseline).
pub(crate) fn text_points(
    x: f64,
    y: f64,
    chars: usize,
    font_size: Option<f64>,
    anchor: TextAnchor,
) -> Vec<Point> {
    if chars == 0 {
        return Vec::new();
    }
    let size = font_size.filter(|s| *s > 0.0).unwrap_or(DEFAULT_FONT_SIZE);
    let width = chars as f64 * size * GLYPH_ADVANCE_EM;
    let left = match anchor {
        TextAnchor::Start => x,
        TextAnchor::Middle => x - width / 2.0,
        TextAnchor::End => x - width,
    };
    vec![point(left, y - size * 0.8), point(left + width, y + size * 0.2)]
}

pub(crate) fn bounds_of(points: &[Point], ctm: &Transform) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }
    let b = Bounds::from_points(points.iter().map(|p| ctm.transform_point(*p)));
    let finite = b.min.x.is_finite()
        && b.min.y.is_finite()
        && b.max.x.is_finite()
        && b.max.y.is_finite();
    finite.then_some(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_points_cover_relative_commands_and_arcs() {
        let pts = path_points("M10 10 l 20 0 v 20 h -20 z");
        let b = bounds_of(&pts, &Transform::identity()).unwrap();
        assert_eq!(b.min, point(10.0, 10.0));
        assert_eq!(b.max, point(30.0, 30.0));

        let arc = path_points("M0 0 A 10 10 0 0 1 20 0");
        assert!(!arc.is_empty());
    }

    #[test]
    fn malformed_path_data_keeps_the_valid_prefix() {
        let pts = path_points("M0 0 L 10 10 L oops");
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn transforms_compose_into_document_space() {
        let t = parse_transform("translate(100 50) scale(2)").unwrap();
        let b = bounds_of(&rect_points(0.0, 0.0, 10.0, 10.0), &t).unwrap();
        assert_eq!(b.min, point(100.0, 50.0));
        assert_eq!(b.max, point(120.0, 70.0));
    }

    #[test]
    fn text_box_is_centered_for_middle_anchor() {
        let pts = text_points(100.0, 100.0, 3, Some(10.0), TextAnchor::Middle);
        let b = bounds_of(&pts, &Transform::identity()).unwrap();
        assert_eq!(b.center().x, 100.0);
    }

    #[test]
    fn view_box_rejects_empty_frames() {
        assert!(parse_view_box("0 0 0 100").is_none());
        let vb = parse_view_box("0 0 1200 800").unwrap();
        assert_eq!(vb.size, Size::new(1200.0, 800.0));
    }
}
