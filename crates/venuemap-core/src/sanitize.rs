//! Untrusted venue markup → markup that is safe to parse and interact with.
//!
//! Exports from venue vendors routinely ship scripts, editor metadata, remote
//! references and `pointer-events: none` on every layer. The rewrite keeps only the
//! diagram subtree and turns interaction back on; it never fails, an unusable input
//! simply yields an empty string.

use lol_html::{RewriteStrSettings, element, rewrite_str};
use regex::Regex;
use std::sync::OnceLock;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Elements dropped together with their content.
const ACTIVE_CONTENT_TAGS: &[&str] = &[
    "script",
    "foreignobject",
    "iframe",
    "object",
    "embed",
    "metadata",
];

/// Editor namespaces with no rendering relevance.
const AUTHORING_NAMESPACES: &[&str] = &[
    "sodipodi", "inkscape", "sketch", "serif", "i", "x", "graph", "a", "dc", "cc", "rdf",
];

const REFERENCE_ATTRS: &[&str] = &["href", "xlink:href", "src"];

fn svg_subtree_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<svg\b.*</svg\s*>").expect("valid regex"))
}

fn self_closing_svg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<svg\b[^>]*/>").expect("valid regex"))
}

fn css_external_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)url\(\s*['"]?\s*(?:[a-z][a-z0-9+.\-]*:|//)[^)]*\)"#)
            .expect("valid regex")
    })
}

fn css_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@import[^;]*;?").expect("valid regex"))
}

fn css_pointer_events_none_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)pointer-events(\s*:\s*)none").expect("valid regex"))
}

fn extract_svg_subtree(raw: &str) -> Option<&str> {
    svg_subtree_regex()
        .find(raw)
        .or_else(|| self_closing_svg_regex().find(raw))
        .map(|m| m.as_str())
}

/// Whether a reference would reach outside the document. Fragment references and
/// inline raster images are the only ones kept.
fn is_external_reference(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() || v.starts_with('#') {
        return false;
    }
    match url::Url::parse(v) {
        Ok(u) if u.scheme() == "data" => !u.path().to_ascii_lowercase().starts_with("image/"),
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeAction {
    Keep,
    Remove,
    Set(&'static str),
}

fn attribute_action(lc_name: &str, value: &str) -> AttributeAction {
    if lc_name.starts_with("on") {
        return AttributeAction::Remove;
    }

    if let Some((prefix, local)) = lc_name.split_once(':') {
        let ns = if prefix == "xmlns" { local } else { prefix };
        if AUTHORING_NAMESPACES.contains(&ns) {
            return AttributeAction::Remove;
        }
    }

    // Illustrator declares namespaces through DTD entities (`&ns_svg;`) that no XML
    // parser will resolve once the DOCTYPE is gone.
    if value.contains("&ns_") {
        return if lc_name == "xmlns" {
            AttributeAction::Set(SVG_NAMESPACE)
        } else {
            AttributeAction::Remove
        };
    }

    if REFERENCE_ATTRS.contains(&lc_name) && is_external_reference(value) {
        return AttributeAction::Set("");
    }

    if lc_name == "pointer-events" && value.trim().eq_ignore_ascii_case("none") {
        return AttributeAction::Set("auto");
    }

    AttributeAction::Keep
}

/// Sanitizes raw diagram markup. Returns an empty string when no `<svg>` root exists.
pub fn sanitize_markup(raw: &str) -> String {
    let Some(subtree) = extract_svg_subtree(raw) else {
        tracing::debug!(input_bytes = raw.len(), "no <svg> root in markup");
        return String::new();
    };

    let css = css_external_url_regex().replace_all(subtree, "url()");
    let css = css_import_regex().replace_all(&css, "");

    let handlers = vec![element!("*", |el| {
        let tag = el.tag_name().to_ascii_lowercase();

        if ACTIVE_CONTENT_TAGS.contains(&tag.as_str()) {
            el.remove();
            return Ok(());
        }
        if let Some((prefix, _)) = tag.split_once(':') {
            if AUTHORING_NAMESPACES.contains(&prefix) {
                el.remove();
                return Ok(());
            }
        }

        let attrs: Vec<(String, String)> = el
            .attributes()
            .iter()
            .map(|a| (a.name(), a.value()))
            .collect();

        for (name, value) in attrs {
            match attribute_action(&name.to_ascii_lowercase(), &value) {
                AttributeAction::Keep => {}
                AttributeAction::Remove => el.remove_attribute(&name),
                AttributeAction::Set(v) => el.set_attribute(&name, v)?,
            }
        }

        if tag == "svg" {
            if !el.has_attribute("xmlns") {
                el.set_attribute("xmlns", SVG_NAMESPACE)?;
            }
            if !el.has_attribute("xmlns:xlink") {
                el.set_attribute("xmlns:xlink", XLINK_NAMESPACE)?;
            }
        }

        Ok(())
    })];

    let rewritten = match rewrite_str(
        css.as_ref(),
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::new()
        },
    ) {
        Ok(out) => out,
        Err(err) => {
            tracing::warn!(error = %err, "diagram markup could not be rewritten");
            return String::new();
        }
    };

    css_pointer_events_none_regex()
        .replace_all(&rewritten, "pointer-events${1}auto")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MapDocument;

    #[test]
    fn keeps_only_the_svg_subtree() {
        let out = sanitize_markup(
            r#"<?xml version="1.0"?><!DOCTYPE svg><html><body><p>venue</p><svg viewBox="0 0 10 10"><rect width="5" height="5"/></svg><p>after</p></body></html>"#,
        );
        assert!(out.starts_with("<svg"));
        assert!(out.ends_with("</svg>"));
        assert!(!out.contains("<p>"));
        assert!(MapDocument::parse(&out).is_ok());
    }

    #[test]
    fn missing_root_yields_empty_output() {
        assert_eq!(sanitize_markup(""), "");
        assert_eq!(sanitize_markup("<div>no diagram</div>"), "");
    }

    #[test]
    fn strips_scripts_foreign_objects_and_event_handlers() {
        let out = sanitize_markup(
            r#"<svg><script>alert(1)</script><foreignObject><iframe src="x"></iframe></foreignObject><path id="p" d="M0 0H10V10Z" onclick="steal()" onMouseOver="x()"/></svg>"#,
        );
        assert!(!out.contains("alert"));
        assert!(!out.to_ascii_lowercase().contains("foreignobject"));
        assert!(!out.to_ascii_lowercase().contains("onclick"));
        assert!(!out.to_ascii_lowercase().contains("onmouseover"));
        assert!(out.contains(r#"id="p""#));
        assert!(MapDocument::parse(&out).is_ok());
    }

    #[test]
    fn neutralizes_external_references() {
        let out = sanitize_markup(
            r##"<svg><image href="https://cdn.example.com/seat.png" width="1" height="1"/><use xlink:href="#shape"/><a href="javascript:alert(1)"><text>x</text></a><rect style="fill:url(https://evil.example/p.svg#g)" width="2" height="2"/><style>@import url("https://evil.example/x.css"); .a { fill: url(#grad) }</style></svg>"##,
        );
        assert!(!out.contains("cdn.example.com"));
        assert!(!out.contains("javascript:"));
        assert!(!out.contains("evil.example"));
        assert!(out.contains(r##"xlink:href="#shape""##));
        assert!(out.contains("url(#grad)"));
        assert!(out.contains(r#"href="""#));
    }

    #[test]
    fn inline_raster_data_is_kept_but_other_data_urls_are_not() {
        assert!(!is_external_reference("data:image/png;base64,AAAA"));
        assert!(is_external_reference("data:text/html,<b>x</b>"));
        assert!(is_external_reference("seat.png"));
        assert!(is_external_reference("//cdn.example.com/a.png"));
        assert!(!is_external_reference("#local"));
    }

    #[test]
    fn strips_authoring_tool_namespaces() {
        let out = sanitize_markup(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd"><sodipodi:namedview id="base"/><g inkscape:label="Layer 1" inkscape:groupmode="layer"><rect width="20" height="20"/></g></svg>"#,
        );
        assert!(!out.contains("inkscape"));
        assert!(!out.contains("sodipodi"));
        let doc = MapDocument::parse(&out).unwrap();
        assert!(doc.ids().any(|id| doc.element(id).tag() == "rect"));
    }

    #[test]
    fn illustrator_entity_namespaces_become_parseable() {
        let out = sanitize_markup(
            r#"<svg version="1.1" xmlns="&ns_svg;" xmlns:x="&ns_extend;" xmlns:graph="&ns_graphs;" i:viewOrigin="0 0"><path d="M0 0H10V10Z" i:knockout="Off"/></svg>"#,
        );
        assert!(!out.contains("&ns_"));
        assert!(out.contains(SVG_NAMESPACE));
        assert!(MapDocument::parse(&out).is_ok());
    }

    #[test]
    fn pointer_events_none_is_force_enabled() {
        let out = sanitize_markup(
            r#"<svg><style>.sec { pointer-events: none; }</style><g pointer-events="none"><path style="fill:red;pointer-events:none" d="M0 0H1V1Z"/></g></svg>"#,
        );
        assert!(!out.contains("none"));
        assert!(out.contains(r#"pointer-events="auto""#));
        assert!(out.contains("pointer-events:auto"));
        assert!(out.contains("pointer-events: auto"));
    }
}
