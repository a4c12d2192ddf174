//! Identifier canonicalization shared by every matching stage.
//!
//! All synonym and suffix rules live in this module. Index keys and lookup candidates
//! must go through [`normalize`] so that both sides agree on spelling.

use regex::Regex;
use std::sync::OnceLock;

/// Long-form venue-area words rewritten to the abbreviations catalogs use.
///
/// Matched against whole alphabetic runs, so `orchestra_101` and `orchestra101`
/// both rewrite while `orchestral` does not.
const SYNONYMS: &[(&str, &str)] = &[
    ("orchestra", "orch"),
    ("mezzanine", "mezz"),
    ("mezanine", "mezz"),
    ("balcony", "balc"),
    ("sec", "section"),
    ("sect", "section"),
];

fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_\s]+").expect("valid regex"))
}

fn structural_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"section|group|level|tier|bowl").expect("valid regex"))
}

fn rewrite_synonyms(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut run = String::new();

    let flush = |run: &mut String, out: &mut String| {
        if run.is_empty() {
            return;
        }
        match SYNONYMS.iter().find(|(long, _)| *long == run.as_str()) {
            Some((_, short)) => out.push_str(short),
            None => out.push_str(run),
        }
        run.clear();
    };

    for ch in input.chars() {
        if ch.is_ascii_alphabetic() {
            run.push(ch);
        } else {
            flush(&mut run, &mut out);
            out.push(ch);
        }
    }
    flush(&mut run, &mut out);
    out
}

/// Canonicalizes an identifier or label into a lookup key.
///
/// Never fails; the result may be empty (e.g. for `"Section"` alone), and callers treat
/// an empty key as "no key".
pub fn normalize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let rewritten = rewrite_synonyms(&lower);
    let joined = separator_regex().replace_all(&rewritten, "");
    let stripped = structural_word_regex().replace_all(&joined, "");
    stripped.trim().to_string()
}
