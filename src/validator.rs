//! Default attribute validator (spec ambient §6a): decides which evaluated
//! attributes survive onto the emitted SVG element.
//!
//! Relation tags (`below` and every placement relation) are always stripped
//! silently: they steer the placement solver, not the rendered markup, and
//! stripping them is expected rather than a sign of a malformed attribute.

use std::collections::HashMap;

use crate::element::ElementKind;

pub const RELATION_TAGS: &[&str] = &[
    "below",
    "adjacent-left",
    "adjacent-right",
    "adjacent-above",
    "adjacent-below",
    "place-left",
    "place-right",
    "place-above",
    "place-below",
    "disjoint",
];

fn allowed_for(kind: ElementKind, attr: &str) -> bool {
    const COMMON: &[&str] = &["id", "class", "style", "transform", "fill", "stroke", "stroke-width", "opacity"];
    if COMMON.contains(&attr) {
        return true;
    }
    match kind {
        ElementKind::Rect => matches!(attr, "x" | "y" | "width" | "height" | "rx" | "ry"),
        ElementKind::Circle => matches!(attr, "cx" | "cy" | "r"),
        ElementKind::Path => attr == "d",
        ElementKind::Group => false,
    }
}

/// Splits `attrs` into the subset the output element may carry and the rest.
/// Relation tags are dropped without being reported; anything else unknown
/// to the element kind is reported as `stripped` so the caller can log it.
pub fn strip_invalid_attributes(kind: ElementKind, attrs: HashMap<String, String>) -> (HashMap<String, String>, Vec<String>) {
    let mut kept = HashMap::new();
    let mut stripped = Vec::new();
    for (k, v) in attrs {
        if RELATION_TAGS.contains(&k.as_str()) {
            continue;
        }
        if allowed_for(kind, &k) {
            kept.insert(k, v);
        } else {
            stripped.push(k);
        }
    }
    (kept, stripped)
}
