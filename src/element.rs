//! Element materialization (spec §4.4): turns a graph node into a drawable
//! payload plus its bounding box, consuming the attributes geometry needs
//! and passing the rest through the validator.

use std::collections::HashMap;

use rand::rngs::StdRng;

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::eval::{AttrValue, EvalContext};
use crate::geometry::path;
use crate::geometry::BoundingBox;
use crate::graph::{AttributedGraph, NodeId};
use crate::scene;
use crate::validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Rect,
    Circle,
    Path,
    Group,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rect" => Some(ElementKind::Rect),
            "circle" => Some(ElementKind::Circle),
            "path" => Some(ElementKind::Path),
            "g" | "svg" => Some(ElementKind::Group),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedElement {
    pub node: NodeId,
    pub kind: ElementKind,
    pub attrs: HashMap<String, String>,
    pub bbox: BoundingBox,
    pub children: Vec<RenderedElement>,
    /// Translation committed by the placement solver at this element's own
    /// nesting level; zero unless a sibling pass moved it.
    pub offset: (f64, f64),
}

fn scalar(attrs: &HashMap<String, AttrValue>, key: &str) -> Option<String> {
    match attrs.get(key) {
        Some(AttrValue::Scalar(s)) => Some(s.clone()),
        _ => None,
    }
}

fn num(attrs: &HashMap<String, AttrValue>, key: &str, default: f64) -> f64 {
    scalar(attrs, key).and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(default)
}

fn finish(
    node: NodeId,
    kind: ElementKind,
    mut attrs: HashMap<String, AttrValue>,
    geometry_keys: &[&str],
    bbox: BoundingBox,
) -> RenderedElement {
    for key in geometry_keys {
        attrs.remove(*key);
    }
    let scalars: HashMap<String, String> = attrs
        .into_iter()
        .filter_map(|(k, v)| match v {
            AttrValue::Scalar(s) => Some((k, s)),
            AttrValue::List(_) => None,
        })
        .collect();
    let (kept, stripped) = validator::strip_invalid_attributes(kind, scalars);
    for attr in stripped {
        log::warn!(target: "svgrammar_render::element", "stripped unrecognized attribute '{attr}' from node {node:?}");
    }
    RenderedElement { node, kind, attrs: kept, bbox, children: Vec::new(), offset: (0.0, 0.0) }
}

fn apply_transform(attrs: &HashMap<String, AttrValue>, bbox: &mut BoundingBox) {
    if let Some(t) = scalar(attrs, "transform") {
        bbox.apply_transform(&t);
    }
}

pub fn materialize_rect(ctx: &EvalContext, n: NodeId) -> Result<RenderedElement, RenderError> {
    let attrs = ctx.extract_all_attributes(n, &[])?;
    let x = num(&attrs, "x", 0.0);
    let y = num(&attrs, "y", 0.0);
    let width = num(&attrs, "width", 0.0);
    let height = num(&attrs, "height", 0.0);
    let mut bbox = BoundingBox::rectangle(x, y, width, height);
    apply_transform(&attrs, &mut bbox);
    Ok(finish(n, ElementKind::Rect, attrs, &["x", "y", "width", "height"], bbox))
}

pub fn materialize_circle(ctx: &EvalContext, n: NodeId) -> Result<RenderedElement, RenderError> {
    let attrs = ctx.extract_all_attributes(n, &[])?;
    let cx = num(&attrs, "cx", 0.0);
    let cy = num(&attrs, "cy", 0.0);
    let r = num(&attrs, "r", 0.0);
    let mut bbox = BoundingBox::circle(cx, cy, r);
    apply_transform(&attrs, &mut bbox);
    Ok(finish(n, ElementKind::Circle, attrs, &["cx", "cy", "r"], bbox))
}

pub fn materialize_path(ctx: &EvalContext, n: NodeId) -> Result<RenderedElement, RenderError> {
    let attrs = ctx.extract_all_attributes(n, &["d_list"])?;
    let d = match attrs.get("d_list") {
        Some(AttrValue::List(parts)) => parts.join(" "),
        _ => scalar(&attrs, "d").unwrap_or_default(),
    };
    let points = path::simulate(&d)?;
    let mut bbox = BoundingBox::from_points(&points);
    apply_transform(&attrs, &mut bbox);
    let mut rendered = finish(n, ElementKind::Path, attrs, &["d", "d_list"], bbox);
    rendered.attrs.insert("d".to_string(), d);
    Ok(rendered)
}

/// Dispatches on the node's own tag; groups recurse back into
/// [`crate::scene::assemble_group`] for sibling z-ordering and placement.
/// `ancestors` is the chain of group nodes currently being materialized, used
/// to reject an untagged inclusion cycle instead of recursing forever.
pub fn materialize(
    graph: &AttributedGraph,
    ctx: &EvalContext,
    config: &RenderConfig,
    rng: &mut StdRng,
    ancestors: &mut Vec<NodeId>,
    n: NodeId,
) -> Result<RenderedElement, RenderError> {
    let tag = graph.tag(n).unwrap_or("");
    match ElementKind::from_tag(tag) {
        Some(ElementKind::Rect) => materialize_rect(ctx, n),
        Some(ElementKind::Circle) => materialize_circle(ctx, n),
        Some(ElementKind::Path) => materialize_path(ctx, n),
        Some(ElementKind::Group) => scene::assemble_group(graph, ctx, config, rng, ancestors, n),
        None => Err(RenderError::malformed(format!("node {n:?} tagged '{tag}' is not a drawable element"))),
    }
}
