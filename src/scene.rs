//! Scene assembly (spec §4.6): top-level detection, per-sibling-set z-order,
//! recursive group materialization, and placement-relation collection and
//! solving.

use std::collections::HashMap;

use petgraph::graph::DiGraph;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::RenderConfig;
use crate::element::{self, ElementKind, RenderedElement};
use crate::error::RenderError;
use crate::eval::EvalContext;
use crate::graph::{AttributedGraph, NodeId, SuccessorMode};
use crate::solver::{Relation, Solver};
use crate::validator::RELATION_TAGS;

const ROUND_DECIMALS: f64 = 1_000_000.0;

fn round6(x: f64) -> f64 {
    (x * ROUND_DECIMALS).round() / ROUND_DECIMALS
}

/// All drawable-tagged nodes not reachable, via untagged edges, from any
/// `g`-tagged ancestor; the `svg` node's direct untagged children are always
/// included.
fn find_top_level(graph: &AttributedGraph) -> Vec<NodeId> {
    let mut top = Vec::new();
    let mut seen = std::collections::HashSet::new();

    if let Some(svg) = graph.find_by_tag("svg") {
        for n in graph.untagged_successors(svg, SuccessorMode::Normal) {
            if seen.insert(n) {
                top.push(n);
            }
        }
    }

    for n in graph.inner.node_indices() {
        let is_drawable = graph.tag(n).and_then(ElementKind::from_tag).is_some();
        if is_drawable && !seen.contains(&n) && !graph.has_group_ancestor(n) {
            seen.insert(n);
            top.push(n);
        }
    }
    top
}

/// Topologically sorts `members` by their `below` edges, restricted to that
/// set; cross-set `below` edges are ignored (a known limitation, per spec).
fn order_by_z(graph: &AttributedGraph, members: &[NodeId]) -> Result<Vec<NodeId>, RenderError> {
    let member_set: std::collections::HashSet<NodeId> = members.iter().copied().collect();
    let mut sub: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index_of = HashMap::with_capacity(members.len());
    for &n in members {
        index_of.insert(n, sub.add_node(n));
    }
    for &n in members {
        for (tag, target) in graph.children(n, SuccessorMode::Normal) {
            if tag == Some("below") && member_set.contains(&target) {
                sub.add_edge(index_of[&n], index_of[&target], ());
            }
        }
    }
    let order = petgraph::algo::toposort(&sub, None)
        .map_err(|cycle| RenderError::malformed(format!("'below' ordering cycle at node {:?}", sub[cycle.node_id()])))?;
    Ok(order.into_iter().map(|i| sub[i]).collect())
}

fn collect_relations(graph: &AttributedGraph, members: &[NodeId]) -> Vec<(NodeId, Relation, NodeId)> {
    let member_set: std::collections::HashSet<NodeId> = members.iter().copied().collect();
    let mut out = Vec::new();
    for &n in members {
        for (tag, target) in graph.relation_edges(n, RELATION_TAGS) {
            let Some(relation) = Relation::from_tag(tag) else { continue };
            if member_set.contains(&target) {
                out.push((n, relation, target));
            } else {
                log::warn!(
                    target: "svgrammar_render::scene",
                    "dropping cross-group placement relation '{tag}' from {n:?} to {target:?}"
                );
            }
        }
    }
    out
}

/// Materializes `members` in z-order, solves their placement relations (if
/// any), and applies the resulting offsets to each movable element.
fn assemble_members(
    graph: &AttributedGraph,
    ctx: &EvalContext,
    config: &RenderConfig,
    rng: &mut StdRng,
    ancestors: &mut Vec<NodeId>,
    members: &[NodeId],
) -> Result<Vec<RenderedElement>, RenderError> {
    let order = order_by_z(graph, members)?;
    let mut rendered: Vec<RenderedElement> = order
        .into_iter()
        .map(|n| element::materialize(graph, ctx, config, rng, ancestors, n))
        .collect::<Result<_, _>>()?;

    let relations = collect_relations(graph, members);
    if !relations.is_empty() {
        let bboxes: HashMap<NodeId, crate::geometry::BoundingBox> =
            rendered.iter().map(|e| (e.node, e.bbox)).collect();
        let seed = rng.gen_seed();
        let solver = Solver::new(&bboxes, relations, config, StdRng::seed_from_u64(seed));
        let offsets = solver.solve();
        for element in rendered.iter_mut() {
            if let Some(&(dx, dy)) = offsets.get(&element.node) {
                let dx = round6(dx);
                let dy = round6(dy);
                element.bbox.translate(dx, dy);
                element.offset = (element.offset.0 + dx, element.offset.1 + dy);
            }
        }
    }
    Ok(rendered)
}

/// Generic helper trait so `assemble_members` can derive a per-group child
/// seed from the shared RNG without exposing `rand`'s internals elsewhere.
trait SeedSource {
    fn gen_seed(&mut self) -> u64;
}

impl SeedSource for StdRng {
    fn gen_seed(&mut self) -> u64 {
        use rand::RngCore;
        self.next_u64()
    }
}

/// Materializes a group node: recurses into its untagged children, then
/// unions their (offset-applied) boxes into the group's own box.
///
/// `ancestors` holds the chain of group nodes on the current recursion path;
/// a repeat of `n` means the untagged inclusion subgraph has a cycle, which
/// spec §3/§7 classify as a fatal `MalformedGraph` rather than something to
/// recurse through forever.
pub fn assemble_group(
    graph: &AttributedGraph,
    ctx: &EvalContext,
    config: &RenderConfig,
    rng: &mut StdRng,
    ancestors: &mut Vec<NodeId>,
    n: NodeId,
) -> Result<RenderedElement, RenderError> {
    if ancestors.contains(&n) {
        return Err(RenderError::malformed(format!("group inclusion cycle at node {n:?}")));
    }
    ancestors.push(n);
    let children: Vec<NodeId> = graph.untagged_successors(n, SuccessorMode::Normal);
    let rendered_children = assemble_members(graph, ctx, config, rng, ancestors, &children);
    ancestors.pop();
    let rendered_children = rendered_children?;

    let mut bbox = crate::geometry::BoundingBox::empty();
    for child in &rendered_children {
        bbox.union(&child.bbox);
    }

    let attrs = ctx.extract_all_attributes(n, &[])?;
    let scalars: HashMap<String, String> = attrs
        .into_iter()
        .filter_map(|(k, v)| match v {
            crate::eval::AttrValue::Scalar(s) => Some((k, s)),
            crate::eval::AttrValue::List(_) => None,
        })
        .collect();
    let (kept, stripped) = crate::validator::strip_invalid_attributes(ElementKind::Group, scalars);
    for attr in stripped {
        log::warn!(target: "svgrammar_render::scene", "stripped unrecognized attribute '{attr}' from group {n:?}");
    }

    Ok(RenderedElement { node: n, kind: ElementKind::Group, attrs: kept, bbox, children: rendered_children, offset: (0.0, 0.0) })
}

/// The emitted document's `viewBox`, derived from the `svg`-tagged node's
/// `x`, `y`, `width`, `height` attributes (spec §6); any attribute missing
/// or unparseable falls back to its share of the `0, 0, 200, 200` default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, width: 200.0, height: 200.0 }
    }
}

fn view_box(graph: &AttributedGraph, ctx: &EvalContext, svg_node: Option<NodeId>) -> Result<ViewBox, RenderError> {
    let default = ViewBox::default();
    let Some(n) = svg_node else { return Ok(default) };
    let attrs = ctx.extract_all_attributes(n, &[])?;
    let num = |key: &str, fallback: f64| -> f64 {
        match attrs.get(key) {
            Some(crate::eval::AttrValue::Scalar(s)) => s.trim().parse::<f64>().unwrap_or(fallback),
            _ => fallback,
        }
    };
    Ok(ViewBox {
        x: num("x", default.x),
        y: num("y", default.y),
        width: num("width", default.width),
        height: num("height", default.height),
    })
}

/// A fully assembled drawing: the root group plus the document-level
/// `viewBox` derived from the `svg` node.
pub struct Scene {
    pub root: RenderedElement,
    pub view_box: ViewBox,
}

/// Entry point: finds the top-level elements and assembles them as the
/// implicit root group.
pub fn render_scene(graph: &AttributedGraph, config: &RenderConfig) -> Result<Scene, RenderError> {
    let ctx = EvalContext::new(graph);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let top_level = find_top_level(graph);
    let mut ancestors = Vec::new();
    let rendered = assemble_members(graph, &ctx, config, &mut rng, &mut ancestors, &top_level)?;

    let mut bbox = crate::geometry::BoundingBox::empty();
    for child in &rendered {
        bbox.union(&child.bbox);
    }

    let svg_node = graph.find_by_tag("svg");
    let view_box = view_box(graph, &ctx, svg_node)?;

    let root = RenderedElement {
        node: svg_node.unwrap_or_else(|| top_level.first().copied().unwrap_or_else(|| graph.inner.node_indices().next().expect("non-empty graph"))),
        kind: ElementKind::Group,
        attrs: HashMap::new(),
        bbox,
        children: rendered,
        offset: (0.0, 0.0),
    };

    Ok(Scene { root, view_box })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RawGraph;

    fn graph_with_two_rects_and_relation() -> AttributedGraph {
        RawGraph::from_json(
            r#"{"nodes":[
                {"id":"svg","tag":"svg"},
                {"id":"a","tag":"rect"},{"id":"ax","tag":"0"},{"id":"ay","tag":"0"},{"id":"aw","tag":"2"},{"id":"ah","tag":"2"},
                {"id":"b","tag":"rect"},{"id":"bx","tag":"10"},{"id":"by","tag":"10"},{"id":"bw","tag":"2"},{"id":"bh","tag":"2"}
            ],"edges":[
                {"from":"svg","to":"a"},{"from":"svg","to":"b"},
                {"from":"a","to":"ax","tag":"x"},{"from":"a","to":"ay","tag":"y"},{"from":"a","to":"aw","tag":"width"},{"from":"a","to":"ah","tag":"height"},
                {"from":"b","to":"bx","tag":"x"},{"from":"b","to":"by","tag":"y"},{"from":"b","to":"bw","tag":"width"},{"from":"b","to":"bh","tag":"height"},
                {"from":"a","to":"b","tag":"adjacent-right"}
            ]}"#,
        )
        .unwrap()
        .into_graph()
        .unwrap()
    }

    #[test]
    fn top_level_elements_are_svgs_direct_children() {
        let g = graph_with_two_rects_and_relation();
        let top = find_top_level(&g);
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn render_scene_moves_related_elements_together() {
        let g = graph_with_two_rects_and_relation();
        let config = RenderConfig::default();
        let scene = render_scene(&g, &config).unwrap();
        assert_eq!(scene.root.children.len(), 2);
    }

    #[test]
    fn group_with_no_relations_has_no_offsets() {
        let g = RawGraph::from_json(
            r#"{"nodes":[{"id":"svg","tag":"svg"},{"id":"a","tag":"rect"}],"edges":[{"from":"svg","to":"a"}]}"#,
        )
        .unwrap()
        .into_graph()
        .unwrap();
        let scene = render_scene(&g, &RenderConfig::default()).unwrap();
        assert_eq!(scene.root.children[0].offset, (0.0, 0.0));
    }

    #[test]
    fn view_box_defaults_when_svg_node_has_no_dimensions() {
        let g = RawGraph::from_json(
            r#"{"nodes":[{"id":"svg","tag":"svg"},{"id":"a","tag":"rect"}],"edges":[{"from":"svg","to":"a"}]}"#,
        )
        .unwrap()
        .into_graph()
        .unwrap();
        let scene = render_scene(&g, &RenderConfig::default()).unwrap();
        assert_eq!(scene.view_box, ViewBox::default());
    }

    #[test]
    fn view_box_reads_svg_node_dimensions() {
        let g = RawGraph::from_json(
            r#"{"nodes":[
                {"id":"svg","tag":"svg"},{"id":"sx","tag":"1"},{"id":"sy","tag":"2"},{"id":"sw","tag":"300"},{"id":"sh","tag":"150"},
                {"id":"a","tag":"rect"}
            ],"edges":[
                {"from":"svg","to":"a"},
                {"from":"svg","to":"sx","tag":"x"},{"from":"svg","to":"sy","tag":"y"},
                {"from":"svg","to":"sw","tag":"width"},{"from":"svg","to":"sh","tag":"height"}
            ]}"#,
        )
        .unwrap()
        .into_graph()
        .unwrap();
        let scene = render_scene(&g, &RenderConfig::default()).unwrap();
        assert_eq!(scene.view_box, ViewBox { x: 1.0, y: 2.0, width: 300.0, height: 150.0 });
    }

    #[test]
    fn group_inclusion_cycle_is_a_malformed_graph_error() {
        let g = RawGraph::from_json(
            r#"{"nodes":[
                {"id":"svg","tag":"svg"},{"id":"g1","tag":"g"},{"id":"g2","tag":"g"}
            ],"edges":[
                {"from":"svg","to":"g1"},{"from":"g1","to":"g2"},{"from":"g2","to":"g1"}
            ]}"#,
        )
        .unwrap()
        .into_graph()
        .unwrap();
        let err = render_scene(&g, &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, RenderError::MalformedGraph { .. }));
    }
}
