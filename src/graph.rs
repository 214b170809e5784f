//! Attributed directed multigraph: the crate's input data model (spec §3).
//!
//! Nodes carry an optional string tag; edges carry an optional string tag
//! denoting an attribute name, an operator operand, a structural (`next`)
//! link, or a placement relation. Node identity is the opaque
//! [`petgraph::graph::NodeIndex`] assigned on ingestion; callers that need a
//! stable external handle go through [`AttributedGraph::external_id`].

use std::collections::HashMap;

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Deserialize;

use crate::error::RenderError;

pub type NodeId = petgraph::graph::NodeIndex;

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub external_id: String,
    pub tag: Option<String>,
}

/// Edge weight is just the relation/attribute tag; `None` marks an untagged
/// structural edge (operand of an operator, or group membership).
pub type EdgeTag = Option<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessorMode {
    /// Every outgoing edge is a candidate successor.
    Normal,
    /// `next`-tagged edges are hidden; used while walking a list spine so
    /// the spine links themselves don't reappear as ordinary children.
    List,
}

#[derive(Debug, Clone, Default)]
pub struct AttributedGraph {
    pub inner: DiGraph<GraphNode, EdgeTag>,
}

impl AttributedGraph {
    pub fn new() -> Self {
        Self { inner: DiGraph::new() }
    }

    pub fn tag(&self, n: NodeId) -> Option<&str> {
        self.inner[n].tag.as_deref()
    }

    pub fn external_id(&self, n: NodeId) -> &str {
        &self.inner[n].external_id
    }

    /// `(tag, target)` pairs for every outgoing edge of `n` visible in `mode`.
    pub fn children(&self, n: NodeId, mode: SuccessorMode) -> Vec<(Option<&str>, NodeId)> {
        self.inner
            .edges_directed(n, Direction::Outgoing)
            .filter(|e| mode != SuccessorMode::List || e.weight().as_deref() != Some("next"))
            .map(|e| (e.weight().as_deref(), e.target()))
            .collect()
    }

    /// Target nodes reachable from `n` under `mode`, tagged or not.
    pub fn successors(&self, n: NodeId, mode: SuccessorMode) -> Vec<NodeId> {
        self.children(n, mode).into_iter().map(|(_, t)| t).collect()
    }

    /// Untagged (operand) successors only.
    pub fn untagged_successors(&self, n: NodeId, mode: SuccessorMode) -> Vec<NodeId> {
        self.children(n, mode)
            .into_iter()
            .filter(|(tag, _)| tag.is_none())
            .map(|(_, t)| t)
            .collect()
    }

    /// Tagged children sorted by tag, ascending. Grounds the `##` operator's
    /// concatenation order.
    pub fn sorted_tagged_children(&self, n: NodeId, mode: SuccessorMode) -> Vec<(String, NodeId)> {
        let mut v: Vec<(String, NodeId)> = self
            .children(n, mode)
            .into_iter()
            .filter_map(|(tag, t)| tag.map(|s| (s.to_string(), t)))
            .collect();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }

    /// Tag -> target map for `n`'s tagged children. Errors on a duplicate tag,
    /// which the data model forbids within a single parent.
    pub fn tagged_children_map(&self, n: NodeId, mode: SuccessorMode) -> Result<HashMap<String, NodeId>, RenderError> {
        let mut out = HashMap::new();
        for (tag, target) in self.children(n, mode) {
            if let Some(tag) = tag {
                if out.insert(tag.to_string(), target).is_some() {
                    return Err(RenderError::DuplicateAttribute { node: n, tag: tag.to_string() });
                }
            }
        }
        Ok(out)
    }

    /// Relation edges `(tag, target)` for `n` whose tag is in `relation_tags`.
    pub fn relation_edges<'a>(&'a self, n: NodeId, relation_tags: &'a [&'a str]) -> Vec<(&'a str, NodeId)> {
        self.inner
            .edges_directed(n, Direction::Outgoing)
            .filter_map(|e| {
                let tag = e.weight().as_deref()?;
                relation_tags.iter().find(|t| **t == tag).map(|t| (*t, e.target()))
            })
            .collect()
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.inner.node_indices().find(|&n| self.tag(n) == Some(tag))
    }

    pub fn has_group_ancestor(&self, n: NodeId) -> bool {
        let mut stack: Vec<NodeId> = self
            .inner
            .edges_directed(n, Direction::Incoming)
            .filter(|e| e.weight().is_none())
            .map(|e| e.source())
            .collect();
        let mut seen = std::collections::HashSet::new();
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            if self.tag(cur) == Some("g") {
                return true;
            }
            stack.extend(
                self.inner
                    .edges_directed(cur, Direction::Incoming)
                    .filter(|e| e.weight().is_none())
                    .map(|e| e.source()),
            );
        }
        false
    }
}

/// On-disk wire representation (spec §3 + ambient §10.5): a flat node/edge
/// list keyed by caller-chosen string ids, deserialized then remapped onto
/// `NodeIndex`.
#[derive(Debug, Deserialize)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
pub struct RawNode {
    pub id: String,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawEdge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl RawGraph {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn into_graph(self) -> Result<AttributedGraph, RenderError> {
        let mut g = AttributedGraph::new();
        let mut ids = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            let idx = g.inner.add_node(GraphNode { external_id: node.id.clone(), tag: node.tag });
            if ids.insert(node.id.clone(), idx).is_some() {
                return Err(RenderError::malformed(format!("duplicate node id '{}'", node.id)));
            }
        }
        for edge in self.edges {
            let from = *ids
                .get(&edge.from)
                .ok_or_else(|| RenderError::malformed(format!("edge references unknown node '{}'", edge.from)))?;
            let to = *ids
                .get(&edge.to)
                .ok_or_else(|| RenderError::malformed(format!("edge references unknown node '{}'", edge.to)))?;
            g.inner.add_edge(from, to, edge.tag);
        }
        Ok(g)
    }
}
