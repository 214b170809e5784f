//! Fatal error taxonomy for the rendering pipeline (see spec §7).
//!
//! Coercion failures inside operators and geometry attribute consumption are
//! *not* represented here: per the recovery policy they silently default to
//! zero instead of propagating. `WarnAndContinue` cases (an unparseable
//! transform primitive, a cross-group placement relation, truncated path
//! data) are likewise absent: each is logged at its call site and the
//! caller keeps going. Only the hard-stop cases below reach a caller.

use thiserror::Error;

use crate::graph::NodeId;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("circular evaluation at node {node:?}")]
    CircularEvaluation { node: NodeId },

    #[error("duplicate attribute '{tag}' on node {node:?}")]
    DuplicateAttribute { node: NodeId, tag: String },

    #[error("malformed graph: {reason}")]
    MalformedGraph { reason: String },

    #[error("unknown path command '{command}'")]
    UnknownPathCommand { command: String },
}

impl RenderError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        RenderError::MalformedGraph { reason: reason.into() }
    }
}
