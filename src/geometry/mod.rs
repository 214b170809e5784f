//! Bounding-box geometry, affine transforms, and path simulation (spec §4.1,
//! §4.2), consolidated into one definition instead of the original
//! renderer's duplicated bounding-box drafts.

pub mod bbox;
pub mod path;
pub mod transform;

pub use bbox::BoundingBox;
