//! Output emission (ambient §10.6): turns a [`RenderedElement`] tree into an
//! `svg::Document` and saves it to disk. Grounded on the original renderer's
//! `svgwrite`-based `graph_to_svg`, using the `svg` crate as its Rust analog.

use svg::node::element::{Circle, Group, Path as SvgPath, Rectangle};
use svg::node::Node;
use svg::Document;

use crate::element::{ElementKind, RenderedElement};
use crate::scene::ViewBox;

/// Physical document size (spec §6): the drawing always renders 8-by-8
/// inches regardless of its logical `viewBox`.
const DOCUMENT_SIZE_INCHES: &str = "8in";

fn apply_attrs<T: Node>(mut node: T, element: &RenderedElement) -> T {
    for (k, v) in &element.attrs {
        node.assign(k.as_str(), v.as_str());
    }
    node
}

fn wrap_offset(node: impl Into<Box<dyn Node>>, offset: (f64, f64)) -> Box<dyn Node> {
    if offset == (0.0, 0.0) {
        node.into()
    } else {
        let g = Group::new().set("transform", format!("translate({},{})", offset.0, offset.1)).add(node);
        Box::new(g)
    }
}

/// `element.rs::finish` strips `x/y/width/height`/`cx/cy/r` out of `attrs`
/// once they've been folded into `bbox`, so the output element's own
/// geometry has to be read back out of the bounding box rather than the
/// attribute map (contrast `materialize_path`, which re-inserts `d`).
fn rect_node(element: &RenderedElement) -> Rectangle {
    let mut node = apply_attrs(Rectangle::new(), element);
    if let Some((x1, y1, x2, y2)) = element.bbox.corners() {
        node = node.set("x", x1).set("y", y1).set("width", x2 - x1).set("height", y2 - y1);
    }
    node
}

fn circle_node(element: &RenderedElement) -> Circle {
    let mut node = apply_attrs(Circle::new(), element);
    if let Some((x1, y1, x2, y2)) = element.bbox.corners() {
        node = node.set("cx", (x1 + x2) / 2.0).set("cy", (y1 + y2) / 2.0).set("r", (x2 - x1) / 2.0);
    }
    node
}

fn to_node(element: &RenderedElement) -> Box<dyn Node> {
    let built: Box<dyn Node> = match element.kind {
        ElementKind::Rect => Box::new(rect_node(element)),
        ElementKind::Circle => Box::new(circle_node(element)),
        ElementKind::Path => Box::new(apply_attrs(SvgPath::new(), element)),
        ElementKind::Group => {
            let mut group = apply_attrs(Group::new(), element);
            for child in &element.children {
                group = group.add(to_node(child));
            }
            Box::new(group)
        }
    };
    wrap_offset(built, element.offset)
}

pub fn to_document(root: &RenderedElement, view_box: ViewBox) -> Document {
    let document = Document::new()
        .set("viewBox", format!("{} {} {} {}", view_box.x, view_box.y, view_box.width, view_box.height))
        .set("width", DOCUMENT_SIZE_INCHES)
        .set("height", DOCUMENT_SIZE_INCHES);
    document.add(to_node(root))
}

pub fn save(path: &std::path::Path, root: &RenderedElement, view_box: ViewBox) -> anyhow::Result<()> {
    svg::save(path, &to_document(root, view_box))?;
    Ok(())
}
