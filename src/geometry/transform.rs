//! Minimal parser for the SVG `transform` attribute's primitive list.
//!
//! Only `translate`/`scale` move a bounding box; `rotate`/`skewX`/`skewY` are
//! recognized (so they don't trip the "unparseable" warning) but left
//! unapplied, per the grammar's transform rules.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Translate(f64, f64),
    Scale(f64, f64),
    /// Recognized primitive name with no bounding-box effect (rotate, skewX,
    /// skewY) or a primitive that failed to parse and was skipped.
    Ignored(&'static str),
}

/// Parses a sequence of `name(args)` calls separated by whitespace and/or
/// commas. Primitives that don't parse are logged and dropped rather than
/// aborting the whole attribute.
pub fn parse(s: &str) -> Vec<Primitive> {
    let mut out = Vec::new();
    let mut rest = s.trim();
    while !rest.is_empty() {
        let Some(open) = rest.find('(') else {
            log::warn!(target: "svgrammar_render::geometry::transform", "trailing garbage in transform attribute: {rest:?}");
            break;
        };
        let name = rest[..open].trim();
        let Some(close) = rest[open..].find(')') else {
            log::warn!(target: "svgrammar_render::geometry::transform", "unterminated transform primitive: {rest:?}");
            break;
        };
        let close = open + close;
        let args_str = &rest[open + 1..close];
        let args: Vec<f64> = args_str
            .split([',', ' '])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<f64>().ok())
            .collect();

        match name {
            "translate" => out.push(Primitive::Translate(
                args.first().copied().unwrap_or(0.0),
                args.get(1).copied().unwrap_or(0.0),
            )),
            "scale" => {
                let sx = args.first().copied().unwrap_or(1.0);
                let sy = args.get(1).copied().unwrap_or(sx);
                out.push(Primitive::Scale(sx, sy));
            }
            "rotate" => out.push(Primitive::Ignored("rotate")),
            "skewX" => out.push(Primitive::Ignored("skewX")),
            "skewY" => out.push(Primitive::Ignored("skewY")),
            other => {
                log::warn!(target: "svgrammar_render::geometry::transform", "unrecognized transform primitive '{other}', skipping");
            }
        }
        rest = rest[close + 1..].trim_start_matches([',', ' ']);
    }
    out
}
