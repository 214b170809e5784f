//! SVG path-data simulation: walks every command in a `d` attribute and
//! returns the set of points needed to bound it (spec §4.2).
//!
//! Tokenisation is whitespace-only, matching the grammar in spec §6: commas
//! and implicit-repeat operands (a bare number following a command's full
//! operand count, standing in for a repeat of that command) are not
//! special-cased. A comma-joined token such as `"10,20"` simply fails to
//! parse as a command or a number and, where a command token is expected,
//! surfaces as a fatal `UnknownPathCommand`; where an operand is expected
//! instead, the same failure is treated as truncation (spec §7's
//! `WarnAndContinue`, matching the original's `except StopIteration: pass`):
//! logged and the walk stops with whatever points it already collected.
//! Curve and arc commands consume their control-point operands but only the
//! final endpoint widens the envelope, per the spec's deliberate
//! approximation.

use crate::error::RenderError;

const COMMANDS: &[&str] = &["M", "L", "m", "l", "H", "V", "h", "v", "Z", "z", "C", "c", "Q", "q", "A", "a"];

fn arity(cmd: &str) -> usize {
    match cmd {
        "M" | "L" | "m" | "l" => 2,
        "H" | "V" | "h" | "v" => 1,
        "Z" | "z" => 0,
        "C" | "c" => 6,
        "Q" | "q" => 4,
        "A" | "a" => 7,
        _ => unreachable!("arity only called on a recognized command"),
    }
}

/// Walks every command in `d`, returning the envelope of points visited.
pub fn simulate(d: &str) -> Result<Vec<(f64, f64)>, RenderError> {
    let tokens: Vec<&str> = d.split_whitespace().collect();
    let mut points = Vec::new();
    let mut cur = (0.0_f64, 0.0_f64);
    let mut start = (0.0_f64, 0.0_f64);
    let mut start_set = false;

    let mut i = 0;
    while i < tokens.len() {
        let cmd = tokens[i];
        i += 1;
        if !COMMANDS.contains(&cmd) {
            return Err(RenderError::UnknownPathCommand { command: cmd.to_string() });
        }

        if cmd == "Z" || cmd == "z" {
            cur = start;
            points.push(cur);
            continue;
        }

        let n = arity(cmd);
        let mut args = Vec::with_capacity(n);
        let mut truncated = false;
        for _ in 0..n {
            match tokens.get(i).and_then(|tok| tok.parse::<f64>().ok()) {
                Some(v) => {
                    args.push(v);
                    i += 1;
                }
                None => {
                    truncated = true;
                    break;
                }
            }
        }
        if truncated {
            log::warn!(
                target: "svgrammar_render::geometry::path",
                "truncated path data after command '{cmd}', stopping with {} point(s) already walked",
                points.len()
            );
            break;
        }

        let relative = cmd.chars().next().is_some_and(|c| c.is_ascii_lowercase());
        match cmd.to_ascii_uppercase().as_str() {
            "M" | "L" => {
                cur = if relative { (cur.0 + args[0], cur.1 + args[1]) } else { (args[0], args[1]) };
                if cmd.eq_ignore_ascii_case("m") && !start_set {
                    start = cur;
                    start_set = true;
                }
                points.push(cur);
            }
            "H" => {
                cur.0 = if relative { cur.0 + args[0] } else { args[0] };
                points.push(cur);
            }
            "V" => {
                cur.1 = if relative { cur.1 + args[0] } else { args[0] };
                points.push(cur);
            }
            "C" => {
                cur = if relative { (cur.0 + args[4], cur.1 + args[5]) } else { (args[4], args[5]) };
                points.push(cur);
            }
            "Q" => {
                cur = if relative { (cur.0 + args[2], cur.1 + args[3]) } else { (args[2], args[3]) };
                points.push(cur);
            }
            "A" => {
                cur = if relative { (cur.0 + args[5], cur.1 + args[6]) } else { (args[5], args[6]) };
                points.push(cur);
            }
            _ => unreachable!(),
        }
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulates_multiple_commands_in_sequence() {
        let points = simulate("M 0 0 L 10 0 L 10 10 Z").unwrap();
        assert_eq!(points, vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)]);
    }

    #[test]
    fn relative_commands_accumulate() {
        let points = simulate("m 1 1 l 1 0 l 0 1").unwrap();
        assert_eq!(points, vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0)]);
    }

    #[test]
    fn bounding_scenario_from_spec() {
        let points = simulate("M 10 10 L 20 5 L 15 30 Z").unwrap();
        let bbox = super::super::BoundingBox::from_points(&points);
        assert_eq!(bbox.corners(), Some((10.0, 5.0, 20.0, 30.0)));
    }

    #[test]
    fn unknown_command_is_a_hard_error() {
        assert!(simulate("M 0 0 Q 10 10 20 20").is_ok());
        assert!(matches!(
            simulate("M 0 0 X 10 10"),
            Err(RenderError::UnknownPathCommand { command }) if command == "X"
        ));
    }

    #[test]
    fn smooth_curve_commands_are_not_recognized() {
        // S/T are not in the closed command set (spec §4.2's command table).
        assert!(matches!(simulate("M 0 0 S 1 1 2 2"), Err(RenderError::UnknownPathCommand { .. })));
        assert!(matches!(simulate("M 0 0 T 1 1"), Err(RenderError::UnknownPathCommand { .. })));
    }

    #[test]
    fn truncated_argument_list_warns_and_returns_points_walked_so_far() {
        // Spec §7 classifies truncated path data as WarnAndContinue, not a
        // hard error: the walk stops but everything already simulated
        // (the "M 0 0" here) is still returned.
        let points = simulate("M 0 0 L 10").unwrap();
        assert_eq!(points, vec![(0.0, 0.0)]);
    }

    #[test]
    fn comma_joined_coordinates_are_not_special_cased() {
        // Whitespace-only tokenisation means "0,0" is one token, not two;
        // it fails to parse as a number where an operand is expected, which
        // is truncation (WarnAndContinue), not a hard error.
        let points = simulate("M 0,0 L 10,0").unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn implicit_repeat_operand_is_not_special_cased() {
        // A bare number standing in for a repeated command, rather than a
        // fresh command letter, is not recognized as one.
        assert!(matches!(
            simulate("M 0 0 L 10 10 20 20"),
            Err(RenderError::UnknownPathCommand { command }) if command == "20"
        ));
    }

    #[test]
    fn cubic_bezier_yields_only_the_endpoint() {
        let points = simulate("M 0 0 C 5 20 15 20 20 0").unwrap();
        assert_eq!(points, vec![(0.0, 0.0), (20.0, 0.0)]);
    }

    #[test]
    fn quadratic_bezier_yields_only_the_endpoint() {
        let points = simulate("M 0 0 Q 5 20 10 0").unwrap();
        assert_eq!(points, vec![(0.0, 0.0), (10.0, 0.0)]);
    }

    #[test]
    fn arc_yields_only_the_endpoint() {
        let points = simulate("M 0 0 A 5 5 0 0 1 10 0").unwrap();
        assert_eq!(points, vec![(0.0, 0.0), (10.0, 0.0)]);
    }
}
