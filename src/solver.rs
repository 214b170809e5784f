//! Simulated-annealing placement solver (spec §4.5).
//!
//! Replaces the teacher's SAT-based platform solver: the shape (a
//! `Solution`-like accumulator, a seeded, deterministic search) is kept, but
//! the search itself minimises a continuous penalty instead of satisfying
//! boolean clauses.

use std::collections::{HashMap, HashSet};

use enum_map::EnumMap;
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::RenderConfig;
use crate::geometry::BoundingBox;
use crate::graph::NodeId;
use crate::utils::loop_with_feedback;

#[derive(Debug, Clone, Copy, PartialEq, Eq, enum_map::Enum)]
pub enum Relation {
    AdjacentLeft,
    AdjacentRight,
    AdjacentAbove,
    AdjacentBelow,
    PlaceLeft,
    PlaceRight,
    PlaceAbove,
    PlaceBelow,
    Disjoint,
}

impl Relation {
    pub fn from_tag(tag: &str) -> Option<Self> {
        use Relation::*;
        Some(match tag {
            "adjacent-left" => AdjacentLeft,
            "adjacent-right" => AdjacentRight,
            "adjacent-above" => AdjacentAbove,
            "adjacent-below" => AdjacentBelow,
            "place-left" => PlaceLeft,
            "place-right" => PlaceRight,
            "place-above" => PlaceAbove,
            "place-below" => PlaceBelow,
            "disjoint" => Disjoint,
            _ => return None,
        })
    }
}

/// `(midpoint-distance weight, overlap weight)` per relation kind (spec
/// §4.5's weight table), indexed directly instead of matched per-call.
/// `primary`/`secondary` come from [`RenderConfig`] rather than being fixed,
/// so a config file can retune how strongly each relation pulls.
fn relation_weights(primary: f64, secondary: f64) -> EnumMap<Relation, (f64, f64)> {
    EnumMap::from_fn(|r| match r {
        Relation::AdjacentLeft | Relation::AdjacentRight | Relation::AdjacentAbove | Relation::AdjacentBelow => {
            (primary, secondary)
        }
        Relation::PlaceLeft | Relation::PlaceRight | Relation::PlaceAbove | Relation::PlaceBelow => {
            (secondary, primary)
        }
        Relation::Disjoint => (0.0, primary),
    })
}

type Offsets = HashMap<NodeId, (f64, f64)>;

fn overlap_penalty(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> f64 {
    let (ax1, ay1, ax2, ay2) = a;
    let (bx1, by1, bx2, by2) = b;
    let sep = (ax2 - bx1).min(bx2 - ax1).min(ay2 - by1).min(by2 - ay1).max(0.0);
    sep * sep
}

fn midpoint_distance_sq(relation: Relation, a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> f64 {
    let (ax1, ay1, ax2, ay2) = a;
    let (bx1, by1, bx2, by2) = b;
    let (ax, ay, bx, by) = match relation {
        // adjacent-left/place-left: right midpoint of a vs left midpoint of b.
        Relation::AdjacentLeft | Relation::PlaceLeft => (ax2, (ay1 + ay2) / 2.0, bx1, (by1 + by2) / 2.0),
        // adjacent-right/place-right: left midpoint of a vs right midpoint of b.
        Relation::AdjacentRight | Relation::PlaceRight => (ax1, (ay1 + ay2) / 2.0, bx2, (by1 + by2) / 2.0),
        // adjacent-above/place-above: lower midpoint of a vs upper midpoint of b.
        Relation::AdjacentAbove | Relation::PlaceAbove => ((ax1 + ax2) / 2.0, ay2, (bx1 + bx2) / 2.0, by1),
        // adjacent-below/place-below: upper midpoint of a vs lower midpoint of b.
        Relation::AdjacentBelow | Relation::PlaceBelow => ((ax1 + ax2) / 2.0, ay1, (bx1 + bx2) / 2.0, by2),
        Relation::Disjoint => return 0.0,
    };
    (ax - bx).powi(2) + (ay - by).powi(2)
}

pub struct Solver<'a> {
    bboxes: &'a HashMap<NodeId, BoundingBox>,
    relations: Vec<(NodeId, Relation, NodeId)>,
    movable: Vec<NodeId>,
    config: &'a RenderConfig,
    rng: StdRng,
    weights: EnumMap<Relation, (f64, f64)>,
    current: Offsets,
    current_penalty: f64,
    best: Offsets,
    best_penalty: f64,
    temperature: f64,
}

impl<'a> Solver<'a> {
    pub fn new(
        bboxes: &'a HashMap<NodeId, BoundingBox>,
        relations: Vec<(NodeId, Relation, NodeId)>,
        config: &'a RenderConfig,
        rng: StdRng,
    ) -> Self {
        let movable: Vec<NodeId> = {
            let mut set = HashSet::new();
            let mut order = Vec::new();
            for &(a, _, _) in &relations {
                if set.insert(a) {
                    order.push(a);
                }
            }
            order
        };
        let zero: Offsets = movable.iter().map(|&n| (n, (0.0, 0.0))).collect();
        let mut solver = Self {
            bboxes,
            relations,
            movable,
            config,
            rng,
            weights: relation_weights(config.primary_scale, config.secondary_scale),
            current_penalty: 0.0,
            current: zero.clone(),
            best: zero,
            best_penalty: 0.0,
            temperature: 0.0,
        };
        solver.current_penalty = solver.penalty(&solver.current);
        solver.best_penalty = solver.current_penalty;
        solver
    }

    fn box_at(&self, n: NodeId, offsets: &Offsets) -> (f64, f64, f64, f64) {
        let mut bbox = self.bboxes.get(&n).copied().unwrap_or_else(BoundingBox::empty);
        if let Some(&(dx, dy)) = offsets.get(&n) {
            bbox.translate(dx, dy);
        }
        bbox.corners().unwrap_or((0.0, 0.0, 0.0, 0.0))
    }

    fn penalty(&self, offsets: &Offsets) -> f64 {
        self.relations
            .iter()
            .map(|&(a, relation, b)| {
                let bba = self.box_at(a, offsets);
                let bbb = self.box_at(b, offsets);
                let (mid_weight, overlap_weight) = self.weights[relation];
                mid_weight * midpoint_distance_sq(relation, bba, bbb) + overlap_weight * overlap_penalty(bba, bbb)
            })
            .sum()
    }

    fn random_change(&mut self, base: &Offsets) -> Offsets {
        let mut next = base.clone();
        if self.movable.is_empty() {
            return next;
        }
        let scale = (self.temperature / 200.0).sqrt().min(1.0);
        let idx_a = self.rng.gen_range(0..self.movable.len());
        let chosen = if self.movable.len() > 1 && self.rng.gen_bool(0.3) {
            let mut idx_b = self.rng.gen_range(0..self.movable.len());
            while idx_b == idx_a {
                idx_b = self.rng.gen_range(0..self.movable.len());
            }
            vec![self.movable[idx_a], self.movable[idx_b]]
        } else {
            vec![self.movable[idx_a]]
        };
        for n in chosen {
            let bbox = self.bboxes.get(&n).copied().unwrap_or_else(BoundingBox::empty);
            let w = bbox.width() * scale;
            let h = bbox.height() * scale;
            let dx = if w > 0.0 { self.rng.gen_range(-w..w) } else { 0.0 };
            let dy = if h > 0.0 { self.rng.gen_range(-h..h) } else { 0.0 };
            let entry = next.entry(n).or_insert((0.0, 0.0));
            entry.0 += dx;
            entry.1 += dy;
        }
        next
    }

    fn calibrate_initial_temperature(&mut self) {
        let mut deltas = Vec::new();
        let mut base = self.current.clone();
        let mut base_penalty = self.current_penalty;
        self.temperature = 200.0; // full-scale jitter while calibrating; sqrt(T/200) caps at 1
        for _ in 0..100 {
            let candidate = self.random_change(&base);
            let candidate_penalty = self.penalty(&candidate);
            let delta = candidate_penalty - base_penalty;
            if delta > 0.0 {
                deltas.push(delta);
            }
            base = candidate;
            base_penalty = candidate_penalty;
        }
        self.temperature = if deltas.is_empty() {
            self.config.fallback_initial_temperature
        } else {
            let mean: f64 = deltas.iter().sum::<f64>() / deltas.len() as f64;
            -mean / 0.8_f64.ln()
        };
    }

    fn annealing_iter(&mut self) -> bool {
        let candidate = self.random_change(&self.current);
        let candidate_penalty = self.penalty(&candidate);
        let delta = candidate_penalty - self.current_penalty;
        let accept = if delta <= 0.0 {
            true
        } else {
            self.rng.gen_range(0.0..1.0) < (-delta / self.temperature).exp()
        };
        if accept {
            self.current = candidate;
            self.current_penalty = candidate_penalty;
            if self.current_penalty < self.best_penalty {
                self.best = self.current.clone();
                self.best_penalty = self.current_penalty;
            }
        }
        accept
    }

    /// Runs up to `max_iterations` annealing proposals at the current
    /// temperature, stopping early once `max_accepts` moves are accepted.
    /// Reuses the teacher's generic feedback-loop utility for the
    /// iterate/accept/stop control flow.
    fn run_temperature_step(&mut self, max_iterations: usize, max_accepts: usize) {
        loop_with_feedback(
            0usize,
            |iteration: usize, accepts: usize| -> std::ops::ControlFlow<usize, usize> {
                if accepts >= max_accepts || iteration + 1 >= max_iterations {
                    std::ops::ControlFlow::Break(accepts)
                } else {
                    std::ops::ControlFlow::Continue(accepts)
                }
            },
            |_iteration: usize, accepts: usize| -> std::ops::ControlFlow<usize, usize> {
                let accepted = self.annealing_iter();
                std::ops::ControlFlow::Continue(if accepted { accepts + 1 } else { accepts })
            },
        );
    }

    /// Runs the full calibrate + anneal cycle and returns the best offset
    /// map found, which may differ from the final (possibly worse) state.
    pub fn solve(mut self) -> Offsets {
        if self.relations.is_empty() {
            return self.best;
        }
        self.calibrate_initial_temperature();
        let max_iterations = (20 * self.relations.len()).max(1);
        while self.temperature > self.config.min_temperature {
            self.run_temperature_step(max_iterations, self.config.max_accepts_per_temperature);
            log::debug!(
                target: "svgrammar_render::solver",
                "temperature={:.4} current={:.4} best={:.4}",
                self.temperature, self.current_penalty, self.best_penalty
            );
            self.temperature *= self.config.cooling_rate;
        }
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn config() -> RenderConfig {
        RenderConfig::default()
    }

    #[test]
    fn no_relations_yields_empty_offsets() {
        let bboxes = HashMap::new();
        let solver = Solver::new(&bboxes, vec![], &config(), StdRng::seed_from_u64(1));
        assert!(solver.solve().is_empty());
    }

    #[test]
    fn best_penalty_never_exceeds_zero_offset_penalty() {
        use petgraph::graph::DiGraph;
        let mut g: DiGraph<(), ()> = DiGraph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let mut bboxes = HashMap::new();
        bboxes.insert(a, BoundingBox::rectangle(0.0, 0.0, 1.0, 1.0));
        bboxes.insert(b, BoundingBox::rectangle(5.0, 5.0, 1.0, 1.0));
        let relations = vec![(a, Relation::AdjacentRight, b)];
        let zero_penalty = {
            let solver = Solver::new(&bboxes, relations.clone(), &config(), StdRng::seed_from_u64(7));
            solver.current_penalty
        };
        let solver = Solver::new(&bboxes, relations, &config(), StdRng::seed_from_u64(7));
        let best = solver.solve();
        let mut bbox_a = bboxes[&a];
        if let Some(&(dx, dy)) = best.get(&a) {
            bbox_a.translate(dx, dy);
        }
        let mut bboxes_after = bboxes.clone();
        bboxes_after.insert(a, bbox_a);
        let after_solver =
            Solver::new(&bboxes_after, vec![(a, Relation::AdjacentRight, b)], &config(), StdRng::seed_from_u64(7));
        assert!(after_solver.current_penalty <= zero_penalty + 1e-6);
    }

    #[test]
    fn adjacent_right_converges_with_a_to_the_right_of_b() {
        // Spec §8 scenario 6: two unit squares, (A, adjacent-right, B), B
        // fixed at the origin; A's final centre-x should land at B's right
        // edge plus half A's width, not pulled to B's left edge instead.
        use petgraph::graph::DiGraph;
        let mut g: DiGraph<(), ()> = DiGraph::new();
        let a = g.add_node(());
        let b = g.add_node(());
        let mut bboxes = HashMap::new();
        bboxes.insert(a, BoundingBox::rectangle(-5.0, -5.0, 1.0, 1.0));
        bboxes.insert(b, BoundingBox::rectangle(0.0, 0.0, 1.0, 1.0));
        let solver = Solver::new(&bboxes, vec![(a, Relation::AdjacentRight, b)], &config(), StdRng::seed_from_u64(3));
        let best = solver.solve();
        let (dx, _) = best.get(&a).copied().unwrap_or((0.0, 0.0));
        let mut bbox_a = bboxes[&a];
        bbox_a.translate(dx, 0.0);
        let (ax1, _, ax2, _) = bbox_a.corners().unwrap();
        let centre_x = (ax1 + ax2) / 2.0;
        // B's right edge is at x=1; A's centre should land near 1 + 0.5 = 1.5,
        // not near B's left edge at x=0 - 0.5 = -0.5.
        assert!((centre_x - 1.5).abs() < 1.0, "expected A's centre near 1.5, got {centre_x}");
    }

    #[test]
    fn relation_tags_round_trip() {
        for tag in [
            "adjacent-left",
            "adjacent-right",
            "adjacent-above",
            "adjacent-below",
            "place-left",
            "place-right",
            "place-above",
            "place-below",
            "disjoint",
        ] {
            assert!(Relation::from_tag(tag).is_some());
        }
        assert!(Relation::from_tag("below").is_none());
    }
}
