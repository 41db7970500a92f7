//! Force-directed layout engine.
//!
//! Each tick accumulates four forces into node velocities and then integrates
//! positions once:
//!
//! 1. link springs pull connected nodes toward `link_distance`
//! 2. many-body charge pushes every pair apart
//! 3. centering translates the whole graph so its centroid sits on `center`
//! 4. collision separates nodes closer than twice `collision_radius`
//!
//! Link and charge forces are scaled by a cooling factor (`alpha`) that decays
//! geometrically toward `alpha_target`. Collision is not cooled, so overlaps
//! keep getting resolved after the layout has otherwise settled.
//!
//! The engine runs a fixed number of ticks. It does not seed positions and
//! draws no external randomness, so identical input yields identical output.

use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::NoteId;

use super::snapshot::{GraphEdge, GraphNode, GraphSnapshot, Point};

/// Floor on the distance used by the charge force.
///
/// Pairs closer than this repel as if they were exactly this far apart.
pub const CHARGE_DISTANCE_MIN: f64 = 1.0;

/// Floor on distances used as divisors by the link and collision forces.
const DISTANCE_EPSILON: f64 = 1e-9;

/// Default canvas size used to derive the centering target.
pub const DEFAULT_CANVAS: (f64, f64) = (800.0, 600.0);

/// Tunables for the layout engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Rest length of link springs (default 100).
    pub link_distance: f64,
    /// Many-body strength; negative values repel (default -300).
    pub charge_strength: f64,
    /// Radius of each node glyph (default 30).
    pub collision_radius: f64,
    /// Fraction of an overlap corrected per pass, 0 to 1 (default 1).
    pub collision_strength: f64,
    /// Collision passes per tick (default 1).
    pub collision_iterations: usize,
    /// Point the centroid is pulled to (default: canvas centre).
    pub center: Point,
    /// Number of ticks `run` performs (default 300).
    pub ticks: usize,
    /// Per-tick decay rate of alpha (default `1 - 0.001^(1/300)`).
    pub alpha_decay: f64,
    /// Value alpha decays toward (default 0).
    pub alpha_target: f64,
    /// Fraction of velocity lost per tick (default 0.4).
    pub velocity_decay: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 100.0,
            charge_strength: -300.0,
            collision_radius: 30.0,
            collision_strength: 1.0,
            collision_iterations: 1,
            center: Point::new(DEFAULT_CANVAS.0 / 2.0, DEFAULT_CANVAS.1 / 2.0),
            ticks: 300,
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
        }
    }
}

impl LayoutConfig {
    /// Centers the layout on a canvas of the given size.
    pub fn for_canvas(mut self, width: f64, height: f64) -> Self {
        self.center = Point::new(width / 2.0, height / 2.0);
        self
    }
}

/// A link resolved to node indices.
#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    /// Spring stiffness, `1 / min(degree(source), degree(target))`.
    strength: f64,
    /// Share of the correction applied to the target.
    bias: f64,
}

/// Deterministic source of tiny perturbations for coincident nodes.
///
/// Linear congruential generator with the Numerical Recipes constants,
/// always starting from the same state.
#[derive(Debug, Clone)]
struct Jiggle {
    state: u64,
}

impl Jiggle {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 1 << 32;

    fn new() -> Self {
        Self { state: 1 }
    }

    fn next_unit(&mut self) -> f64 {
        self.state = (Self::A * self.state + Self::C) % Self::M;
        self.state as f64 / Self::M as f64
    }

    /// Returns a non-zero offset in `[-5e-7, 5e-7]`.
    fn next(&mut self) -> f64 {
        let offset = (self.next_unit() - 0.5) * 1e-6;
        if offset == 0.0 { 5e-7 } else { offset }
    }
}

/// A running force simulation over a snapshot's nodes.
///
/// # Examples
///
/// ```
/// use umbra::graph::{GraphNode, GraphSnapshot, LayoutConfig, Simulation};
/// use umbra::{Embedding, NoteCategory, NoteId};
///
/// let nodes = vec![
///     GraphNode::new(NoteId::new("a"), "a", NoteCategory::Text, Embedding::new(vec![1.0, 0.0]))
///         .at(395.0, 300.0),
///     GraphNode::new(NoteId::new("b"), "b", NoteCategory::Text, Embedding::new(vec![1.0, 0.1]))
///         .at(405.0, 300.0),
/// ];
/// let mut snapshot = GraphSnapshot::from_nodes(nodes, 0.75);
///
/// Simulation::new(&mut snapshot, &LayoutConfig::default()).run();
///
/// let distance = snapshot.nodes[0].position().distance_to(snapshot.nodes[1].position());
/// assert!(distance >= 60.0);
/// ```
pub struct Simulation<'a> {
    nodes: &'a mut [GraphNode],
    links: Vec<Link>,
    config: LayoutConfig,
    alpha: f64,
    jiggle: Jiggle,
    ticks_run: usize,
}

impl<'a> Simulation<'a> {
    /// Prepares a simulation over the snapshot's current positions.
    ///
    /// Edges referring to nodes missing from the snapshot are ignored.
    pub fn new(snapshot: &'a mut GraphSnapshot, config: &LayoutConfig) -> Self {
        let links = resolve_links(&snapshot.nodes, &snapshot.edges);
        Self {
            nodes: &mut snapshot.nodes,
            links,
            config: config.clone(),
            alpha: 1.0,
            jiggle: Jiggle::new(),
            ticks_run: 0,
        }
    }

    /// Current cooling factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of ticks performed so far.
    pub fn ticks_run(&self) -> usize {
        self.ticks_run
    }

    /// Runs the configured tick budget.
    pub fn run(&mut self) {
        self.run_with(|_| ControlFlow::Continue(()));
    }

    /// Runs the configured tick budget, consulting `on_tick` after each tick.
    ///
    /// Returning `ControlFlow::Break` stops the simulation early. Returns the
    /// number of ticks performed; an empty graph returns 0 without ticking.
    pub fn run_with<F>(&mut self, mut on_tick: F) -> usize
    where
        F: FnMut(usize) -> ControlFlow<()>,
    {
        if self.nodes.is_empty() {
            return 0;
        }
        let start = self.ticks_run;
        for _ in 0..self.config.ticks {
            self.tick();
            if on_tick(self.ticks_run).is_break() {
                break;
            }
        }
        self.ticks_run - start
    }

    /// Advances the simulation by one step.
    pub fn tick(&mut self) {
        self.alpha += (self.config.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        self.apply_links(alpha);
        self.apply_charge(alpha);
        self.apply_centering();
        self.apply_collisions();

        let retain = 1.0 - self.config.velocity_decay;
        for node in self.nodes.iter_mut() {
            node.vx *= retain;
            node.vy *= retain;
            node.x += node.vx;
            node.y += node.vy;
        }
        self.ticks_run += 1;
    }

    fn apply_links(&mut self, alpha: f64) {
        let rest = self.config.link_distance;
        for link in &self.links {
            let (s, t) = (link.source, link.target);
            let mut dx = self.nodes[t].x + self.nodes[t].vx - self.nodes[s].x - self.nodes[s].vx;
            let mut dy = self.nodes[t].y + self.nodes[t].vy - self.nodes[s].y - self.nodes[s].vy;
            if dx == 0.0 {
                dx = self.jiggle.next();
            }
            if dy == 0.0 {
                dy = self.jiggle.next();
            }

            let distance = dx.hypot(dy).max(DISTANCE_EPSILON);
            let k = (distance - rest) / distance * alpha * link.strength;
            dx *= k;
            dy *= k;

            self.nodes[t].vx -= dx * link.bias;
            self.nodes[t].vy -= dy * link.bias;
            self.nodes[s].vx += dx * (1.0 - link.bias);
            self.nodes[s].vy += dy * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self, alpha: f64) {
        let strength = self.config.charge_strength;
        if strength == 0.0 {
            return;
        }
        let min_d2 = CHARGE_DISTANCE_MIN * CHARGE_DISTANCE_MIN;

        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = self.nodes[j].x - self.nodes[i].x;
                let mut dy = self.nodes[j].y - self.nodes[i].y;
                let mut d2 = dx * dx + dy * dy;
                if dx == 0.0 {
                    dx = self.jiggle.next();
                    d2 += dx * dx;
                }
                if dy == 0.0 {
                    dy = self.jiggle.next();
                    d2 += dy * dy;
                }

                let w = strength * alpha / d2.max(min_d2);
                self.nodes[i].vx += dx * w;
                self.nodes[i].vy += dy * w;
                self.nodes[j].vx -= dx * w;
                self.nodes[j].vy -= dy * w;
            }
        }
    }

    fn apply_centering(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let n = self.nodes.len() as f64;
        let (sum_x, sum_y) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));

        let shift_x = sum_x / n - self.config.center.x;
        let shift_y = sum_y / n - self.config.center.y;
        for node in self.nodes.iter_mut() {
            node.x -= shift_x;
            node.y -= shift_y;
        }
    }

    fn apply_collisions(&mut self) {
        let radius = self.config.collision_radius;
        if radius <= 0.0 {
            return;
        }
        let strength = self.config.collision_strength;
        let min_distance = 2.0 * radius;
        let min_d2 = min_distance * min_distance;

        let n = self.nodes.len();
        for _ in 0..self.config.collision_iterations {
            for i in 0..n {
                // Compare predicted positions so this tick's other forces count.
                let xi = self.nodes[i].x + self.nodes[i].vx;
                let yi = self.nodes[i].y + self.nodes[i].vy;
                for j in (i + 1)..n {
                    let mut dx = xi - (self.nodes[j].x + self.nodes[j].vx);
                    let mut dy = yi - (self.nodes[j].y + self.nodes[j].vy);
                    let mut d2 = dx * dx + dy * dy;
                    if d2 >= min_d2 {
                        continue;
                    }
                    if dx == 0.0 {
                        dx = self.jiggle.next();
                        d2 += dx * dx;
                    }
                    if dy == 0.0 {
                        dy = self.jiggle.next();
                        d2 += dy * dy;
                    }

                    let distance = d2.sqrt().max(DISTANCE_EPSILON);
                    let k = (min_distance - distance) / distance * strength;
                    dx *= k;
                    dy *= k;

                    // Equal radii: both nodes take half of the correction.
                    self.nodes[i].vx += dx * 0.5;
                    self.nodes[i].vy += dy * 0.5;
                    self.nodes[j].vx -= dx * 0.5;
                    self.nodes[j].vy -= dy * 0.5;
                }
            }
        }
    }
}

/// Lays out a snapshot in place using the configured tick budget.
pub fn layout(snapshot: &mut GraphSnapshot, config: &LayoutConfig) {
    let node_count = snapshot.nodes.len();
    let edge_count = snapshot.edges.len();

    let mut simulation = Simulation::new(snapshot, config);
    simulation.run();

    tracing::debug!(
        nodes = node_count,
        edges = edge_count,
        ticks = simulation.ticks_run(),
        alpha = simulation.alpha(),
        "layout finished"
    );
}

fn resolve_links(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<Link> {
    let index: HashMap<&NoteId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (&node.id, i))
        .collect();

    let pairs: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|edge| {
            let source = *index.get(&edge.source)?;
            let target = *index.get(&edge.target)?;
            (source != target).then_some((source, target))
        })
        .collect();

    if pairs.len() != edges.len() {
        tracing::warn!(
            dropped = edges.len() - pairs.len(),
            "ignoring edges with unknown or identical endpoints"
        );
    }

    let mut degree = vec![0usize; nodes.len()];
    for &(source, target) in &pairs {
        degree[source] += 1;
        degree[target] += 1;
    }

    pairs
        .into_iter()
        .map(|(source, target)| {
            let (ds, dt) = (degree[source] as f64, degree[target] as f64);
            Link {
                source,
                target,
                strength: 1.0 / ds.min(dt),
                bias: ds / (ds + dt),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Embedding, NoteCategory};

    fn node(id: &str, x: f64, y: f64) -> GraphNode {
        GraphNode::new(
            NoteId::new(id),
            id,
            NoteCategory::Text,
            Embedding::new(vec![1.0]),
        )
        .at(x, y)
    }

    fn edge(source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            source: NoteId::new(source),
            target: NoteId::new(target),
            weight: 1.0,
        }
    }

    fn distance(a: &GraphNode, b: &GraphNode) -> f64 {
        a.position().distance_to(b.position())
    }

    fn assert_finite(snapshot: &GraphSnapshot) {
        for node in &snapshot.nodes {
            assert!(node.x.is_finite() && node.y.is_finite(), "{node:?}");
            assert!(node.vx.is_finite() && node.vy.is_finite(), "{node:?}");
        }
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = LayoutConfig::default();
        assert_eq!(config.link_distance, 100.0);
        assert_eq!(config.charge_strength, -300.0);
        assert_eq!(config.collision_radius, 30.0);
        assert_eq!(config.ticks, 300);
        assert_eq!(config.center, Point::new(400.0, 300.0));
        assert!((config.alpha_decay - 0.0227627790).abs() < 1e-9);
    }

    #[test]
    fn for_canvas_centers_on_canvas() {
        let config = LayoutConfig::default().for_canvas(1000.0, 500.0);
        assert_eq!(config.center, Point::new(500.0, 250.0));
    }

    #[test]
    fn empty_snapshot_returns_immediately() {
        let mut snapshot = GraphSnapshot::default();
        let mut simulation = Simulation::new(&mut snapshot, &LayoutConfig::default());
        let mut callbacks = 0;

        let ticks = simulation.run_with(|_| {
            callbacks += 1;
            ControlFlow::Continue(())
        });

        assert_eq!(ticks, 0);
        assert_eq!(callbacks, 0);
        assert_eq!(simulation.ticks_run(), 0);
        assert_eq!(simulation.alpha(), 1.0);
        assert!(snapshot.nodes.is_empty());
    }

    #[test]
    fn isolated_node_moves_to_center() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("solo", 0.0, 0.0)],
            edges: vec![],
        };

        layout(&mut snapshot, &LayoutConfig::default());

        assert_eq!(snapshot.nodes[0].position(), Point::new(400.0, 300.0));
    }

    #[test]
    fn coincident_linked_nodes_are_pushed_apart() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("a", 400.0, 300.0), node("b", 400.0, 300.0)],
            edges: vec![edge("a", "b")],
        };
        let config = LayoutConfig {
            ticks: 10,
            ..LayoutConfig::default()
        };

        layout(&mut snapshot, &config);

        assert_finite(&snapshot);
        assert!(distance(&snapshot.nodes[0], &snapshot.nodes[1]) > CHARGE_DISTANCE_MIN);
    }

    #[test]
    fn linked_pair_settles_near_link_distance() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("a", 350.0, 300.0), node("b", 450.0, 310.0)],
            edges: vec![edge("a", "b")],
        };

        layout(&mut snapshot, &LayoutConfig::default());

        let d = distance(&snapshot.nodes[0], &snapshot.nodes[1]);
        assert!((90.0..130.0).contains(&d), "distance {d}");
    }

    #[test]
    fn unlinked_pair_ends_farther_apart_than_linked_pair() {
        let start = || vec![node("a", 390.0, 300.0), node("b", 410.0, 300.0)];

        let mut linked = GraphSnapshot {
            nodes: start(),
            edges: vec![edge("a", "b")],
        };
        let mut unlinked = GraphSnapshot {
            nodes: start(),
            edges: vec![],
        };
        layout(&mut linked, &LayoutConfig::default());
        layout(&mut unlinked, &LayoutConfig::default());

        let d_linked = distance(&linked.nodes[0], &linked.nodes[1]);
        let d_unlinked = distance(&unlinked.nodes[0], &unlinked.nodes[1]);
        assert!(d_unlinked > d_linked);
    }

    #[test]
    fn collision_separates_overlapping_nodes_without_charge() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("a", 395.0, 300.0), node("b", 405.0, 300.0)],
            edges: vec![],
        };
        let config = LayoutConfig {
            charge_strength: 0.0,
            ..LayoutConfig::default()
        };

        layout(&mut snapshot, &config);

        assert!(distance(&snapshot.nodes[0], &snapshot.nodes[1]) >= 60.0);
    }

    #[test]
    fn symmetric_graph_stays_centered() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![
                node("a", 100.0, 100.0),
                node("b", 120.0, 100.0),
                node("c", 110.0, 120.0),
            ],
            edges: vec![edge("a", "b"), edge("b", "c"), edge("c", "a")],
        };

        layout(&mut snapshot, &LayoutConfig::default());

        let n = snapshot.nodes.len() as f64;
        let cx = snapshot.nodes.iter().map(|n| n.x).sum::<f64>() / n;
        let cy = snapshot.nodes.iter().map(|n| n.y).sum::<f64>() / n;
        assert!((cx - 400.0).abs() < 1.0, "cx {cx}");
        assert!((cy - 300.0).abs() < 1.0, "cy {cy}");
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let build = || GraphSnapshot {
            nodes: vec![
                node("a", 400.0, 300.0),
                node("b", 400.0, 300.0),
                node("c", 410.0, 290.0),
                node("d", 380.0, 320.0),
            ],
            edges: vec![edge("a", "b"), edge("a", "c")],
        };

        let mut first = build();
        let mut second = build();
        layout(&mut first, &LayoutConfig::default());
        layout(&mut second, &LayoutConfig::default());

        for (a, b) in first.nodes.iter().zip(&second.nodes) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }

    #[test]
    fn zero_ticks_leave_positions_untouched() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("a", 1.0, 2.0), node("b", 3.0, 4.0)],
            edges: vec![edge("a", "b")],
        };
        let config = LayoutConfig {
            ticks: 0,
            ..LayoutConfig::default()
        };

        layout(&mut snapshot, &config);

        assert_eq!(snapshot.nodes[0].position(), Point::new(1.0, 2.0));
        assert_eq!(snapshot.nodes[1].position(), Point::new(3.0, 4.0));
    }

    #[test]
    fn run_with_stops_when_callback_breaks() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("a", 0.0, 0.0), node("b", 50.0, 0.0)],
            edges: vec![],
        };
        let mut simulation = Simulation::new(&mut snapshot, &LayoutConfig::default());

        let ran = simulation.run_with(|tick| {
            if tick == 25 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(ran, 25);
        assert_eq!(simulation.ticks_run(), 25);
    }

    #[test]
    fn alpha_cools_monotonically_toward_target() {
        let mut snapshot = GraphSnapshot::default();
        let mut simulation = Simulation::new(&mut snapshot, &LayoutConfig::default());

        let mut previous = simulation.alpha();
        for _ in 0..300 {
            simulation.tick();
            assert!(simulation.alpha() < previous);
            previous = simulation.alpha();
        }
        assert!((previous - 0.001).abs() < 1e-6);
    }

    #[test]
    fn edges_with_unknown_endpoints_are_ignored() {
        let mut snapshot = GraphSnapshot {
            nodes: vec![node("a", 390.0, 300.0), node("b", 410.0, 300.0)],
            edges: vec![edge("a", "missing"), edge("a", "a")],
        };

        layout(&mut snapshot, &LayoutConfig::default());

        assert_finite(&snapshot);
        assert_eq!(snapshot.edges.len(), 2);
    }

    #[test]
    fn hub_links_are_softened_by_degree() {
        let nodes = vec![
            node("hub", 0.0, 0.0),
            node("a", 1.0, 0.0),
            node("b", 2.0, 0.0),
            node("c", 3.0, 0.0),
        ];
        let edges = vec![edge("hub", "a"), edge("hub", "b"), edge("hub", "c")];

        let links = resolve_links(&nodes, &edges);

        assert_eq!(links.len(), 3);
        for link in links {
            assert_eq!(link.strength, 1.0);
            assert_eq!(link.bias, 0.75);
        }
    }

    #[test]
    fn jiggle_is_deterministic_and_nonzero() {
        let mut a = Jiggle::new();
        let mut b = Jiggle::new();
        for _ in 0..100 {
            let (x, y) = (a.next(), b.next());
            assert_eq!(x, y);
            assert!(x != 0.0 && x.abs() <= 5e-7);
        }
    }
}
