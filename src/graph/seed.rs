use rand::Rng;

use super::snapshot::{GraphNode, Point};

/// Default width of the square nodes are scattered in before layout.
pub const DEFAULT_SPREAD: f64 = 50.0;

/// Scatters nodes uniformly in a `spread`-wide square around `center` and
/// clears their velocities.
///
/// The layout engine never seeds positions itself; reproducibility is decided
/// by the `rng` the caller passes in.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use umbra::graph::{GraphNode, Point, seed_positions};
/// use umbra::{Embedding, NoteCategory, NoteId};
///
/// let mut nodes = vec![GraphNode::new(
///     NoteId::new("a"),
///     "a",
///     NoteCategory::Text,
///     Embedding::new(vec![1.0]),
/// )];
/// let mut rng = StdRng::seed_from_u64(7);
/// seed_positions(&mut nodes, Point::new(400.0, 300.0), 50.0, &mut rng);
///
/// assert!((nodes[0].x - 400.0).abs() <= 25.0);
/// assert!((nodes[0].y - 300.0).abs() <= 25.0);
/// ```
pub fn seed_positions<R: Rng>(
    nodes: &mut [GraphNode],
    center: Point,
    spread: f64,
    rng: &mut R,
) {
    for node in nodes {
        node.x = center.x + rng.gen_range(-0.5..0.5) * spread;
        node.y = center.y + rng.gen_range(-0.5..0.5) * spread;
        node.vx = 0.0;
        node.vy = 0.0;
    }
}
