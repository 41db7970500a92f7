//! Cosine similarity and similarity-graph construction.

use super::snapshot::{GraphEdge, GraphNode};

/// Default minimum similarity for two notes to be linked.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// Computes the cosine similarity of two vectors.
///
/// Returns 0 when the vectors differ in length, are empty, or either has zero
/// magnitude. The result is symmetric and clamped to `[-1, 1]`.
///
/// # Examples
///
/// ```
/// use umbra::graph::cosine_similarity;
///
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
/// assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    // Scale by the largest component so squared norms neither overflow nor
    // underflow; cosine is invariant under scaling.
    let max_abs = a
        .iter()
        .chain(b)
        .fold(0.0_f64, |max, x| max.max(x.abs()));
    if max_abs == 0.0 || !max_abs.is_finite() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x / max_abs, y / max_abs);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Links every unordered pair of nodes whose similarity is strictly greater
/// than `threshold`.
///
/// Pairs are visited as `(i, j)` with `i < j` in input order, so each pair
/// yields at most one edge and the output order is deterministic.
pub fn build_edges(nodes: &[GraphNode], threshold: f64) -> Vec<GraphEdge> {
    let mut edges = Vec::new();

    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            if a.id == b.id {
                continue;
            }
            let weight = cosine_similarity(a.embedding.values(), b.embedding.values());
            if weight > threshold {
                edges.push(GraphEdge {
                    source: a.id.clone(),
                    target: b.id.clone(),
                    weight,
                });
            }
        }
    }

    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        threshold,
        "built similarity graph"
    );
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Embedding, NoteCategory, NoteId};

    fn node(id: &str, values: &[f64]) -> GraphNode {
        GraphNode::new(
            NoteId::new(id),
            id,
            NoteCategory::Text,
            Embedding::new(values.to_vec()),
        )
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opposite_vectors_have_similarity_minus_one() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((sim + 1.0).abs() < 1e-12);
        assert!(sim >= -1.0);
    }

    #[test]
    fn zero_vector_yields_zero_not_nan() {
        let sim = cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(sim, 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn extreme_magnitudes_keep_self_similarity() {
        let huge = [1e200, 1e200];
        let tiny = [1e-200, 1e-200];

        assert!((cosine_similarity(&huge, &huge) - 1.0).abs() < 1e-12);
        assert!((cosine_similarity(&tiny, &tiny) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1e300, 0.0], &[0.0, 1e-300]), 0.0);
        assert!((cosine_similarity(&[1e300, 1e300], &[-1e300, -1e300]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_dimensions_yield_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = [0.1, 0.7, -0.2, 0.9];
        let b = [0.5, -0.3, 0.8, 0.05];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn three_note_scenario_produces_single_edge() {
        let nodes = vec![
            node("n1", &[1.0, 0.0]),
            node("n2", &[1.0, 0.0]),
            node("n3", &[0.0, 1.0]),
        ];

        let edges = build_edges(&nodes, DEFAULT_THRESHOLD);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source.as_str(), "n1");
        assert_eq!(edges[0].target.as_str(), "n2");
        assert_eq!(edges[0].weight, 1.0);
    }

    #[test]
    fn similarity_equal_to_threshold_is_excluded() {
        // cos([3,4], [4,3]) = 24 / 25 exactly
        let nodes = vec![node("a", &[3.0, 4.0]), node("b", &[4.0, 3.0])];
        assert_eq!(cosine_similarity(&[3.0, 4.0], &[4.0, 3.0]), 0.96);

        assert!(build_edges(&nodes, 0.96).is_empty());
        assert_eq!(build_edges(&nodes, 0.959).len(), 1);
    }

    #[test]
    fn fewer_than_two_nodes_yield_no_edges() {
        assert!(build_edges(&[], DEFAULT_THRESHOLD).is_empty());
        assert!(build_edges(&[node("solo", &[1.0])], DEFAULT_THRESHOLD).is_empty());
    }

    #[test]
    fn mismatched_embeddings_never_link() {
        let nodes = vec![node("a", &[1.0, 0.0]), node("b", &[1.0, 0.0, 0.0])];
        assert!(build_edges(&nodes, -1.0).is_empty());
    }

    #[test]
    fn no_duplicate_or_self_edges() {
        let nodes: Vec<GraphNode> = (0..6)
            .map(|i| node(&format!("n{i}"), &[1.0, 0.01 * i as f64]))
            .collect();

        let edges = build_edges(&nodes, 0.0);

        assert_eq!(edges.len(), 6 * 5 / 2);
        for edge in &edges {
            assert_ne!(edge.source, edge.target);
        }
        for (i, e1) in edges.iter().enumerate() {
            for e2 in &edges[i + 1..] {
                let same = (e1.source == e2.source && e1.target == e2.target)
                    || (e1.source == e2.target && e1.target == e2.source);
                assert!(!same, "duplicate edge {e1:?}");
            }
        }
    }
}
