//! Property tests for cosine similarity and edge building.

use proptest::prelude::*;
use umbra::graph::{GraphNode, build_edges, cosine_similarity};
use umbra::{Embedding, NoteCategory, NoteId};

fn vector(dim: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0..100.0f64, dim)
}

fn nonzero_vector(dim: usize) -> impl Strategy<Value = Vec<f64>> {
    vector(dim).prop_filter("vector must have magnitude", |v| {
        v.iter().map(|x| x * x).sum::<f64>() > 1e-6
    })
}

proptest! {
    #[test]
    fn similarity_is_symmetric((a, b) in (1usize..16).prop_flat_map(|d| (vector(d), vector(d)))) {
        prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn self_similarity_is_one(a in (1usize..16).prop_flat_map(nonzero_vector)) {
        prop_assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn self_similarity_survives_extreme_scales(
        a in (1usize..16).prop_flat_map(nonzero_vector),
        exponent in -300i32..300,
    ) {
        let scale = 10f64.powi(exponent);
        let scaled: Vec<f64> = a.iter().map(|x| x * scale).collect();
        prop_assert!((cosine_similarity(&scaled, &scaled) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_similarity_is_zero(a in (1usize..16).prop_flat_map(vector)) {
        let zero = vec![0.0; a.len()];
        let s = cosine_similarity(&a, &zero);
        prop_assert_eq!(s, 0.0);
        prop_assert_eq!(cosine_similarity(&zero, &a), 0.0);
    }

    #[test]
    fn similarity_stays_in_range((a, b) in (1usize..16).prop_flat_map(|d| (vector(d), vector(d)))) {
        let s = cosine_similarity(&a, &b);
        prop_assert!(s.is_finite());
        prop_assert!((-1.0..=1.0).contains(&s));
    }

    #[test]
    fn mismatched_dimensions_never_link(a in vector(3), b in vector(4)) {
        prop_assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn edges_are_unique_and_above_threshold(
        vectors in prop::collection::vec(vector(3), 0..12),
        threshold in -0.5..0.99f64,
    ) {
        let nodes: Vec<GraphNode> = vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                GraphNode::new(NoteId::new(format!("n{i}")), "", NoteCategory::Text, Embedding::new(v))
            })
            .collect();
        let n = nodes.len();

        let edges = build_edges(&nodes, threshold);

        prop_assert!(edges.len() <= n * n.saturating_sub(1) / 2);
        let mut seen = std::collections::HashSet::new();
        for edge in &edges {
            prop_assert_ne!(&edge.source, &edge.target);
            prop_assert!(edge.weight > threshold);
            let key = if edge.source.as_str() < edge.target.as_str() {
                (edge.source.clone(), edge.target.clone())
            } else {
                (edge.target.clone(), edge.source.clone())
            };
            prop_assert!(seen.insert(key), "duplicate edge");
        }
    }
}
