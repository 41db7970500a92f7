use std::collections::HashMap;

use serde::Serialize;

use crate::{Embedding, Note, NoteCategory, NoteId};

use super::similarity::build_edges;

/// A point in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A note placed in the graph.
///
/// Position and velocity belong to the layout engine; the edge builder only
/// reads the embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NoteId,
    pub label: String,
    pub category: NoteCategory,
    pub embedding: Embedding,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl GraphNode {
    /// Creates a node at the origin with zero velocity.
    pub fn new(
        id: NoteId,
        label: impl Into<String>,
        category: NoteCategory,
        embedding: Embedding,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            category,
            embedding,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    /// Builds a node from a note, or `None` if the note has no usable embedding.
    pub fn from_note(note: &Note) -> Option<Self> {
        let embedding = note.embedding()?.clone();
        Some(Self::new(
            note.id().clone(),
            note.title(),
            note.category(),
            embedding,
        ))
    }

    /// Places the node at the given position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An undirected similarity link between two notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: NoteId,
    pub target: NoteId,
    /// Cosine similarity of the two embeddings.
    pub weight: f64,
}

/// Nodes and edges for a single visualization request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// Builds a snapshot, connecting every pair of nodes whose similarity
    /// exceeds `threshold`.
    pub fn from_nodes(nodes: Vec<GraphNode>, threshold: f64) -> Self {
        let edges = build_edges(&nodes, threshold);
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves node positions for rendering.
    ///
    /// Edges whose endpoints are not in the node set are dropped.
    pub fn render(&self) -> RenderedGraph {
        let nodes: Vec<RenderedNode> = self.nodes.iter().map(RenderedNode::from).collect();
        let index: HashMap<&NoteId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (&node.id, i))
            .collect();

        let edges = self
            .edges
            .iter()
            .filter_map(|edge| {
                let source = nodes[*index.get(&edge.source)?].clone();
                let target = nodes[*index.get(&edge.target)?].clone();
                Some(RenderedEdge {
                    source,
                    target,
                    weight: edge.weight,
                })
            })
            .collect();

        RenderedGraph { nodes, edges }
    }
}

/// A node's final placement, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub id: NoteId,
    pub label: String,
    pub category: NoteCategory,
    pub x: f64,
    pub y: f64,
}

impl From<&GraphNode> for RenderedNode {
    fn from(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            category: node.category,
            x: node.x,
            y: node.y,
        }
    }
}

/// An edge with both endpoints resolved to their placed nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEdge {
    pub source: RenderedNode,
    pub target: RenderedNode,
    pub weight: f64,
}

/// Output of the visualization pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedGraph {
    pub nodes: Vec<RenderedNode>,
    pub edges: Vec<RenderedEdge>,
}

impl RenderedGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
