//! Knowledge-graph construction and layout.
//!
//! Notes carrying an embedding become [`GraphNode`]s; [`build_edges`] links
//! every pair whose cosine similarity clears a threshold, and [`layout`] places
//! the result in 2D with a force simulation.
//!
//! # Examples
//!
//! ```
//! use umbra::graph::{GraphConfig, GraphNode, GraphSnapshot, layout};
//! use umbra::{Embedding, NoteCategory, NoteId};
//!
//! let config = GraphConfig::default();
//! let node = |id: &str, values: Vec<f64>, x: f64| {
//!     GraphNode::new(NoteId::new(id), id, NoteCategory::Text, Embedding::new(values))
//!         .at(x, 300.0)
//! };
//!
//! let mut snapshot = GraphSnapshot::from_nodes(
//!     vec![
//!         node("n1", vec![1.0, 0.0], 390.0),
//!         node("n2", vec![1.0, 0.0], 400.0),
//!         node("n3", vec![0.0, 1.0], 410.0),
//!     ],
//!     config.threshold,
//! );
//! assert_eq!(snapshot.edges.len(), 1);
//!
//! layout(&mut snapshot, &config.layout);
//! let rendered = snapshot.render();
//! assert_eq!(rendered.edges[0].source.id.as_str(), "n1");
//! ```

mod config;
mod layout;
mod seed;
mod similarity;
mod snapshot;

pub use config::{ConfigError, GraphConfig};
pub use layout::{CHARGE_DISTANCE_MIN, DEFAULT_CANVAS, LayoutConfig, Simulation, layout};
pub use seed::{DEFAULT_SPREAD, seed_positions};
pub use similarity::{DEFAULT_THRESHOLD, build_edges, cosine_similarity};
pub use snapshot::{
    GraphEdge, GraphNode, GraphSnapshot, Point, RenderedEdge, RenderedGraph, RenderedNode,
};
