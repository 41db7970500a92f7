//! End-to-end visualization: notes in, placed nodes and edges out.
//!
//! The pipeline is a pure, synchronous computation. [`spawn_visualization`]
//! moves it onto a worker thread and hands back a [`LayoutHandle`] that yields
//! the finished graph as a single message.

use std::sync::mpsc::{self, Receiver, RecvError};
use std::thread::{self, JoinHandle};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::Note;
use crate::graph::{
    GraphConfig, GraphNode, GraphSnapshot, Point, RenderedGraph, layout, seed_positions,
};

/// Errors from running the pipeline on a worker thread.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The worker thread could not be started.
    #[error("failed to spawn layout worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker ended without delivering a result (it panicked).
    #[error("layout worker exited without producing a result")]
    WorkerLost(#[source] RecvError),
}

/// Converts notes to graph nodes, dropping notes without a usable embedding.
pub fn nodes_from_notes(notes: &[Note]) -> Vec<GraphNode> {
    let nodes: Vec<GraphNode> = notes.iter().filter_map(GraphNode::from_note).collect();
    if nodes.len() != notes.len() {
        debug!(
            skipped = notes.len() - nodes.len(),
            "notes without embeddings left out of graph"
        );
    }
    nodes
}

/// Builds and lays out the similarity graph for the given notes.
///
/// An empty result is a normal outcome when no note has an embedding.
pub fn visualize(notes: &[Note], config: &GraphConfig) -> RenderedGraph {
    visualize_nodes(nodes_from_notes(notes), config)
}

/// Seeds positions, builds edges, and runs the layout for prepared nodes.
pub fn visualize_nodes(mut nodes: Vec<GraphNode>, config: &GraphConfig) -> RenderedGraph {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    seed_positions(&mut nodes, config.layout.center, config.spread, &mut rng);

    let mut snapshot = GraphSnapshot::from_nodes(nodes, config.threshold);
    layout(&mut snapshot, &config.layout);

    info!(
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "knowledge graph ready"
    );
    snapshot.render()
}

/// Handle to a visualization running on a worker thread.
pub struct LayoutHandle {
    receiver: Receiver<RenderedGraph>,
    worker: JoinHandle<()>,
}

impl LayoutHandle {
    /// Returns `true` once the worker has finished.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the finished graph arrives.
    pub fn wait(self) -> Result<RenderedGraph, PipelineError> {
        let result = self.receiver.recv().map_err(PipelineError::WorkerLost);
        // The worker has either sent its result or died; joining cannot block.
        let _ = self.worker.join();
        result
    }
}

/// Runs [`visualize`] on a background thread.
///
/// The notes and config are moved into the worker, which owns the graph for
/// the whole computation and sends back one completed result.
pub fn spawn_visualization(
    notes: Vec<Note>,
    config: GraphConfig,
) -> Result<LayoutHandle, PipelineError> {
    let (sender, receiver) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("umbra-layout".to_string())
        .spawn(move || {
            let graph = visualize(&notes, &config);
            // The receiver may have been dropped; nothing to report then.
            let _ = sender.send(graph);
        })
        .map_err(PipelineError::Spawn)?;

    Ok(LayoutHandle { receiver, worker })
}

/// Returns the centroid of a rendered graph, or `None` when it is empty.
pub fn centroid(graph: &RenderedGraph) -> Option<Point> {
    if graph.nodes.is_empty() {
        return None;
    }
    let n = graph.nodes.len() as f64;
    let (x, y) = graph
        .nodes
        .iter()
        .fold((0.0, 0.0), |(x, y), node| (x + node.x, y + node.y));
    Some(Point::new(x / n, y / n))
}
