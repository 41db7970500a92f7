//! umbra: a note store that lays out notes as a knowledge graph.
//!
//! Notes are captured into SQLite, enriched by an AI backend (summary, tags,
//! embedding), and visualized as a graph whose edges join notes with similar
//! embeddings.

pub mod db;
pub mod enricher;
pub mod graph;
pub mod models;
pub mod ollama;
pub mod pipeline;
pub mod service;
pub mod utils;

pub use db::Database;
pub use enricher::{EnrichmentOutcome, NoteEnricher};
pub use graph::{GraphConfig, RenderedGraph};
pub use models::{
    Embedding, Enrichment, Note, NoteBuilder, NoteCategory, NoteId, NoteKind, UnknownCategory,
};
pub use service::{ListNotesOptions, NoteService, SortOrder};
