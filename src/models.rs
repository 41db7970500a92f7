mod embedding;
mod enrichment;
mod ids;
mod note;
mod note_kind;

pub use embedding::Embedding;
pub use enrichment::Enrichment;
pub use ids::NoteId;
pub use note::{Note, NoteBuilder};
pub use note_kind::{NoteCategory, NoteKind, UnknownCategory};
