use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Embedding, Enrichment, NoteCategory, NoteId, NoteKind};

/// A captured note, decoded from its stored record.
///
/// The category-specific fields live in `kind`; AI output (if any) lives in
/// `enrichment` and `embedding`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    id: NoteId,
    title: String,
    content: String,
    kind: NoteKind,
    enrichment: Option<Enrichment>,
    embedding: Option<Embedding>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl Note {
    /// Returns the note's unique identifier.
    pub fn id(&self) -> &NoteId {
        &self.id
    }

    /// Returns the note's title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the note's text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the category-specific payload.
    pub fn kind(&self) -> &NoteKind {
        &self.kind
    }

    /// Shorthand for `kind().category()`.
    pub fn category(&self) -> NoteCategory {
        self.kind.category()
    }

    /// Returns the AI enrichment, if the note has been processed.
    pub fn enrichment(&self) -> Option<&Enrichment> {
        self.enrichment.as_ref()
    }

    /// Returns the parsed embedding, if present and well-formed.
    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    /// Returns when this note was created.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Returns when this note was last updated.
    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }
}

/// Builder for constructing `Note` instances with optional fields.
///
/// # Examples
///
/// ```
/// use umbra::{NoteBuilder, NoteCategory, NoteId};
///
/// let note = NoteBuilder::new()
///     .id(NoteId::new("n1"))
///     .title("Groceries")
///     .content("buy milk")
///     .build();
///
/// assert_eq!(note.id().as_str(), "n1");
/// assert_eq!(note.category(), NoteCategory::Text);
/// assert!(note.embedding().is_none());
/// ```
#[derive(Debug, Default)]
pub struct NoteBuilder {
    id: Option<NoteId>,
    title: Option<String>,
    content: Option<String>,
    kind: Option<NoteKind>,
    enrichment: Option<Enrichment>,
    embedding: Option<Embedding>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
}

impl NoteBuilder {
    /// Creates a new `NoteBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the note ID.
    pub fn id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the note title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the note content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the category-specific payload.
    pub fn kind(mut self, kind: NoteKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the AI enrichment.
    pub fn enrichment(mut self, enrichment: Option<Enrichment>) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// Sets the embedding.
    pub fn embedding(mut self, embedding: Option<Embedding>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Sets the created timestamp.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the updated timestamp.
    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Builds the `Note`, using defaults for optional fields.
    ///
    /// A missing title defaults to "Untitled Note" and a missing kind to `Text`.
    ///
    /// # Panics
    ///
    /// Panics if `id` has not been set.
    pub fn build(self) -> Note {
        let now = OffsetDateTime::now_utc();
        Note {
            id: self.id.expect("id is required"),
            title: self.title.unwrap_or_else(|| "Untitled Note".to_string()),
            content: self.content.unwrap_or_default(),
            kind: self.kind.unwrap_or(NoteKind::Text),
            enrichment: self.enrichment,
            embedding: self.embedding,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        }
    }
}
