//! Decoding of stored note rows into typed notes.
//!
//! Rows keep category-specific data in a JSON `metadata` column. It is decoded
//! once here into [`NoteKind`] and [`Enrichment`]; nothing downstream sees the
//! raw JSON.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{Embedding, Enrichment, Note, NoteBuilder, NoteCategory, NoteId, NoteKind};

/// Columns selected by every note query, in `RawNote` order.
pub(super) const NOTE_COLUMNS: &str =
    "id, title, content, type, created_at, updated_at, metadata, embedding";

/// JSON layout of the `metadata` column.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct StoredMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    pub ai_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

impl StoredMetadata {
    /// Captures the media reference of a freshly created note.
    pub fn for_kind(kind: &NoteKind) -> Self {
        match kind {
            NoteKind::Text => Self::default(),
            NoteKind::Voice { audio_path } => Self {
                audio_path: audio_path.clone(),
                ..Self::default()
            },
            NoteKind::Image { image_path } => Self {
                image_path: image_path.clone(),
                ..Self::default()
            },
        }
    }

    /// Records an enrichment, replacing any earlier one.
    pub fn set_enrichment(&mut self, enrichment: &Enrichment) {
        self.ai_processed = true;
        self.summary = Some(enrichment.summary.clone());
        self.tags = enrichment.tags.clone();
        self.transcription = enrichment.transcription.clone();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn enrichment(&self) -> Option<Enrichment> {
        self.ai_processed.then(|| Enrichment {
            summary: self.summary.clone().unwrap_or_default(),
            tags: self.tags.clone(),
            transcription: self.transcription.clone(),
        })
    }
}

/// A note row exactly as stored.
#[derive(Debug)]
pub(super) struct RawNote {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub metadata: String,
    pub embedding: Option<String>,
}

impl RawNote {
    /// Reads a row selected with [`NOTE_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            category: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            metadata: row.get(6)?,
            embedding: row.get(7)?,
        })
    }

    /// Parses the metadata column, falling back to empty metadata.
    pub fn metadata(&self) -> StoredMetadata {
        serde_json::from_str(&self.metadata).unwrap_or_else(|e| {
            warn!(note = %self.id, error = %e, "ignoring unreadable note metadata");
            StoredMetadata::default()
        })
    }

    /// Decodes the row into a typed note.
    ///
    /// Unknown categories decode as text notes and malformed embeddings as
    /// absent ones; neither is an error.
    pub fn decode(self) -> anyhow::Result<Note> {
        let category = self.category.parse().unwrap_or_else(|e| {
            warn!(note = %self.id, error = %e, "treating note as text");
            NoteCategory::Text
        });
        let metadata = self.metadata();
        let media = match category {
            NoteCategory::Text => None,
            NoteCategory::Voice => metadata.audio_path.clone(),
            NoteCategory::Image => metadata.image_path.clone(),
        };

        let embedding = self.embedding.as_deref().and_then(|json| {
            let parsed = Embedding::from_json(json);
            if parsed.is_none() {
                debug!(note = %self.id, "stored embedding is not a numeric array");
            }
            parsed
        });

        Ok(NoteBuilder::new()
            .id(NoteId::new(self.id))
            .title(self.title)
            .content(self.content)
            .kind(NoteKind::with_media(category, media))
            .enrichment(metadata.enrichment())
            .embedding(embedding)
            .created_at(OffsetDateTime::from_unix_timestamp(self.created_at)?)
            .updated_at(OffsetDateTime::from_unix_timestamp(self.updated_at)?)
            .build())
    }
}
