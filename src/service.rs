mod record;

use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{Database, Embedding, Enrichment, Note, NoteBuilder, NoteCategory, NoteId, NoteKind};

use record::{NOTE_COLUMNS, RawNote, StoredMetadata};

/// Title given to notes created without one.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// Service layer providing note management operations.
///
/// NoteService owns a Database instance and is the only place that reads or
/// writes note records. Rows are decoded into typed [`Note`]s here, so callers
/// never see the stored metadata JSON.
///
/// # Examples
///
/// ```
/// use umbra::{Database, NoteService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = NoteService::new(db);
/// # Ok(())
/// # }
/// ```
pub struct NoteService {
    db: Database,
}

impl NoteService {
    /// Creates a new NoteService with the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Useful for testing or advanced operations that need direct database access.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates a new note and returns it with its generated id.
    ///
    /// A blank `title` falls back to "Untitled Note". Text notes need content;
    /// voice and image notes need either content (a transcript) or a media
    /// path.
    ///
    /// # Examples
    ///
    /// ```
    /// use umbra::{Database, NoteKind, NoteService};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = NoteService::new(Database::in_memory()?);
    ///
    /// let note = service.create_note(Some("Idea"), "graphs of notes", NoteKind::Text)?;
    /// assert_eq!(note.title(), "Idea");
    /// assert!(note.embedding().is_none());
    ///
    /// assert!(service.create_note(None, "   ", NoteKind::Text).is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_note(&self, title: Option<&str>, content: &str, kind: NoteKind) -> Result<Note> {
        let content = content.trim();
        if content.is_empty() {
            match kind.media_path() {
                None if kind.category() == NoteCategory::Text => {
                    anyhow::bail!("Note content cannot be empty")
                }
                None => anyhow::bail!("{} note content cannot be empty", kind.category()),
                Some(_) => {}
            }
        }

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        let id = NoteId::generate();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let metadata = StoredMetadata::for_kind(&kind).to_json()?;

        self.db
            .connection()
            .execute(
                "INSERT INTO notes (id, title, content, type, created_at, updated_at, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (
                    id.as_str(),
                    title,
                    content,
                    kind.category().as_str(),
                    now,
                    now,
                    &metadata,
                ),
            )
            .context("Failed to insert note")?;

        debug!(note = %id, category = %kind.category(), "note created");

        let timestamp = OffsetDateTime::from_unix_timestamp(now)?;
        Ok(NoteBuilder::new()
            .id(id)
            .title(title)
            .content(content)
            .kind(kind)
            .created_at(timestamp)
            .updated_at(timestamp)
            .build())
    }

    /// Retrieves a note by its ID.
    ///
    /// Returns `None` if no note exists with the given ID. This is not
    /// considered an error condition.
    pub fn get_note(&self, id: &NoteId) -> Result<Option<Note>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
        let raw = self
            .db
            .connection()
            .query_row(&sql, [id.as_str()], RawNote::from_row)
            .optional()?;

        raw.map(RawNote::decode).transpose()
    }

    /// Lists notes, newest first by default.
    ///
    /// # Examples
    ///
    /// ```
    /// use umbra::{Database, ListNotesOptions, NoteKind, NoteService};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = NoteService::new(Database::in_memory()?);
    /// service.create_note(None, "first", NoteKind::Text)?;
    /// service.create_note(None, "second", NoteKind::Text)?;
    ///
    /// let notes = service.list_notes(ListNotesOptions::default())?;
    /// assert_eq!(notes[0].content(), "second");
    /// # Ok(())
    /// # }
    /// ```
    pub fn list_notes(&self, options: ListNotesOptions) -> Result<Vec<Note>> {
        let direction = match options.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let mut sql = format!("SELECT {NOTE_COLUMNS} FROM notes");
        if let Some(category) = options.category {
            sql.push_str(&format!(" WHERE type = '{}'", category.as_str()));
        }
        sql.push_str(&format!(
            " ORDER BY created_at {direction}, rowid {direction}"
        ));
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        self.query_notes(&sql)
    }

    /// Returns every note that has a stored embedding, oldest first.
    ///
    /// Notes whose stored embedding turns out to be malformed are left out;
    /// this is the input set for graph building.
    pub fn notes_with_embeddings(&self) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE embedding IS NOT NULL
             ORDER BY created_at ASC, rowid ASC"
        );
        let notes: Vec<Note> = self
            .query_notes(&sql)?
            .into_iter()
            .filter(|note| note.embedding().is_some())
            .collect();

        debug!(count = notes.len(), "loaded notes with embeddings");
        Ok(notes)
    }

    /// Stores an enrichment result on a note and returns the updated note.
    ///
    /// The embedding replaces any earlier one; `None` clears it.
    pub fn apply_enrichment(
        &self,
        id: &NoteId,
        enrichment: &Enrichment,
        embedding: Option<&Embedding>,
    ) -> Result<Note> {
        let conn = self.db.connection();
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
        let Some(raw) = conn
            .query_row(&sql, [id.as_str()], RawNote::from_row)
            .optional()?
        else {
            anyhow::bail!("Note with id {} does not exist", id);
        };

        let mut metadata = raw.metadata();
        metadata.set_enrichment(enrichment);
        let now = OffsetDateTime::now_utc().unix_timestamp();

        conn.execute(
            "UPDATE notes SET metadata = ?1, embedding = ?2, updated_at = ?3 WHERE id = ?4",
            (
                metadata.to_json()?,
                embedding.map(Embedding::to_json),
                now,
                id.as_str(),
            ),
        )
        .context("Failed to store enrichment")?;

        debug!(
            note = %id,
            tags = enrichment.tags.len(),
            dimension = embedding.map(Embedding::dimension),
            "enrichment stored"
        );

        self.get_note(id)?
            .with_context(|| format!("Note with id {} disappeared during update", id))
    }

    /// Deletes every note, returning how many were removed.
    pub fn clear_notes(&self) -> Result<usize> {
        let removed = self.db.connection().execute("DELETE FROM notes", [])?;
        info!(removed, "notes cleared");
        Ok(removed)
    }

    fn query_notes(&self, sql: &str) -> Result<Vec<Note>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], RawNote::from_row)?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?.decode()?);
        }
        Ok(notes)
    }
}

/// Sort order for listing notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest notes first (ascending by creation time)
    Ascending,
    /// Newest notes first (descending by creation time)
    #[default]
    Descending,
}

/// Options for listing notes.
///
/// # Examples
///
/// ```
/// use umbra::{ListNotesOptions, NoteCategory};
///
/// // Only the ten most recent image notes
/// let options = ListNotesOptions {
///     limit: Some(10),
///     category: Some(NoteCategory::Image),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListNotesOptions {
    /// Maximum number of notes to return. None means no limit.
    pub limit: Option<usize>,

    /// Only return notes of this category. None means all categories.
    pub category: Option<NoteCategory>,

    /// Sort order for notes. Defaults to Descending (newest first).
    pub order: SortOrder,
}
