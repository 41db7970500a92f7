/// Database schema for the notes store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
pub const INITIAL_SCHEMA: &str = r#"
-- Notes table: one record per captured note
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL DEFAULT 'text',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);

-- Index for listing notes newest first
CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at);
"#;

/// Column additions applied after the initial schema.
///
/// Each line is executed separately; "duplicate column" errors are ignored so
/// the statements can run on every open.
pub const MIGRATIONS: &str = r#"
-- Serialized embedding vector (JSON array of floats)
ALTER TABLE notes ADD COLUMN embedding TEXT
"#;
