mod schema;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

use schema::{INITIAL_SCHEMA, MIGRATIONS};

/// Database wrapper providing connection management and schema initialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Uses IF NOT EXISTS for idempotent execution, then runs column
    /// migrations, ignoring "duplicate column" errors.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(INITIAL_SCHEMA)?;

        for statement in MIGRATIONS.lines() {
            let trimmed = statement.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }

            match self.conn.execute(trimmed, []) {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                    let is_duplicate_column = msg
                        .as_ref()
                        .map(|s| s.contains("duplicate column"))
                        .unwrap_or(false);

                    if !is_duplicate_column {
                        return Err(rusqlite::Error::SqliteFailure(err, msg).into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
