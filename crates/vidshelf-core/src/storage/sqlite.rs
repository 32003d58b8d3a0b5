use rusqlite::{Connection, OpenFlags, Result};
use std::path::Path;
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// One SQLite file: a category hash registry or the run state store.
/// Both share a schema so any registry file can also hold a watermark.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self::init(Connection::open(path)?)?;
        debug!("Opened {}", path.display());
        Ok(db)
    }

    /// Opens an existing file for reading only. No pragma or schema change is
    /// applied and the file is opened `immutable`, so SQLite creates no
    /// journal or shared-memory files next to it.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let uri = format!("file:{}?immutable=1", escape_uri_path(path));
        let conn = Connection::open_with_flags(
            uri,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened {} read-only", path.display());
        Ok(Database { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Creates missing tables. Registries are never dropped: their rows are
    /// the only record of what was already ingested.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        self.conn.execute_batch(include_str!("schema.sql"))?;
        if version < SCHEMA_VERSION {
            debug!("Schema upgraded from version {} to {}", version, SCHEMA_VERSION);
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Percent-encodes the characters SQLite treats specially inside a URI path.
fn escape_uri_path(path: &Path) -> String {
    let mut out = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3f"),
            '#' => out.push_str("%23"),
            other => out.push(other),
        }
    }
    out
}
