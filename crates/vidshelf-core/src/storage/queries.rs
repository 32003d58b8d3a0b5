use super::models::HashRecord;
use super::sqlite::Database;
use rusqlite::{params, Result};

impl Database {
    // ── File Hashes ──────────────────────────────────────────────

    pub fn hash_exists(&self, hash: &str) -> Result<bool> {
        let mut stmt = self
            .connection()
            .prepare_cached("SELECT 1 FROM file_hashes WHERE hash = ?1 LIMIT 1")?;
        stmt.exists(params![hash])
    }

    /// Inserts a hash unless it is already known. Returns whether a row was written.
    pub fn insert_hash(&self, record: &HashRecord) -> Result<bool> {
        let changed = self.connection().execute(
            "INSERT OR IGNORE INTO file_hashes (hash, filepath, filename, file_size) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.hash,
                record.filepath,
                record.filename,
                record.file_size
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn remove_hash(&self, hash: &str) -> Result<bool> {
        let changed = self
            .connection()
            .execute("DELETE FROM file_hashes WHERE hash = ?1", params![hash])?;
        Ok(changed > 0)
    }

    pub fn get_hash_info(&self, hash: &str) -> Result<Option<HashRecord>> {
        match self.connection().query_row(
            "SELECT hash, filepath, filename, file_size FROM file_hashes WHERE hash = ?1",
            params![hash],
            |row| {
                Ok(HashRecord {
                    hash: row.get(0)?,
                    filepath: row.get(1)?,
                    filename: row.get(2)?,
                    file_size: row.get(3)?,
                })
            },
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn count_hashes(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM file_hashes", [], |row| row.get(0))
    }
}
