use super::sqlite::Database;
use crate::error::Error;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use tracing::debug;

pub const LAST_EXEC_KEY: &str = "last_exec";

/// Persisted timestamp of the previous run, stored in the `app_state` table.
pub struct WatermarkStore {
    db: Database,
}

impl WatermarkStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            db: Database::open(path)?,
        })
    }

    pub fn open_read_only(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            db: Database::open_read_only(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    /// Reads the stored watermark without touching it.
    pub fn last_exec(&self) -> Result<Option<f64>, Error> {
        read_last_exec(&self.db)
    }

    /// Returns the previous watermark (or `default` when none is stored) and
    /// records `now` in the same immediate transaction, so two runs never see
    /// the same window.
    pub fn get_last_exec_and_update(&self, now: f64, default: f64) -> Result<f64, Error> {
        let tx = Transaction::new_unchecked(self.db.connection(), TransactionBehavior::Immediate)?;
        let previous: Option<String> = tx
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![LAST_EXEC_KEY],
                |row| row.get(0),
            )
            .optional()?;

        tx.execute(
            "INSERT OR REPLACE INTO app_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![
                LAST_EXEC_KEY,
                now.to_string(),
                chrono::Utc::now().timestamp()
            ],
        )?;
        tx.commit()?;

        let last = previous
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(default);
        debug!("Watermark moved from {} to {}", last, now);
        Ok(last)
    }
}

fn read_last_exec(db: &Database) -> Result<Option<f64>, Error> {
    let value: Option<String> = db
        .connection()
        .query_row(
            "SELECT value FROM app_state WHERE key = ?1",
            params![LAST_EXEC_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse::<f64>().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_read_returns_default_and_stores_now() {
        let store = WatermarkStore::open_in_memory().unwrap();
        assert_eq!(store.last_exec().unwrap(), None);
        let last = store.get_last_exec_and_update(1000.0, 10.0).unwrap();
        assert_eq!(last, 10.0);
        assert_eq!(store.last_exec().unwrap(), Some(1000.0));
    }

    #[test]
    fn test_second_update_sees_previous_run() {
        let store = WatermarkStore::open_in_memory().unwrap();
        store.get_last_exec_and_update(1000.0, 0.0).unwrap();
        let last = store.get_last_exec_and_update(2000.5, 0.0).unwrap();
        assert_eq!(last, 1000.0);
        assert_eq!(store.last_exec().unwrap(), Some(2000.5));
    }
}
