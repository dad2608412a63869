//! Per-indexer persistent fact storage.
//!
//! Each domain indexer owns a `facts.db` in its own cache subdirectory and
//! stores one serialized fact bundle per file. The core never reads these;
//! the indexer reloads them into its in-memory maps on startup.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::Result;

pub struct FactStore {
    conn: Mutex<Connection>,
}

impl FactStore {
    /// Open (or create) the store under the indexer's cache subdirectory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Self::from_connection(Connection::open(dir.join("facts.db"))?)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS facts (path TEXT PRIMARY KEY, data TEXT NOT NULL)",
            [],
        )?;
        Ok(FactStore { conn: Mutex::new(conn) })
    }

    /// Replace the facts attributed to a path.
    pub fn set<T: Serialize>(&self, path: &str, facts: &T) -> Result<()> {
        let data = serde_json::to_string(facts)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO facts (path, data) VALUES (?1, ?2)",
            params![path, data],
        )?;
        Ok(())
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM facts WHERE path = ?1", params![path])?;
        Ok(())
    }

    /// Load every stored (path, facts) pair. Rows that no longer
    /// deserialize are skipped; the file re-indexes on its next change.
    pub fn load_all<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT path, data FROM facts")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut loaded = Vec::new();
        for row in rows.flatten() {
            match serde_json::from_str(&row.1) {
                Ok(facts) => loaded.push((row.0, facts)),
                Err(err) => {
                    tracing::warn!("discarding stale facts for {}: {}", row.0, err);
                }
            }
        }
        Ok(loaded)
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM facts", [])?;
        Ok(())
    }
}
