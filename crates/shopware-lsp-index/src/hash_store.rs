//! Persistent path → content-hash map.
//!
//! Backs the scanner's change detection. Stored as `hashes.db` in the server
//! cache directory; an entry exists iff the file was successfully indexed at
//! that hash.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

use crate::Result;

/// Hex SHA-256 of file contents. Only equality matters; the hash must be
/// identical for identical bytes across platforms and processes.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Durable key-value store mapping absolute file paths to content hashes.
pub struct HashStore {
    conn: Mutex<Connection>,
}

impl HashStore {
    /// Open (or create) `hashes.db` under the given cache directory.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        Self::from_connection(Connection::open(cache_dir.join("hashes.db"))?)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS hashes (path TEXT PRIMARY KEY, hash TEXT NOT NULL)",
            [],
        )?;
        Ok(HashStore { conn: Mutex::new(conn) })
    }

    pub fn get(&self, path: &str) -> Option<String> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT hash FROM hashes WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )
        .ok()
    }

    /// Insert or update; durable before returning.
    pub fn set(&self, path: &str, hash: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO hashes (path, hash) VALUES (?1, ?2)",
            params![path, hash],
        )?;
        Ok(())
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM hashes WHERE path = ?1", params![path])?;
        Ok(())
    }

    /// Remove every entry; the next scan treats all files as new.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM hashes", [])?;
        Ok(())
    }

    /// Full copy of the store. Used for deletion detection and debugging.
    pub fn snapshot(&self) -> HashMap<String, String> {
        let conn = self.conn.lock();
        let mut snapshot = HashMap::new();
        let Ok(mut stmt) = conn.prepare("SELECT path, hash FROM hashes") else {
            return snapshot;
        };
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        });
        if let Ok(rows) = rows {
            for row in rows.flatten() {
                snapshot.insert(row.0, row.1);
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = content_hash(b"<container/>");
        let b = content_hash(b"<container/>");
        let c = content_hash(b"<services/>");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_set_get_delete() {
        let store = HashStore::in_memory().unwrap();
        assert_eq!(store.get("/a.xml"), None);

        store.set("/a.xml", "h1").unwrap();
        assert_eq!(store.get("/a.xml").as_deref(), Some("h1"));

        store.set("/a.xml", "h2").unwrap();
        assert_eq!(store.get("/a.xml").as_deref(), Some("h2"));

        store.delete("/a.xml").unwrap();
        assert_eq!(store.get("/a.xml"), None);
        // Deleting an unknown path is a no-op.
        store.delete("/a.xml").unwrap();
    }

    #[test]
    fn test_clear_and_snapshot() {
        let store = HashStore::in_memory().unwrap();
        store.set("/a.xml", "h1").unwrap();
        store.set("/b.php", "h2").unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("/b.php").map(String::as_str), Some("h2"));

        store.clear().unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = HashStore::open(dir.path()).unwrap();
            store.set("/a.xml", "h1").unwrap();
        }
        let store = HashStore::open(dir.path()).unwrap();
        assert_eq!(store.get("/a.xml").as_deref(), Some("h1"));
    }
}
