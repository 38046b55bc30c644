//! SQLite-backed cache store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{CacheStore, StoredResponse};

/// Durable cache store on a local SQLite database.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open the store at an explicit database path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("edgecached").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Named generations; dropped whole on the activation GC sweep
CREATE TABLE IF NOT EXISTS generations (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Response snapshots, keyed by canonical request key within a generation
CREATE TABLE IF NOT EXISTS entries (
    generation TEXT NOT NULL,
    entry_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers BLOB NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation, entry_key)
);

CREATE INDEX IF NOT EXISTS idx_entries_generation ON entries(generation);
"#;

impl CacheStore for SqliteStore {
  fn get(&self, generation: &str, key: &str) -> Result<Option<StoredResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, headers, body, stored_at FROM entries
         WHERE generation = ? AND entry_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare entry query: {}", e))?;

    let row: Option<(u16, Vec<u8>, Vec<u8>, String)> = stmt
      .query_row(params![generation, key], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .ok();

    match row {
      Some((status, headers, body, stored_at_str)) => {
        let headers: Vec<(String, String)> = serde_json::from_slice(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;
        let stored_at = parse_datetime(&stored_at_str)?;

        Ok(Some(StoredResponse {
          status,
          headers,
          body,
          stored_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, generation: &str, key: &str, response: &StoredResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let headers = serde_json::to_vec(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO generations (name) VALUES (?)",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to register generation: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO entries (generation, entry_key, status, headers, body, stored_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![generation, key, response.status, headers, response.body],
      )
      .map_err(|e| eyre!("Failed to store entry: {}", e))?;

    Ok(())
  }

  fn delete_generation(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM entries WHERE generation = ?", params![name])
      .map_err(|e| eyre!("Failed to delete generation entries: {}", e))?;

    conn
      .execute("DELETE FROM generations WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete generation: {}", e))?;

    Ok(())
  }

  fn list_generations(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM generations ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare generation query: {}", e))?;

    let names: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list generations: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(status: u16, body: &[u8]) -> StoredResponse {
    StoredResponse {
      status,
      headers: vec![("content-type".to_string(), "application/json".to_string())],
      body: body.to_vec(),
      stored_at: Utc::now(),
    }
  }

  fn open_temp() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_at(&dir.path().join("cache.db")).unwrap();
    (dir, store)
  }

  #[test]
  fn test_roundtrip_preserves_body_bytes() {
    let (_dir, store) = open_temp();
    let body = vec![0u8, 159, 146, 150, 255];
    store.put("dynamic-v1", "k1", &entry(200, &body)).unwrap();

    let got = store.get("dynamic-v1", "k1").unwrap().unwrap();
    assert_eq!(got.status, 200);
    assert_eq!(got.body, body);
    assert_eq!(got.headers[0].1, "application/json");
  }

  #[test]
  fn test_overwrite_same_key() {
    let (_dir, store) = open_temp();
    store.put("dynamic-v1", "k1", &entry(200, b"old")).unwrap();
    store.put("dynamic-v1", "k1", &entry(200, b"new")).unwrap();

    let got = store.get("dynamic-v1", "k1").unwrap().unwrap();
    assert_eq!(got.body, b"new");
  }

  #[test]
  fn test_list_and_delete_generations() {
    let (_dir, store) = open_temp();
    store.put("static-v1", "a", &entry(200, b"a")).unwrap();
    store.put("dynamic-v1", "b", &entry(200, b"b")).unwrap();
    store.put("dynamic-v2", "c", &entry(200, b"c")).unwrap();

    let mut names = store.list_generations().unwrap();
    names.sort();
    assert_eq!(names, vec!["dynamic-v1", "dynamic-v2", "static-v1"]);

    store.delete_generation("dynamic-v1").unwrap();
    assert!(store.get("dynamic-v1", "b").unwrap().is_none());
    assert_eq!(store.list_generations().unwrap().len(), 2);
  }

  #[test]
  fn test_delete_missing_generation_is_noop() {
    let (_dir, store) = open_temp();
    store.delete_generation("never-existed").unwrap();
    assert!(store.list_generations().unwrap().is_empty());
  }
}
