//! Core trait and types for the generation-versioned cache store.

use chrono::{DateTime, Utc};
use color_eyre::Result;

/// A stored response snapshot: enough of a response to replay it later.
///
/// Entries are keyed by the canonical request key (see
/// `RequestDescriptor::cache_key`) and overwritten in place on re-fetch
/// (last-write-wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
  /// HTTP status code of the original response
  pub status: u16,
  /// Headers sufficient to replay the response
  pub headers: Vec<(String, String)>,
  /// Response body bytes
  pub body: Vec<u8>,
  /// When the snapshot was written
  pub stored_at: DateTime<Utc>,
}

/// Trait for cache store backends.
///
/// Entries are grouped into named generations. A generation is never mutated
/// structurally: it is created on first write and only ever dropped whole via
/// `delete_generation` (the activation GC sweep).
pub trait CacheStore: Send + Sync {
  /// Look up an entry by key within a generation.
  fn get(&self, generation: &str, key: &str) -> Result<Option<StoredResponse>>;

  /// Write an entry under a key within a generation, creating the generation
  /// if needed. Overwrites any previous entry under the same key.
  fn put(&self, generation: &str, key: &str, response: &StoredResponse) -> Result<()>;

  /// Drop a generation and all of its entries.
  fn delete_generation(&self, name: &str) -> Result<()>;

  /// List the names of all generations present in the store.
  fn list_generations(&self) -> Result<Vec<String>>;
}
