//! In-memory cache store backend.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::{CacheStore, StoredResponse};

/// HashMap-backed store. Used by tests and as a no-disk mode when the agent
/// runs without a writable data directory.
#[derive(Default)]
pub struct MemoryStore {
  generations: Mutex<HashMap<String, HashMap<String, StoredResponse>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryStore {
  fn get(&self, generation: &str, key: &str) -> Result<Option<StoredResponse>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(
      generations
        .get(generation)
        .and_then(|entries| entries.get(key))
        .cloned(),
    )
  }

  fn put(&self, generation: &str, key: &str, response: &StoredResponse) -> Result<()> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    generations
      .entry(generation.to_string())
      .or_default()
      .insert(key.to_string(), response.clone());

    Ok(())
  }

  fn delete_generation(&self, name: &str) -> Result<()> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    generations.remove(name);
    Ok(())
  }

  fn list_generations(&self) -> Result<Vec<String>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(generations.keys().cloned().collect())
  }
}
