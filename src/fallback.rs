//! Fallback chain: the terminal error boundary for intercepted requests.
//!
//! Invoked only after a network attempt has failed. Producers are tried in
//! order (exact cached match, cached app-shell document for navigations,
//! synthesized offline stub) and the chain itself never fails.

use tracing::{debug, warn};

use crate::net::types::{RequestDescriptor, Response, ResponseSource};
use crate::store::{CacheStore, GenerationSet};

/// Status of the synthesized offline stub.
pub const OFFLINE_STATUS: u16 = 503;

/// Resolve a response for a request whose network fetch failed.
pub fn recover<S>(
  req: &RequestDescriptor,
  store: &S,
  gens: &GenerationSet,
  app_shell_key: &str,
) -> Response
where
  S: CacheStore + ?Sized,
{
  let key = req.cache_key();

  if let Some(stored) = lookup(store, gens, &key) {
    debug!(url = %req.url, "serving cached entry after network failure");
    return Response::from_stored(stored);
  }

  // Navigations degrade to the cached app shell so the application can boot
  // offline even for routes never fetched before.
  if req.is_document() {
    if let Some(stored) = lookup(store, gens, app_shell_key) {
      debug!(url = %req.url, "serving app shell after network failure");
      return Response::from_stored(stored);
    }
  }

  debug!(url = %req.url, "no cached answer, serving offline stub");
  offline_stub()
}

/// Exact-match lookup across the current generations. Store errors count as
/// misses; this path must not fail.
fn lookup<S>(store: &S, gens: &GenerationSet, key: &str) -> Option<crate::store::StoredResponse>
where
  S: CacheStore + ?Sized,
{
  for generation in gens.lookup_order() {
    match store.get(generation, key) {
      Ok(Some(stored)) => return Some(stored),
      Ok(None) => {}
      Err(e) => warn!(generation, "fallback cache lookup failed: {}", e),
    }
  }
  None
}

fn offline_stub() -> Response {
  Response {
    status: OFFLINE_STATUS,
    headers: vec![("content-type".to_string(), "text/plain".to_string())],
    body: b"Service temporarily unavailable".to_vec(),
    source: ResponseSource::OfflineStub,
  }
}
