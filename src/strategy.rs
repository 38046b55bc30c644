//! Caching strategies and their dispatch.
//!
//! Each strategy takes the request, the cache store, and an injected fetcher
//! closure, and always resolves to a response: network failures are funneled
//! into the fallback chain, never surfaced to the caller.

use color_eyre::Result;
use std::future::Future;
use tracing::{debug, warn};

use crate::fallback;
use crate::net::classify::RequestClass;
use crate::net::types::{FetchedResponse, RequestDescriptor, Response};
use crate::store::{CacheStore, GenerationSet};

/// The strategy applied to an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Live content first; cache is the safety net
  NetworkFirst,
  /// Cached content first; network only on miss
  CacheFirst,
  /// Cross-origin: network always, cache opportunistically
  ExternalOpportunistic,
}

impl Strategy {
  /// Strategy selection by request class. `None` means the request is not
  /// intercepted at all.
  pub fn for_class(class: RequestClass) -> Option<Strategy> {
    match class {
      RequestClass::Passthrough => None,
      RequestClass::DocumentOrBundle => Some(Strategy::NetworkFirst),
      RequestClass::StaticAsset => Some(Strategy::CacheFirst),
      RequestClass::CrossOrigin => Some(Strategy::ExternalOpportunistic),
    }
  }
}

/// Run a strategy for a request.
///
/// The fetcher is injected the same way across strategies so tests can drive
/// them without a live network.
pub async fn run<S, F, Fut>(
  strategy: Strategy,
  req: &RequestDescriptor,
  store: &S,
  gens: &GenerationSet,
  app_shell_key: &str,
  fetch: F,
) -> Response
where
  S: CacheStore + ?Sized,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<FetchedResponse>>,
{
  match strategy {
    Strategy::NetworkFirst => network_first(req, store, gens, app_shell_key, fetch).await,
    Strategy::CacheFirst => cache_first(req, store, gens, app_shell_key, fetch).await,
    Strategy::ExternalOpportunistic => {
      external_opportunistic(req, store, gens, app_shell_key, fetch).await
    }
  }
}

/// Network-first: fetch live, store a 200 same-origin response into the
/// dynamic generation, fall back to cache when the network fails.
async fn network_first<S, F, Fut>(
  req: &RequestDescriptor,
  store: &S,
  gens: &GenerationSet,
  app_shell_key: &str,
  fetch: F,
) -> Response
where
  S: CacheStore + ?Sized,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<FetchedResponse>>,
{
  match fetch().await {
    Ok(fetched) => {
      if fetched.is_storable_basic() {
        store_best_effort(store, gens.dynamic_name(), &req.cache_key(), &fetched);
      }
      Response::from_network(fetched)
    }
    Err(e) => {
      debug!(url = %req.url, "network-first fetch failed: {}", e);
      fallback::recover(req, store, gens, app_shell_key)
    }
  }
}

/// Cache-first: serve a cached entry without touching the network; on miss,
/// fetch and store like network-first.
async fn cache_first<S, F, Fut>(
  req: &RequestDescriptor,
  store: &S,
  gens: &GenerationSet,
  app_shell_key: &str,
  fetch: F,
) -> Response
where
  S: CacheStore + ?Sized,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<FetchedResponse>>,
{
  let key = req.cache_key();

  for generation in gens.lookup_order() {
    match store.get(generation, &key) {
      Ok(Some(stored)) => return Response::from_stored(stored),
      Ok(None) => {}
      Err(e) => warn!(generation, "cache lookup failed: {}", e),
    }
  }

  match fetch().await {
    Ok(fetched) => {
      if fetched.is_storable_basic() {
        store_best_effort(store, gens.dynamic_name(), &key, &fetched);
      }
      Response::from_network(fetched)
    }
    Err(e) => {
      debug!(url = %req.url, "cache-first fetch failed: {}", e);
      fallback::recover(req, store, gens, app_shell_key)
    }
  }
}

/// External-opportunistic: cross-origin resources are never served from
/// cache ahead of the network. Successful responses are stored as a side
/// effect; the live response is returned regardless of cache outcome.
async fn external_opportunistic<S, F, Fut>(
  req: &RequestDescriptor,
  store: &S,
  gens: &GenerationSet,
  app_shell_key: &str,
  fetch: F,
) -> Response
where
  S: CacheStore + ?Sized,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<FetchedResponse>>,
{
  match fetch().await {
    Ok(fetched) => {
      if fetched.is_storable_external() {
        store_best_effort(store, gens.dynamic_name(), &req.cache_key(), &fetched);
      }
      Response::from_network(fetched)
    }
    Err(e) => {
      debug!(url = %req.url, "external fetch failed: {}", e);
      fallback::recover(req, store, gens, app_shell_key)
    }
  }
}

/// Write an entry, swallowing storage failures. Caching is best-effort; the
/// live response must reach the application even when the store is full or
/// unavailable.
fn store_best_effort<S>(store: &S, generation: &str, key: &str, fetched: &FetchedResponse)
where
  S: CacheStore + ?Sized,
{
  if let Err(e) = store.put(generation, key, &fetched.to_stored()) {
    warn!(generation, key, "cache store failed: {}", e);
  }
}
