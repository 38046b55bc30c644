//! Request and response descriptors used across the agent.

use chrono::Utc;
use sha2::{Digest, Sha256};
use url::Url;

use crate::store::StoredResponse;

/// What kind of resource a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  /// Top-level document / navigation
  Document,
  /// Subresource (script, style, image, API call, ...)
  Asset,
}

/// An outbound request as seen by the interception layer.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
  pub method: String,
  pub url: Url,
  pub target: Target,
  pub accept: Option<String>,
}

impl RequestDescriptor {
  /// A GET request for the given URL.
  pub fn get(url: Url, target: Target) -> Self {
    Self {
      method: "GET".to_string(),
      url,
      target,
      accept: None,
    }
  }

  pub fn with_method(mut self, method: &str) -> Self {
    self.method = method.to_string();
    self
  }

  pub fn with_accept(mut self, accept: &str) -> Self {
    self.accept = Some(accept.to_string());
    self
  }

  pub fn is_get(&self) -> bool {
    self.method.eq_ignore_ascii_case("GET")
  }

  /// Whether this request is for a top-level document. The target type wins;
  /// an HTML accept header is treated the same way.
  pub fn is_document(&self) -> bool {
    self.target == Target::Document
      || self
        .accept
        .as_deref()
        .is_some_and(|a| a.contains("text/html"))
  }

  /// Canonical cache key for this request: SHA-256 of method + URL.
  ///
  /// The URL is already normalized by the `url` crate; hashing gives stable,
  /// fixed-length keys.
  pub fn cache_key(&self) -> String {
    let input = format!("{}:{}", self.method.to_uppercase(), self.url);

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }
}

/// How a response was delivered relative to the application origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
  /// Same-origin response
  Basic,
  /// Cross-origin response
  Cors,
}

/// A response freshly fetched from the network.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub delivery: Delivery,
}

impl FetchedResponse {
  /// Storage eligibility for the same-origin strategies: exactly 200 and
  /// same-origin delivery.
  pub fn is_storable_basic(&self) -> bool {
    self.status == 200 && self.delivery == Delivery::Basic
  }

  /// Storage eligibility for cross-origin responses: any 2xx, except the
  /// authentication-sensitive statuses which are never stored.
  pub fn is_storable_external(&self) -> bool {
    (200..300).contains(&self.status) && self.status != 401 && self.status != 403
  }

  /// Snapshot this response for the cache store.
  pub fn to_stored(&self) -> StoredResponse {
    StoredResponse {
      status: self.status,
      headers: self.headers.clone(),
      body: self.body.clone(),
      stored_at: Utc::now(),
    }
  }
}

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Live network response
  Network,
  /// Replayed cache snapshot
  Cache,
  /// Synthesized offline stub
  OfflineStub,
}

impl ResponseSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseSource::Network => "network",
      ResponseSource::Cache => "cache",
      ResponseSource::OfflineStub => "offline",
    }
  }
}

/// The response handed back to the application for an intercepted request.
#[derive(Debug, Clone)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub source: ResponseSource,
}

impl Response {
  pub fn from_network(fetched: FetchedResponse) -> Self {
    Self {
      status: fetched.status,
      headers: fetched.headers,
      body: fetched.body,
      source: ResponseSource::Network,
    }
  }

  pub fn from_stored(stored: StoredResponse) -> Self {
    Self {
      status: stored.status,
      headers: stored.headers,
      body: stored.body,
      source: ResponseSource::Cache,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fetched(status: u16, delivery: Delivery) -> FetchedResponse {
    FetchedResponse {
      status,
      headers: Vec::new(),
      body: Vec::new(),
      delivery,
    }
  }

  #[test]
  fn test_cache_key_is_stable_and_method_sensitive() {
    let url = Url::parse("https://app.example/api/items").unwrap();
    let a = RequestDescriptor::get(url.clone(), Target::Asset);
    let b = RequestDescriptor::get(url.clone(), Target::Asset);
    let c = RequestDescriptor::get(url, Target::Asset).with_method("HEAD");

    assert_eq!(a.cache_key(), b.cache_key());
    assert_ne!(a.cache_key(), c.cache_key());
  }

  #[test]
  fn test_document_detection_via_accept_header() {
    let url = Url::parse("https://app.example/page").unwrap();
    let req = RequestDescriptor::get(url, Target::Asset).with_accept("text/html,*/*");
    assert!(req.is_document());
  }

  #[test]
  fn test_storable_basic_requires_200_same_origin() {
    assert!(fetched(200, Delivery::Basic).is_storable_basic());
    assert!(!fetched(200, Delivery::Cors).is_storable_basic());
    assert!(!fetched(204, Delivery::Basic).is_storable_basic());
    assert!(!fetched(404, Delivery::Basic).is_storable_basic());
  }

  #[test]
  fn test_storable_external_excludes_auth_failures() {
    assert!(fetched(200, Delivery::Cors).is_storable_external());
    assert!(fetched(204, Delivery::Cors).is_storable_external());
    assert!(!fetched(301, Delivery::Cors).is_storable_external());
    assert!(!fetched(401, Delivery::Cors).is_storable_external());
    assert!(!fetched(403, Delivery::Cors).is_storable_external());
    assert!(!fetched(500, Delivery::Cors).is_storable_external());
  }
}
