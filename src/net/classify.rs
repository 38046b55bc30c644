//! Request classification for strategy selection.

use url::Url;

use super::types::RequestDescriptor;

/// Classification of an outbound request. Decides which caching strategy
/// handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
  /// Non-GET requests are never intercepted
  Passthrough,
  /// Same-origin document/navigation, or a code-bundle URL
  DocumentOrBundle,
  /// Any other same-origin resource
  StaticAsset,
  /// Different origin
  CrossOrigin,
}

/// Classify a request against the application origin and bundle path prefix.
///
/// Rules are applied in order:
/// 1. Non-GET → passthrough
/// 2. Same origin + document target or bundle prefix → document-or-bundle
/// 3. Same origin otherwise → static asset
/// 4. Different origin → cross-origin
pub fn classify(req: &RequestDescriptor, origin: &Url, bundle_prefix: &str) -> RequestClass {
  if !req.is_get() {
    return RequestClass::Passthrough;
  }

  if req.url.origin() != origin.origin() {
    return RequestClass::CrossOrigin;
  }

  if req.is_document() || req.url.path().starts_with(bundle_prefix) {
    return RequestClass::DocumentOrBundle;
  }

  RequestClass::StaticAsset
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::net::types::Target;

  fn origin() -> Url {
    Url::parse("https://app.example").unwrap()
  }

  fn get(path_or_url: &str, target: Target) -> RequestDescriptor {
    let url = if path_or_url.starts_with("http") {
      Url::parse(path_or_url).unwrap()
    } else {
      origin().join(path_or_url).unwrap()
    };
    RequestDescriptor::get(url, target)
  }

  #[test]
  fn test_non_get_is_passthrough() {
    let req = get("/api/save", Target::Asset).with_method("POST");
    assert_eq!(classify(&req, &origin(), "/bundles/"), RequestClass::Passthrough);
  }

  #[test]
  fn test_same_origin_document() {
    let req = get("/", Target::Document);
    assert_eq!(
      classify(&req, &origin(), "/bundles/"),
      RequestClass::DocumentOrBundle
    );
  }

  #[test]
  fn test_same_origin_bundle_prefix() {
    let req = get("/bundles/app.js", Target::Asset);
    assert_eq!(
      classify(&req, &origin(), "/bundles/"),
      RequestClass::DocumentOrBundle
    );
  }

  #[test]
  fn test_same_origin_asset() {
    let req = get("/img/logo.png", Target::Asset);
    assert_eq!(classify(&req, &origin(), "/bundles/"), RequestClass::StaticAsset);
  }

  #[test]
  fn test_cross_origin() {
    let req = get("https://api.other.example/v1/items", Target::Asset);
    assert_eq!(classify(&req, &origin(), "/bundles/"), RequestClass::CrossOrigin);
  }

  #[test]
  fn test_cross_origin_document_is_still_cross_origin() {
    let req = get("https://other.example/", Target::Document);
    assert_eq!(classify(&req, &origin(), "/bundles/"), RequestClass::CrossOrigin);
  }
}
