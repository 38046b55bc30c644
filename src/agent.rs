//! The interception entry point: classify, dispatch a strategy, recover.

use color_eyre::Result;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::net::classify::classify;
use crate::net::client::Fetcher;
use crate::net::types::{RequestDescriptor, Response, Target};
use crate::store::{CacheStore, GenerationSet};
use crate::strategy::{self, Strategy};

/// The agent as seen by the application: every outbound request goes through
/// `intercept`, which resolves to a response for all intercepted requests no
/// matter what the network does.
pub struct Agent<S: ?Sized, F> {
  store: Arc<S>,
  gens: GenerationSet,
  origin: Url,
  bundle_prefix: String,
  app_shell_key: String,
  fetcher: F,
}

impl<S: CacheStore + ?Sized, F: Fetcher> Agent<S, F> {
  pub fn new(
    store: Arc<S>,
    gens: GenerationSet,
    origin: Url,
    bundle_prefix: String,
    app_shell: &str,
    fetcher: F,
  ) -> Result<Self> {
    // Last-resort fallback for navigations: the cached root document.
    let shell_url = origin.join(app_shell)?;
    let app_shell_key = RequestDescriptor::get(shell_url, Target::Document).cache_key();

    Ok(Self {
      store,
      gens,
      origin,
      bundle_prefix,
      app_shell_key,
      fetcher,
    })
  }

  /// Intercept an outbound request.
  ///
  /// GET requests always resolve to a response (live, cached, or the offline
  /// stub). Non-GET requests pass through untouched, so their network errors
  /// surface to the caller as-is.
  pub async fn intercept(&self, req: &RequestDescriptor) -> Result<Response> {
    let class = classify(req, &self.origin, &self.bundle_prefix);

    let Some(strategy) = Strategy::for_class(class) else {
      debug!(method = %req.method, url = %req.url, "passthrough");
      let fetched = self.fetcher.fetch(req).await?;
      return Ok(Response::from_network(fetched));
    };

    debug!(url = %req.url, ?class, ?strategy, "intercepted");

    let fetch = self.fetcher.fetch(req);
    let response = strategy::run(
      strategy,
      req,
      self.store.as_ref(),
      &self.gens,
      &self.app_shell_key,
      move || fetch,
    )
    .await;

    Ok(response)
  }
}
