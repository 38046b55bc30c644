//! HTTP transport for the agent.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use url::Url;

use super::types::{Delivery, FetchedResponse, RequestDescriptor};

/// Abstraction over the network so strategies and lifecycle phases can be
/// driven by fakes in tests.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, req: &RequestDescriptor) -> BoxFuture<'static, Result<FetchedResponse>>;
}

/// Production transport over reqwest.
///
/// No timeout is configured here: the agent reacts to success vs failure of
/// a fetch, and timeout policy belongs to the transport deployment.
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
  origin: Url,
}

impl HttpClient {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  /// Execute a request and snapshot the response.
  pub async fn execute(&self, req: &RequestDescriptor) -> Result<FetchedResponse> {
    let method = reqwest::Method::from_bytes(req.method.as_bytes())
      .map_err(|e| eyre!("Invalid method {}: {}", req.method, e))?;

    let mut builder = self.client.request(method, req.url.clone());
    if let Some(accept) = &req.accept {
      builder = builder.header(reqwest::header::ACCEPT, accept);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Fetch of {} failed: {}", req.url, e))?;

    let status = response.status().as_u16();
    let delivery = if response.url().origin() == self.origin.origin() {
      Delivery::Basic
    } else {
      Delivery::Cors
    };
    let headers: Vec<(String, String)> = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", req.url, e))?
      .to_vec();

    Ok(FetchedResponse {
      status,
      headers,
      body,
      delivery,
    })
  }
}

impl Fetcher for HttpClient {
  fn fetch(&self, req: &RequestDescriptor) -> BoxFuture<'static, Result<FetchedResponse>> {
    let client = self.clone();
    let req = req.clone();
    Box::pin(async move { client.execute(&req).await })
  }
}
