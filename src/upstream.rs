//! HTTP client for the upstream site.
//!
//! The site authenticates by session cookie, so every request replays the two
//! configured cookie values.

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use reqwest::{
  header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT},
  Client,
};
use tracing::debug;

use crate::config::Credentials;
use crate::error::FetchError;

/// Upstream client wrapper
#[derive(Clone)]
pub struct UpstreamClient {
  client: Client,
}

impl UpstreamClient {
  pub fn new(credentials: &Credentials) -> Result<Self> {
    let mut headers = HeaderMap::new();

    let cookie = format!("uid={}; usess={}", credentials.uid, credentials.usess);
    let mut cookie =
      HeaderValue::from_str(&cookie).map_err(|e| eyre!("Invalid cookie value: {}", e))?;
    cookie.set_sensitive(true);
    headers.insert(COOKIE, cookie);
    headers.insert(
      USER_AGENT,
      HeaderValue::from_static(concat!("feedmirror/", env!("CARGO_PKG_VERSION"))),
    );

    let client = Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }

  /// GET `url` and return the body of a successful response.
  pub async fn get_bytes(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
    let request_error = |source| FetchError::Request {
      url: url.to_string(),
      source,
    };

    debug!(url, "GET");
    let response = self.client.get(url).send().await.map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status,
      });
    }

    response.bytes().await.map_err(request_error)
  }
}
