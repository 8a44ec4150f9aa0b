//! Upstream feed → published feed.
//!
//! Items are filtered by quality, resolved to an identity, cached, and given a
//! link into the local torrent cache. A failure on one item only drops that
//! item; only an unparsable upstream document fails the whole transform.

use futures::{future, stream, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use super::document::{Item, Rss};
use crate::cache::{CacheSource, ItemCache};
use crate::config::Config;
use crate::error::TransformError;
use crate::identity::Identity;

pub const PUBLISHED_TITLE: &str = "Lostfilm RSS";
pub const PUBLISHED_LINK: &str = "https://github.com/te4gh0st/GoLostfilmRSS";

pub struct FeedTransformer<'a> {
  cache: &'a ItemCache,
  ignore_quality: &'a [String],
  base_url: &'a str,
  port: u16,
  concurrency: usize,
}

impl<'a> FeedTransformer<'a> {
  pub fn new(cache: &'a ItemCache, config: &'a Config) -> Self {
    Self {
      cache,
      ignore_quality: &config.ignore_quality,
      base_url: &config.base_url,
      port: config.port,
      concurrency: config.concurrency.max(1),
    }
  }

  /// Turn a raw upstream document into the bytes of the feed to publish.
  pub async fn transform(&self, raw: &[u8]) -> Result<Vec<u8>, TransformError> {
    let mut rss = Rss::parse(raw)?;

    let upstream_items = std::mem::take(&mut rss.channel.items);
    let total = upstream_items.len();

    let candidates: Vec<(Item, Identity)> = upstream_items
      .into_iter()
      .filter_map(|item| self.admit(item))
      .collect();

    // `buffered` yields results in input order, so surviving items keep their order.
    rss.channel.items = stream::iter(candidates)
      .map(|(item, identity)| self.publish(item, identity))
      .buffered(self.concurrency)
      .filter_map(future::ready)
      .collect()
      .await;

    info!(
      total,
      published = rss.channel.items.len(),
      "feed transformed"
    );

    rss.channel.title = PUBLISHED_TITLE.to_string();
    rss.channel.link = PUBLISHED_LINK.to_string();

    Ok(rss.to_xml()?.into_bytes())
  }

  /// Apply the quality filter and resolve the item's identity.
  fn admit(&self, item: Item) -> Option<(Item, Identity)> {
    if let Some(quality) = self
      .ignore_quality
      .iter()
      .find(|q| item.categories.iter().any(|c| c.contains(q.as_str())))
    {
      debug!(
        title = %item.title,
        categories = ?item.categories,
        %quality,
        "ignoring item"
      );
      return None;
    }

    match Identity::from_link(&item.link) {
      Some(identity) => Some((item, identity)),
      None => {
        debug!(title = %item.title, link = %item.link, "no id in item link, dropping");
        None
      }
    }
  }

  async fn publish(&self, mut item: Item, identity: Identity) -> Option<Item> {
    match self.cache.ensure(&identity, &item.link).await {
      Ok(cached) => {
        if cached.source == CacheSource::Fetched {
          info!(%identity, title = %item.title, path = %cached.path.display(), "cached torrent");
        }
      }
      Err(e) => {
        warn!(%identity, title = %item.title, error = %e, "failed to cache torrent, dropping item");
        return None;
      }
    }

    item.link = local_link(self.base_url, self.port, &identity);
    Some(item)
  }
}

/// Public URL of the cached torrent for `identity`.
///
/// Falls back to `http://localhost:<port>` when `base_url` is not a usable base.
pub fn local_link(base_url: &str, port: u16, identity: &Identity) -> String {
  let file_name = identity.file_name();

  let joined = Url::parse(base_url).ok().and_then(|mut url| {
    url
      .path_segments_mut()
      .ok()?
      .pop_if_empty()
      .extend(["torrents", file_name.as_str()]);
    Some(url)
  });

  match joined {
    Some(url) => url.to_string(),
    None => {
      warn!(base_url, "unusable BASE_URL, linking to localhost");
      format!("http://localhost:{}/torrents/{}", port, file_name)
    }
  }
}
