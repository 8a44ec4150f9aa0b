//! Periodic refresh: fetch the upstream feed, transform it, publish it.
//!
//! Refreshing is best effort. Any failure is logged and the previously
//! published feed keeps being served until a later cycle succeeds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cache::store;
use crate::context::Context;
use crate::error::RefreshError;
use crate::feed::FeedTransformer;

/// Time between refresh cycles.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How a refresh attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Published,
  Failed,
  /// Another cycle was still running
  Skipped,
}

pub struct Refresher {
  ctx: Arc<Context>,
  running: AtomicBool,
}

/// Clears the running flag when a cycle ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

impl Refresher {
  pub fn new(ctx: Arc<Context>) -> Self {
    Self {
      ctx,
      running: AtomicBool::new(false),
    }
  }

  /// Refresh now and then every [`REFRESH_INTERVAL`], forever.
  ///
  /// Each cycle runs as its own task so that a tick arriving during a slow
  /// cycle is seen, and skipped, rather than queued behind it.
  pub async fn run(self: Arc<Self>) {
    self.run_every(REFRESH_INTERVAL).await
  }

  /// Refresh now and then every `period`. The first tick fires immediately.
  async fn run_every(self: Arc<Self>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;
      let this = Arc::clone(&self);
      tokio::spawn(async move {
        this.refresh().await;
      });
    }
  }

  /// Run one refresh cycle unless one is already in progress.
  pub async fn refresh(&self) -> Outcome {
    if self
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      warn!("previous refresh still running, skipping this one");
      return Outcome::Skipped;
    }
    let _running = RunningGuard(&self.running);

    info!(url = %self.ctx.config.remote_rss, "refreshing feed");
    match self.cycle().await {
      Ok(bytes) => {
        info!(bytes, "published refreshed feed");
        Outcome::Published
      }
      Err(e) => {
        warn!(error = %e, "refresh failed, keeping the previous feed");
        Outcome::Failed
      }
    }
  }

  async fn cycle(&self) -> Result<usize, RefreshError> {
    let ctx = &self.ctx;

    let raw = ctx.client.get_bytes(&ctx.config.remote_rss).await?;

    let original = ctx.layout.original_feed_path();
    store::write_atomic(&original, &raw)
      .await
      .map_err(|source| RefreshError::Storage {
        path: original.clone(),
        source,
      })?;

    let published = FeedTransformer::new(&ctx.cache, &ctx.config)
      .transform(&raw)
      .await?;

    let snapshot = ctx
      .snapshot
      .publish(published)
      .await
      .map_err(|source| RefreshError::Storage {
        path: ctx.snapshot.path().clone(),
        source,
      })?;

    Ok(snapshot.body.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Config, Settings};
  use crate::feed::document::Rss;
  use tempfile::TempDir;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  const TORRENT: &[u8] = b"d8:announce30:http://x/tracker.php//announce4:infod4:name1:aee";

  async fn context(dir: &TempDir, server: &MockServer) -> Arc<Context> {
    let config = Config::from_settings(Settings {
      remote_rss: Some(format!("{}/rss.xml", server.uri())),
      tracker_id: Some("T1".to_string()),
      cookie_uid: Some("u".to_string()),
      cookie_usess: Some("s".to_string()),
      base_url: Some("http://mirror.example".to_string()),
      cache_dir: Some(dir.path().to_path_buf()),
      ..Settings::default()
    })
    .unwrap();
    Arc::new(Context::new(config).await.unwrap())
  }

  async fn serve_feed(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("GET"))
      .and(path("/rss.xml"))
      .respond_with(ResponseTemplate::new(status).set_body_string(body))
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn test_publishes_feed() {
    let server = MockServer::start().await;
    let feed = format!(
      "<rss version=\"2.0\"><channel><title>t</title><link>l</link><description>d</description>\
       <item><title>A</title><category>1080p</category><pubDate>now</pubDate>\
       <link>{}/dl/?id=5</link></item></channel></rss>",
      server.uri()
    );
    serve_feed(&server, 200, &feed).await;
    Mock::given(method("GET"))
      .and(path("/dl/"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(TORRENT.to_vec()))
      .mount(&server)
      .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server).await;
    let refresher = Refresher::new(Arc::clone(&ctx));

    assert_eq!(refresher.refresh().await, Outcome::Published);

    let snapshot = ctx.snapshot.current().await.unwrap();
    let rss = Rss::parse(&snapshot.body).unwrap();
    assert_eq!(rss.channel.items.len(), 1);
    assert_eq!(
      rss.channel.items[0].link,
      "http://mirror.example/torrents/5.torrent"
    );
    assert_eq!(
      std::fs::read(ctx.layout.original_feed_path()).unwrap(),
      feed.as_bytes()
    );
    assert!(!refresher.running.load(Ordering::Acquire));
  }

  #[tokio::test]
  async fn test_unparsable_feed_keeps_snapshot() {
    let server = MockServer::start().await;
    serve_feed(&server, 200, "<html>maintenance</html>").await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server).await;
    ctx.snapshot.publish(b"previous".to_vec()).await.unwrap();

    let refresher = Refresher::new(Arc::clone(&ctx));
    assert_eq!(refresher.refresh().await, Outcome::Failed);

    assert_eq!(&ctx.snapshot.current().await.unwrap().body[..], b"previous");
    assert_eq!(
      std::fs::read(ctx.layout.published_feed_path()).unwrap(),
      b"previous"
    );
  }

  #[tokio::test]
  async fn test_fetch_failure_keeps_snapshot() {
    let server = MockServer::start().await;
    serve_feed(&server, 503, "").await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server).await;
    ctx.snapshot.publish(b"previous".to_vec()).await.unwrap();

    let refresher = Refresher::new(Arc::clone(&ctx));
    assert_eq!(refresher.refresh().await, Outcome::Failed);
    assert_eq!(&ctx.snapshot.current().await.unwrap().body[..], b"previous");
    assert!(!ctx.layout.original_feed_path().exists());
  }

  async fn feed_hits(server: &MockServer) -> usize {
    server
      .received_requests()
      .await
      .unwrap()
      .iter()
      .filter(|r| r.url.path() == "/rss.xml")
      .count()
  }

  #[tokio::test]
  async fn test_schedule_refreshes_at_start_then_every_period() {
    let server = MockServer::start().await;
    serve_feed(&server, 200, "<rss version=\"2.0\"><channel><title>t</title></channel></rss>").await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server).await;
    let refresher = Arc::new(Refresher::new(Arc::clone(&ctx)));

    // Real time, since the mock server is reached over real sockets.
    let period = Duration::from_secs(1);
    let task = tokio::spawn(Arc::clone(&refresher).run_every(period));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(feed_hits(&server).await, 1);
    assert!(ctx.snapshot.current().await.is_some());

    tokio::time::sleep(period).await;
    assert_eq!(feed_hits(&server).await, 2);

    task.abort();
  }

  #[tokio::test]
  async fn test_overlapping_refresh_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rss.xml"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel></channel></rss>"))
      .expect(0)
      .mount(&server)
      .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(&dir, &server).await;
    let refresher = Refresher::new(ctx);

    refresher.running.store(true, Ordering::Release);
    assert_eq!(refresher.refresh().await, Outcome::Skipped);
    // The skipped call must not clear the flag owned by the running cycle.
    assert!(refresher.running.load(Ordering::Acquire));
  }
}
