//! Read-only HTTP surface: the published feed and the cached torrents.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{
    header::{CONTENT_TYPE, LAST_MODIFIED},
    HeaderValue, StatusCode,
  },
  response::{IntoResponse, Response},
  routing::get,
  Router,
};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::cache::store;
use crate::context::Context;

/// Make the [Router] serving `/rss` and `/torrents/{name}`
pub fn router(ctx: Arc<Context>) -> Router {
  Router::new()
    .route("/rss", get(rss))
    .route("/torrents/{name}", get(torrent))
    .layer(TraceLayer::new_for_http())
    .with_state(ctx)
}

fn http_date(at: DateTime<Utc>) -> String {
  at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn rss(State(ctx): State<Arc<Context>>) -> Response {
  let Some(snapshot) = ctx.snapshot.current().await else {
    warn!("feed requested before the first successful refresh");
    return (StatusCode::INTERNAL_SERVER_ERROR, "RSS not available").into_response();
  };

  let mut response = snapshot.body.clone().into_response();
  let headers = response.headers_mut();
  headers.insert(
    CONTENT_TYPE,
    HeaderValue::from_static("application/xml; charset=utf-8"),
  );
  if let Ok(value) = HeaderValue::from_str(&http_date(snapshot.published_at)) {
    headers.insert(LAST_MODIFIED, value);
  }
  response
}

async fn torrent(State(ctx): State<Arc<Context>>, Path(name): Path<String>) -> Response {
  let Some(path) = ctx.layout.served_torrent_path(&name) else {
    return (StatusCode::BAD_REQUEST, "Invalid file name").into_response();
  };

  debug!(%name, "serving torrent");
  match store::read_if_exists(&path).await {
    Ok(Some(data)) => ([(CONTENT_TYPE, "application/x-bittorrent")], data).into_response(),
    Ok(None) => StatusCode::NOT_FOUND.into_response(),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to read torrent");
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
  }
}
