use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

const DEFAULT_PORT: u16 = 80;
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_CONCURRENCY: usize = 4;

/// Raw, possibly partial settings as read from a config file or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  pub remote_rss: Option<String>,
  pub tracker_id: Option<String>,
  pub cookie_uid: Option<String>,
  pub cookie_usess: Option<String>,
  pub ignore_quality: Option<Vec<String>>,
  pub port: Option<u16>,
  pub base_url: Option<String>,
  pub cache_dir: Option<PathBuf>,
  pub concurrency: Option<usize>,
}

impl Settings {
  /// Layer `over` on top of `self`; values present in `over` win.
  pub fn merge(self, over: Settings) -> Settings {
    Settings {
      remote_rss: over.remote_rss.or(self.remote_rss),
      tracker_id: over.tracker_id.or(self.tracker_id),
      cookie_uid: over.cookie_uid.or(self.cookie_uid),
      cookie_usess: over.cookie_usess.or(self.cookie_usess),
      ignore_quality: over.ignore_quality.or(self.ignore_quality),
      port: over.port.or(self.port),
      base_url: over.base_url.or(self.base_url),
      cache_dir: over.cache_dir.or(self.cache_dir),
      concurrency: over.concurrency.or(self.concurrency),
    }
  }
}

/// Session cookies replayed to the upstream site.
#[derive(Clone)]
pub struct Credentials {
  pub uid: String,
  pub usess: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("uid", &self.uid)
      .field("usess", &"<redacted>")
      .finish()
  }
}

/// Validated service configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Config {
  /// Upstream RSS feed
  pub remote_rss: String,
  /// Tracker id substituted into announce URLs
  pub tracker_id: String,
  pub credentials: Credentials,
  /// Items whose category contains any of these are dropped (case-sensitive)
  pub ignore_quality: Vec<String>,
  pub port: u16,
  /// Public address the republished links point at
  pub base_url: String,
  pub cache_dir: PathBuf,
  /// Torrent downloads in flight per refresh cycle
  pub concurrency: usize,
}

impl Config {
  /// Load configuration.
  ///
  /// File search order:
  /// 1. Explicit path if provided
  /// 2. ./feedmirror.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/feedmirror/config.yaml
  ///
  /// A missing file is fine as long as `overrides` (command line and
  /// environment) supply the required settings.
  pub fn load(explicit_path: Option<&Path>, overrides: Settings) -> Result<Self> {
    let file = match explicit_path {
      Some(p) if p.exists() => Self::load_from_path(p)?,
      Some(p) => return Err(eyre!("Config file not found: {}", p.display())),
      None => match Self::find_config_file() {
        Some(p) => Self::load_from_path(&p)?,
        None => Settings::default(),
      },
    };

    Self::from_settings(file.merge(overrides))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("feedmirror.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("feedmirror").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Settings> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Validate settings and fill in defaults.
  pub fn from_settings(settings: Settings) -> Result<Self> {
    let remote_rss = required(settings.remote_rss, "REMOTE_RSS")?;
    let tracker_id = required(settings.tracker_id, "TRACKER_ID")?;
    let uid = required(settings.cookie_uid, "COOKIE_UID")?;
    let usess = required(settings.cookie_usess, "COOKIE_USESS")?;

    Url::parse(&remote_rss).map_err(|e| eyre!("Invalid REMOTE_RSS '{}': {}", remote_rss, e))?;

    let port = settings.port.unwrap_or(DEFAULT_PORT);

    let base_url = match settings.base_url.filter(|s| !s.trim().is_empty()) {
      Some(url) => url,
      None => {
        let fallback = format!("http://localhost:{}", port);
        warn!(
          base_url = %fallback,
          "BASE_URL not set; set it if the server is reachable from elsewhere"
        );
        fallback
      }
    };

    let ignore_quality = settings
      .ignore_quality
      .unwrap_or_default()
      .into_iter()
      .map(|q| q.trim().to_string())
      .filter(|q| !q.is_empty())
      .collect();

    Ok(Config {
      remote_rss,
      tracker_id,
      credentials: Credentials { uid, usess },
      ignore_quality,
      port,
      base_url,
      cache_dir: settings
        .cache_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
      concurrency: settings.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
    })
  }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
  value
    .filter(|v| !v.trim().is_empty())
    .ok_or_else(|| eyre!("Invalid configuration: {} is required", name))
}
