//! Tracker URL substitution inside torrent files.
//!
//! Upstream torrents announce to `.../tracker.php//announce` (or any run of
//! slashes). The mirror pins them to `.../tracker.php/<tracker id>/announce`
//! in both the `announce` field and every tier of `announce-list`.

use lazy_static::lazy_static;
use regex::bytes::{NoExpand, Regex};

use crate::bencode::{self, Value};
use crate::error::PatchError;

lazy_static! {
  static ref TRACKER_PATH: Regex = Regex::new(r"tracker\.php/+announce").unwrap(/* known good */);
}

/// The two headers a torrent whose first key is an `announce*` entry can start with.
const TORRENT_HEADERS: [&[u8]; 2] = [b"d8:announce", b"d10:announce"];

/// Whether `payload` looks like a torrent file rather than, say, an HTML login page.
pub fn looks_like_torrent(payload: &[u8]) -> bool {
  TORRENT_HEADERS
    .iter()
    .any(|header| payload.starts_with(header))
}

/// Rewrites tracker URLs to carry a fixed tracker id.
#[derive(Debug, Clone)]
pub struct TrackerRewriter {
  replacement: Vec<u8>,
}

impl TrackerRewriter {
  pub fn new(tracker_id: &str) -> Self {
    Self {
      replacement: format!("tracker.php/{}/announce", tracker_id).into_bytes(),
    }
  }

  /// Rewrite a single URL. URLs without a tracker path come back unchanged.
  pub fn rewrite_url(&self, url: &[u8]) -> Vec<u8> {
    TRACKER_PATH
      .replace_all(url, NoExpand(&self.replacement))
      .into_owned()
  }

  /// Patch `announce` and `announce-list` of a decoded torrent in place.
  ///
  /// Anything of an unexpected shape is left as it is: a non-string
  /// `announce`, a tier that is not a list, a tier entry that is not a string,
  /// or a top-level value that is not a dictionary at all.
  pub fn patch(&self, torrent: &mut Value) {
    let Some(root) = torrent.as_dict_mut() else {
      return;
    };

    if let Some(announce) = root.get_mut(b"announce".as_slice()) {
      self.patch_url(announce);
    }

    if let Some(Value::List(tiers)) = root.get_mut(b"announce-list".as_slice()) {
      for tier in tiers {
        if let Value::List(urls) = tier {
          for url in urls {
            self.patch_url(url);
          }
        }
      }
    }
  }

  fn patch_url(&self, value: &mut Value) {
    if let Value::Bytes(url) = value {
      *url = self.rewrite_url(url);
    }
  }

  /// Decode, patch and re-encode a raw torrent file.
  pub fn rewrite_torrent(&self, payload: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut torrent = bencode::decode(payload)?;
    self.patch(&mut torrent);
    Ok(bencode::encode(&torrent)?)
  }
}
