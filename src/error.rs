//! Error types for the feed mirror.
//!
//! Per-entry failures (`CacheError` and everything it wraps) are caught by the
//! feed transformer and only cost the entry. `TransformError` and
//! `RefreshError` abort a refresh cycle, leaving the published snapshot as it was.

use std::path::PathBuf;

use thiserror::Error;

/// Structural failure while decoding a bencoded payload.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("unexpected end of input at offset {offset}")]
  UnexpectedEof { offset: usize },

  #[error("unexpected byte {byte:#04x} at offset {offset}")]
  UnexpectedByte { byte: u8, offset: usize },

  #[error("malformed integer at offset {offset}")]
  InvalidInteger { offset: usize },

  #[error("malformed string length at offset {offset}")]
  InvalidLength { offset: usize },

  #[error("dictionary key at offset {offset} is not a byte string")]
  NonStringKey { offset: usize },

  #[error("duplicate dictionary key at offset {offset}")]
  DuplicateKey { offset: usize },

  #[error("nesting deeper than {limit} levels at offset {offset}")]
  TooDeep { limit: usize, offset: usize },

  #[error("trailing data after top-level value at offset {offset}")]
  TrailingData { offset: usize },
}

/// Failure while writing a bencoded value.
#[derive(Error, Debug)]
pub enum EncodeError {
  #[error("failed to write encoded value: {0}")]
  Io(#[from] std::io::Error),
}

/// Failure of the decode → patch → encode pass over a torrent file.
#[derive(Error, Debug)]
pub enum PatchError {
  #[error("decode failed: {0}")]
  Decode(#[from] DecodeError),

  #[error("encode failed: {0}")]
  Encode(#[from] EncodeError),
}

/// Network or status failure talking to the upstream site.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("request to {url} failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{url} answered with status {status}")]
  Status {
    url: String,
    status: reqwest::StatusCode,
  },
}

/// Failure to cache a single item.
#[derive(Error, Debug)]
pub enum CacheError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("payload for {identity} is not a torrent file")]
  Format { identity: String },

  #[error("failed to patch torrent {identity}: {source}")]
  Patch {
    identity: String,
    #[source]
    source: PatchError,
  },

  #[error("storage error at {}: {source}", path.display())]
  Storage {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Failure to turn an upstream feed document into a publishable one.
#[derive(Error, Debug)]
pub enum TransformError {
  #[error("document root is <{root}>, not <rss>")]
  NotRss { root: String },

  #[error("failed to parse feed: {0}")]
  Parse(#[from] quick_xml::de::DeError),

  #[error("failed to serialize feed: {0}")]
  Serialize(#[from] quick_xml::se::SeError),
}

/// Failure of a whole refresh cycle.
#[derive(Error, Debug)]
pub enum RefreshError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Transform(#[from] TransformError),

  #[error("storage error at {}: {source}", path.display())]
  Storage {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
