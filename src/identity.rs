//! Item identities: the numeric `id=` token of an upstream download link.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  static ref LINK_ID: Regex = Regex::new(r"id=(\d+)(?:&|$)").unwrap(/* known good */);
}

/// Numeric identity of a feed item; names its cached torrent file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
  /// Accept a non-empty string of ASCII digits.
  pub fn parse(s: &str) -> Option<Self> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
      Some(Self(s.to_string()))
    } else {
      None
    }
  }

  /// Extract the identity from a link such as `http://host/path?id=123&x=y`.
  ///
  /// The digits must run up to a `&` or the end of the link.
  pub fn from_link(link: &str) -> Option<Self> {
    LINK_ID
      .captures(link)
      .and_then(|caps| caps.get(1))
      .and_then(|m| Self::parse(m.as_str()))
  }

  /// File name of the cached torrent for this identity.
  pub fn file_name(&self) -> String {
    format!("{}.torrent", self.0)
  }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_link() {
    assert_eq!(
      Identity::from_link("http://x/y?id=123&foo=bar"),
      Identity::parse("123")
    );
    assert_eq!(
      Identity::from_link("http://x/v_search.php?a=1&id=98765"),
      Identity::parse("98765")
    );
    assert_eq!(Identity::from_link("http://x/y?foo=bar"), None);
    assert_eq!(Identity::from_link("http://x/y?id=&foo=bar"), None);
    assert_eq!(Identity::from_link("http://x/y?id=12abc"), None);
  }

  #[test]
  fn test_parse() {
    assert_eq!(Identity::parse("42").map(|i| i.file_name()), Some("42.torrent".to_string()));
    assert!(Identity::parse("").is_none());
    assert!(Identity::parse("4/2").is_none());
    assert!(Identity::parse("..").is_none());
  }
}
