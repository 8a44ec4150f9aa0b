//! RSS document model.
//!
//! Only the fields the mirror republishes are modelled; anything else in the
//! upstream document is dropped on parse. Items and categories may be
//! interleaved with other elements (`overlapped-lists`).

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn default_version() -> String {
  "2.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "rss")]
pub struct Rss {
  #[serde(rename = "@version", default = "default_version")]
  pub version: String,
  pub channel: Channel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub link: String,
  #[serde(default)]
  pub description: String,
  #[serde(rename = "item", default)]
  pub items: Vec<Item>,
}

/// A feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub link: String,
  /// Quality tags, e.g. "WEB-DL 1080p"
  #[serde(rename = "category", default)]
  pub categories: Vec<String>,
  #[serde(rename = "pubDate", default)]
  pub pub_date: String,
}

impl Rss {
  pub fn parse(raw: &[u8]) -> Result<Self, TransformError> {
    // The deserializer accepts any root element name.
    if let Some(root) = root_element(raw).filter(|root| root != "rss") {
      return Err(TransformError::NotRss { root });
    }
    Ok(quick_xml::de::from_reader(raw)?)
  }

  /// Serialize as an indented XML document.
  pub fn to_xml(&self) -> Result<String, TransformError> {
    let mut body = String::from(XML_DECLARATION);
    let mut ser = quick_xml::se::Serializer::new(&mut body);
    ser.indent(' ', 2);
    self.serialize(ser)?;
    Ok(body)
  }
}

/// Local name of the first element in `raw`, if it gets that far.
fn root_element(raw: &[u8]) -> Option<String> {
  let mut reader = Reader::from_reader(raw);
  let mut buf = Vec::new();
  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
        return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
      }
      Ok(Event::Eof) | Err(_) => return None,
      Ok(_) => {}
    }
    buf.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Upstream</title>
    <link>https://upstream.example/</link>
    <description>New episodes</description>
    <lastBuildDate>Mon, 01 Jan 2024 00:00:00 +0000</lastBuildDate>
    <item>
      <title>Show (S01E01)</title>
      <category><![CDATA[[WEB-DL 1080p]]]></category>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <link>https://upstream.example/dl.php?id=1&amp;k=2</link>
    </item>
    <item>
      <title>Show (S01E02)</title>
      <category>[SD]</category>
      <pubDate>Tue, 02 Jan 2024 00:00:00 +0000</pubDate>
      <link>https://upstream.example/dl.php?id=2</link>
    </item>
  </channel>
</rss>"#;

  #[test]
  fn test_parse() {
    let rss = Rss::parse(SAMPLE.as_bytes()).unwrap();
    assert_eq!(rss.version, "2.0");
    assert_eq!(rss.channel.title, "Upstream");
    assert_eq!(rss.channel.description, "New episodes");
    assert_eq!(rss.channel.items.len(), 2);

    let first = &rss.channel.items[0];
    assert_eq!(first.categories, vec!["[WEB-DL 1080p]"]);
    assert_eq!(first.link, "https://upstream.example/dl.php?id=1&k=2");
    assert_eq!(first.pub_date, "Mon, 01 Jan 2024 00:00:00 +0000");
  }

  #[test]
  fn test_parse_rejects_garbage() {
    assert!(Rss::parse(b"<html><body>maintenance</body></html>").is_err());
    assert!(Rss::parse(b"").is_err());
    assert!(Rss::parse(b"<rss><channel><item></channel></rss>").is_err());
  }

  #[test]
  fn test_parse_rejects_other_root() {
    let result = Rss::parse(b"<?xml version=\"1.0\"?><html><channel><title>t</title></channel></html>");
    assert!(matches!(result, Err(TransformError::NotRss { root }) if root == "html"));
  }

  #[test]
  fn test_items_interleaved_with_channel_elements() {
    let rss = Rss::parse(
      b"<rss version=\"2.0\"><channel><title>t</title>\
        <item><title>one</title><link>http://x/?id=1</link></item>\
        <lastBuildDate>now</lastBuildDate>\
        <item><title>two</title><link>http://x/?id=2</link></item>\
        </channel></rss>",
    )
    .unwrap();
    let titles: Vec<&str> = rss.channel.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["one", "two"]);
  }

  #[test]
  fn test_repeated_categories() {
    let rss = Rss::parse(
      b"<rss><channel><item><category>a</category><title>t</title>\
        <category>SD</category></item></channel></rss>",
    )
    .unwrap();
    assert_eq!(rss.channel.items[0].categories, vec!["a", "SD"]);

    let xml = rss.to_xml().unwrap();
    assert_eq!(Rss::parse(xml.as_bytes()).unwrap(), rss);
  }

  #[test]
  fn test_serialized_document_parses_back() {
    let rss = Rss::parse(SAMPLE.as_bytes()).unwrap();
    let xml = rss.to_xml().unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<rss version=\"2.0\">"));
    assert!(xml.contains("&amp;"));
    assert_eq!(Rss::parse(xml.as_bytes()).unwrap(), rss);
  }

  #[test]
  fn test_empty_channel() {
    let rss = Rss::parse(b"<rss><channel><title>t</title></channel></rss>").unwrap();
    assert!(rss.channel.items.is_empty());
    assert_eq!(rss.version, "2.0");
  }
}
