//! Bencode, the self-describing binary dictionary format used by torrent files.
//!
//! Payloads decode into a [`Value`] tree, get edited in place, and encode back.
//! Dictionaries are kept in a `BTreeMap` keyed by raw bytes, so encoding always
//! emits keys in the byte-lexicographic order the format requires.

mod decode;
mod encode;
mod value;

pub use decode::decode;
pub use encode::encode;
pub use value::Value;
