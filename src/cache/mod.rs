//! Local cache of patched torrent files and feed snapshots.
//!
//! - `paths`: where everything lives under the cache directory
//! - `store`: atomic file writes
//! - `items`: the idempotent fetch → patch → persist operation per identity

mod items;
mod paths;
pub mod store;

pub use items::{CacheSource, ItemCache};
pub use paths::Layout;
