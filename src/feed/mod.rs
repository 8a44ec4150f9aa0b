pub mod document;
mod transform;

pub use transform::FeedTransformer;
