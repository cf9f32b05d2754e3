mod document;
mod store;

pub use document::PartDocument;
pub use store::{AssetSource, AssetStore};
