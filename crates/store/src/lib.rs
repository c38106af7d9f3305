pub mod document;
pub mod json_file;

pub use document::{CatalogDocument, DocumentError, CATALOG_FORMAT_VERSION};
pub use json_file::JsonFileCatalogStore;
