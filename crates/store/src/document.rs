use pricewatch_core::{Catalog, CatalogError, ProductRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CATALOG_FORMAT_VERSION: u32 = 1;

/// On-disk shape of the catalog: `{ "version": 1, "products": [...] }`.
#[derive(Debug, Deserialize)]
pub struct CatalogDocument {
    pub version: u32,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    version: u32,
    products: &'a [ProductRecord],
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported catalog format version {found} (expected {CATALOG_FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl CatalogDocument {
    /// Decodes stored bytes. Blank input is an empty catalog, never an error.
    pub fn decode(bytes: &[u8]) -> Result<Catalog, DocumentError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Catalog::new());
        }

        let document: CatalogDocument = serde_json::from_slice(bytes)?;
        if document.version != CATALOG_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion { found: document.version });
        }

        Ok(Catalog::from_records(document.products)?)
    }

    pub fn encode(catalog: &Catalog) -> Result<Vec<u8>, serde_json::Error> {
        let document =
            CatalogDocumentRef { version: CATALOG_FORMAT_VERSION, products: catalog.records() };
        let mut bytes = serde_json::to_vec_pretty(&document)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
