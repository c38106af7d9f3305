use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pricewatch_core::{Catalog, CatalogStore, StoreError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::CatalogDocument;

/// Catalog persisted as a single pretty-printed JSON document.
///
/// Each save writes a uniquely named sibling `*.<uuid>.tmp` file, flushes it to
/// disk and renames it over the target, so readers see either the old or the
/// new catalog and overlapping writers never share a temp file.
#[derive(Clone, Debug)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
}

impl JsonFileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog".to_owned());
        self.path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io { path: path.to_path_buf(), source }
    }
}

#[async_trait]
impl CatalogStore for JsonFileCatalogStore {
    async fn load(&self) -> Result<Catalog, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!(
                    event_name = "store.catalog_absent",
                    path = %self.path.display(),
                    "catalog file not found; starting with an empty catalog"
                );
                return Ok(Catalog::new());
            }
            Err(error) => return Err(Self::io_error(&self.path, error)),
        };

        let catalog = CatalogDocument::decode(&bytes).map_err(|error| StoreError::Corrupt {
            location: self.location(),
            reason: error.to_string(),
        })?;

        debug!(
            event_name = "store.catalog_loaded",
            path = %self.path.display(),
            records = catalog.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let bytes = CatalogDocument::encode(catalog)
            .map_err(|error| StoreError::Serialize(error.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| Self::io_error(parent, error))?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &bytes)
            .await
            .map_err(|error| Self::io_error(&temp_path, error))?;

        let written = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&temp_path)
            .await
            .map_err(|error| Self::io_error(&temp_path, error))?;
        written.sync_all().await.map_err(|error| Self::io_error(&temp_path, error))?;
        drop(written);

        if let Err(error) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Self::io_error(&self.path, error));
        }

        debug!(
            event_name = "store.catalog_saved",
            path = %self.path.display(),
            records = catalog.len(),
            bytes = bytes.len(),
            "catalog saved"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
