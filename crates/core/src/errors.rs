use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::product::Barcode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    NotFound,
    Timeout,
    MalformedResponse,
    TransientNetwork,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed_response",
            Self::TransientNetwork => "transient_network",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("product not found at price source")]
    NotFound,
    #[error("price fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed price source response: {0}")]
    MalformedResponse(String),
    #[error("transient network failure: {0}")]
    TransientNetwork(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::NotFound => FetchErrorKind::NotFound,
            Self::Timeout(_) => FetchErrorKind::Timeout,
            Self::MalformedResponse(_) => FetchErrorKind::MalformedResponse,
            Self::TransientNetwork(_) => FetchErrorKind::TransientNetwork,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("barcode `{0}` is already registered")]
    DuplicateIdentifier(Barcode),
    #[error("invalid barcode `{0}`: expected ASCII digits only")]
    InvalidBarcode(String),
    #[error("barcode `{0}` is not registered")]
    UnknownBarcode(Barcode),
    #[error("record `{barcode}` violates an invariant: {reason}")]
    InvariantViolation { barcode: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog storage I/O failed at `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("catalog at `{location}` is corrupt: {reason}")]
    Corrupt { location: String, reason: String },
    #[error("catalog could not be serialized: {0}")]
    Serialize(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Catalog(CatalogError::DuplicateIdentifier(_)) => "duplicate_identifier",
            Self::Catalog(CatalogError::UnknownBarcode(_)) => "unknown_barcode",
            Self::Catalog(_) => "invalid_input",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Integration(_) => 3,
            Self::Persistence(_) => 5,
            Self::Catalog(_) => 6,
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}
