pub mod catalog;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod notify;
pub mod orchestrator;
pub mod store;

pub use catalog::{BatchEntry, BatchReport, Catalog};
pub use domain::change::ChangeEvent;
pub use domain::price::{Direction, PricePoint};
pub use domain::product::{Barcode, PriceStatus, ProductRecord};
pub use engine::{apply_fetch, Outcome, OutcomeKind};
pub use errors::{
    ApplicationError, CatalogError, DeliveryError, FetchError, FetchErrorKind, StoreError,
};
pub use fetch::{FetchResult, FetchedPrice, PriceFetcher};
pub use notify::{InMemoryNotifier, NoopNotifier, Notifier};
pub use orchestrator::{OutcomeCounts, RunError, RunOrchestrator, RunSettings, RunSummary};
pub use store::{CatalogStore, InMemoryCatalogStore};
