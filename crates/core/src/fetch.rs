use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::product::Barcode;
use crate::errors::FetchError;

/// A successful price lookup. The name is optional enrichment data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedPrice {
    pub price: Decimal,
    pub name: Option<String>,
}

impl FetchedPrice {
    pub fn new(price: Decimal) -> Self {
        Self { price, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

pub type FetchResult = Result<FetchedPrice, FetchError>;

#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self, barcode: &Barcode) -> FetchResult;
}
