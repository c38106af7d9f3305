use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::product::{Barcode, ProductRecord};
use crate::errors::CatalogError;

/// In-memory catalog keyed by barcode; iteration follows registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<ProductRecord>,
    index: HashMap<Barcode, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchEntry {
    pub barcode: Barcode,
    pub name: Option<String>,
}

impl BatchEntry {
    pub fn new(barcode: Barcode) -> Self {
        Self { barcode, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub added: Vec<Barcode>,
    pub skipped: Vec<Barcode>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from persisted records, rejecting duplicates and invariant violations.
    pub fn from_records(records: Vec<ProductRecord>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for record in records {
            catalog.add(record)?;
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, barcode: &Barcode) -> bool {
        self.index.contains_key(barcode)
    }

    pub fn get(&self, barcode: &Barcode) -> Option<&ProductRecord> {
        self.index.get(barcode).map(|position| &self.records[*position])
    }

    pub(crate) fn get_mut(&mut self, barcode: &Barcode) -> Option<&mut ProductRecord> {
        let position = *self.index.get(barcode)?;
        self.records.get_mut(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn barcodes(&self) -> impl Iterator<Item = &Barcode> {
        self.records.iter().map(ProductRecord::barcode)
    }

    pub fn add(&mut self, record: ProductRecord) -> Result<(), CatalogError> {
        if self.index.contains_key(record.barcode()) {
            return Err(CatalogError::DuplicateIdentifier(record.barcode().clone()));
        }
        record.check_invariants()?;

        self.index.insert(record.barcode().clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Registers a new `pending` product.
    pub fn register(
        &mut self,
        barcode: Barcode,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<&ProductRecord, CatalogError> {
        self.add(ProductRecord::new(barcode, name.unwrap_or_default(), now))?;
        Ok(&self.records[self.records.len() - 1])
    }

    /// Adds every entry whose barcode is new; existing barcodes are skipped, never merged.
    pub fn upsert_batch<I>(&mut self, entries: I, now: DateTime<Utc>) -> BatchReport
    where
        I: IntoIterator<Item = BatchEntry>,
    {
        let mut report = BatchReport::default();

        for entry in entries {
            if self.contains(&entry.barcode) {
                info!(
                    event_name = "catalog.import.skipped_duplicate",
                    barcode = %entry.barcode,
                    "barcode already registered; keeping existing record"
                );
                report.skipped.push(entry.barcode);
                continue;
            }

            let record =
                ProductRecord::new(entry.barcode.clone(), entry.name.unwrap_or_default(), now);
            self.index.insert(entry.barcode.clone(), self.records.len());
            self.records.push(record);
            report.added.push(entry.barcode);
        }

        report
    }

    pub fn remove(&mut self, barcode: &Barcode) -> Result<ProductRecord, CatalogError> {
        let position = self
            .index
            .remove(barcode)
            .ok_or_else(|| CatalogError::UnknownBarcode(barcode.clone()))?;
        let record = self.records.remove(position);

        for (offset, later) in self.records[position..].iter().enumerate() {
            self.index.insert(later.barcode().clone(), position + offset);
        }
        Ok(record)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ProductRecord;
    type IntoIter = std::slice::Iter<'a, ProductRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
