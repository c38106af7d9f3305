use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::price::{variation_pct, Direction, PricePoint};
use crate::errors::{CatalogError, FetchErrorKind};

/// Product identifier: the retail barcode (EAN/GTIN or a shorter internal code).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Barcode(String);

impl Barcode {
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(CatalogError::InvalidBarcode(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|byte| byte.is_ascii_digit())
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Barcode {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    Pending,
    Monitoring,
    Error,
}

impl PriceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Monitoring => "monitoring",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "monitoring" => Some(Self::Monitoring),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One tracked product.
///
/// Price fields and history are only mutated by [`crate::engine::apply_fetch`];
/// everything else reads through the accessors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub(crate) barcode: Barcode,
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) current_price: Option<Decimal>,
    pub(crate) previous_price: Option<Decimal>,
    pub(crate) status: PriceStatus,
    #[serde(default)]
    pub(crate) history: Vec<PricePoint>,
    #[serde(default)]
    pub(crate) last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) last_error: Option<FetchErrorKind>,
    pub(crate) created_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn new(barcode: Barcode, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            barcode,
            name: name.into().trim().to_owned(),
            current_price: None,
            previous_price: None,
            status: PriceStatus::Pending,
            history: Vec::new(),
            last_checked_at: None,
            last_error: None,
            created_at,
        }
    }

    pub fn barcode(&self) -> &Barcode {
        &self.barcode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name for human-facing output; falls back to the barcode while enrichment is pending.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.barcode.as_str()
        } else {
            &self.name
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into().trim().to_owned();
    }

    pub fn current_price(&self) -> Option<Decimal> {
        self.current_price
    }

    pub fn previous_price(&self) -> Option<Decimal> {
        self.previous_price
    }

    pub fn status(&self) -> PriceStatus {
        self.status
    }

    pub fn history(&self) -> &[PricePoint] {
        &self.history
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at
    }

    pub fn last_error(&self) -> Option<FetchErrorKind> {
        self.last_error
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn variation_pct(&self) -> Option<Decimal> {
        variation_pct(self.previous_price?, self.current_price?)
    }

    pub fn direction(&self) -> Option<Direction> {
        Direction::between(self.previous_price?, self.current_price?)
    }

    pub fn check_invariants(&self) -> Result<(), CatalogError> {
        let violation = |reason: &str| CatalogError::InvariantViolation {
            barcode: self.barcode.as_str().to_owned(),
            reason: reason.to_owned(),
        };

        if !self.barcode.is_well_formed() {
            return Err(violation("barcode must be non-empty ASCII digits"));
        }

        if self.history.windows(2).any(|pair| pair[1].observed_at < pair[0].observed_at) {
            return Err(violation("history is not in chronological order"));
        }

        if self.history.iter().any(|point| point.price < Decimal::ZERO) {
            return Err(violation("history contains a negative price"));
        }

        let last = self.history.last().map(|point| point.price);
        if self.current_price != last {
            return Err(violation("current price does not match the latest history entry"));
        }

        let second_to_last = self.history.iter().rev().nth(1).map(|point| point.price);
        if self.previous_price != second_to_last {
            return Err(violation("previous price does not match the preceding history entry"));
        }

        if self.history.is_empty() && self.status == PriceStatus::Monitoring {
            return Err(violation("monitoring status requires at least one observed price"));
        }

        if !self.history.is_empty() && self.status == PriceStatus::Pending {
            return Err(violation("pending status cannot carry observed prices"));
        }

        Ok(())
    }
}
