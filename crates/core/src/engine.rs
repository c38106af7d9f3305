//! Price update engine: applies one fetch result to one product record.
//!
//! Outcome rules:
//! - fetch failure: status becomes `error`, prices and history untouched (`NoChange`)
//! - first observed price: history seeded, status `monitoring` (`Initialized`)
//! - same price as current: nothing appended (`Unchanged`)
//! - different price: previous/current shift, history appended (`Changed`)
//!
//! Only `Changed` produces a notification event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::change::ChangeEvent;
use crate::domain::price::{normalize_price, variation_pct, Direction, PricePoint};
use crate::domain::product::{PriceStatus, ProductRecord};
use crate::errors::{FetchError, FetchErrorKind};
use crate::fetch::{FetchResult, FetchedPrice};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Initialized,
    Unchanged,
    Changed,
    NoChange,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::NoChange => "no_change",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Initialized { price: Decimal },
    Unchanged { price: Decimal },
    Changed(ChangeEvent),
    NoChange { error: FetchError },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Initialized { .. } => OutcomeKind::Initialized,
            Self::Unchanged { .. } => OutcomeKind::Unchanged,
            Self::Changed(_) => OutcomeKind::Changed,
            Self::NoChange { .. } => OutcomeKind::NoChange,
        }
    }

    pub fn notification(&self) -> Option<&ChangeEvent> {
        match self {
            Self::Changed(event) => Some(event),
            _ => None,
        }
    }

    pub fn fetch_error_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::NoChange { error } => Some(error.kind()),
            _ => None,
        }
    }
}

pub fn apply_fetch(record: &mut ProductRecord, result: FetchResult, now: DateTime<Utc>) -> Outcome {
    record.last_checked_at = Some(now);

    let fetched = match result.and_then(validate) {
        Ok(fetched) => fetched,
        Err(error) => {
            record.status = PriceStatus::Error;
            record.last_error = Some(error.kind());
            return Outcome::NoChange { error };
        }
    };

    record.status = PriceStatus::Monitoring;
    record.last_error = None;
    if record.name.is_empty() {
        if let Some(name) = fetched.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            record.name = name.to_owned();
        }
    }

    let price = normalize_price(fetched.price);
    let observed_at = match record.history.last() {
        Some(last) if last.observed_at > now => last.observed_at,
        _ => now,
    };

    let Some(current) = record.current_price else {
        record.current_price = Some(price);
        record.previous_price = None;
        record.history.push(PricePoint { observed_at, price });
        return Outcome::Initialized { price };
    };

    let Some(direction) = Direction::between(current, price) else {
        return Outcome::Unchanged { price };
    };

    record.previous_price = Some(current);
    record.current_price = Some(price);
    record.history.push(PricePoint { observed_at, price });

    Outcome::Changed(ChangeEvent {
        barcode: record.barcode.clone(),
        name: record.name.clone(),
        previous_price: current,
        current_price: price,
        variation_pct: variation_pct(current, price),
        direction,
        observed_at,
    })
}

fn validate(fetched: FetchedPrice) -> FetchResult {
    if fetched.price < Decimal::ZERO {
        return Err(FetchError::MalformedResponse(format!(
            "negative price {} reported by source",
            fetched.price
        )));
    }
    Ok(fetched)
}
