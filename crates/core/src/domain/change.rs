use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::price::Direction;
use crate::domain::product::Barcode;

/// Emitted for every `Changed` outcome and forwarded to the notification sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub barcode: Barcode,
    pub name: String,
    pub previous_price: Decimal,
    pub current_price: Decimal,
    /// `None` only when the previous price was zero.
    pub variation_pct: Option<Decimal>,
    pub direction: Direction,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.barcode.as_str()
        } else {
            &self.name
        }
    }
}
