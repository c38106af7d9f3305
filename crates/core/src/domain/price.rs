use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currency precision applied to every stored or compared price.
pub const PRICE_SCALE: u32 = 2;

/// Precision of the derived variation percentage.
pub const VARIATION_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub observed_at: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// Returns `None` when both prices are equal.
    pub fn between(previous: Decimal, current: Decimal) -> Option<Self> {
        if current > previous {
            Some(Self::Increase)
        } else if current < previous {
            Some(Self::Decrease)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

/// Rounds to cents and fixes the scale, so `29.9` is stored as `29.90`.
pub fn normalize_price(value: Decimal) -> Decimal {
    let mut price =
        value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    price.rescale(PRICE_SCALE);
    price
}

/// Percentage change from `previous` to `current`, rounded to two places.
///
/// Undefined for a zero `previous` price and on arithmetic overflow.
pub fn variation_pct(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }

    let ratio = current.checked_sub(previous)?.checked_div(previous)?;
    let pct = ratio.checked_mul(Decimal::ONE_HUNDRED)?;
    Some(pct.round_dp_with_strategy(VARIATION_SCALE, RoundingStrategy::MidpointAwayFromZero))
}
