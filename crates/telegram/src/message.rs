use pricewatch_core::{ChangeEvent, Direction};
use rust_decimal::{Decimal, RoundingStrategy};

pub const MAX_NAME_CHARS: usize = 40;

/// Renders one change event as a Telegram HTML message.
pub fn render_message(event: &ChangeEvent, currency_symbol: &str) -> String {
    let emoji = match event.direction {
        Direction::Increase => "📈",
        Direction::Decrease => "📉",
    };
    let name: String = event.display_name().chars().take(MAX_NAME_CHARS).collect();
    let variation = match event.variation_pct {
        Some(pct) => format!("{}%", signed_one_place(pct)),
        None => "new".to_owned(),
    };

    format!(
        "{emoji} <b>{name}</b>\n   Price: {symbol} {current} ({variation})\n   Before: {symbol} {previous}",
        name = escape_html(&name),
        symbol = escape_html(currency_symbol),
        current = two_places(event.current_price),
        previous = two_places(event.previous_price),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn two_places(value: Decimal) -> String {
    let mut value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value.to_string()
}

fn signed_one_place(value: Decimal) -> String {
    let mut value = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(1);
    if value.is_zero() {
        value.set_sign_positive(true);
    }
    if value.is_sign_positive() {
        format!("+{value}")
    } else {
        value.to_string()
    }
}
