//! Price extraction from source response bodies.
//!
//! Two shapes are understood: a flat `{ "price": .., "name": .. }` object and
//! the catalog-search shape, an array (or a single product object) where the
//! offer lives at `items[0].sellers[0].commertialOffer`.

use std::str::FromStr;

use pricewatch_core::domain::price::normalize_price;
use pricewatch_core::{FetchError, FetchedPrice};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

const OFFER_POINTER: &str = "/0/sellers/0/commertialOffer";

pub fn extract_offer(body: &Value) -> Result<FetchedPrice, FetchError> {
    match body {
        Value::Array(products) => match products.first() {
            Some(Value::Object(product)) => from_product(product),
            Some(_) => Err(malformed("search result entry is not an object")),
            None => Err(FetchError::NotFound),
        },
        Value::Object(object) => {
            if object.get("is_not_found").and_then(Value::as_bool) == Some(true) {
                return Err(FetchError::NotFound);
            }
            if object.contains_key("price") {
                return from_flat(object);
            }
            from_product(object)
        }
        _ => Err(malformed("expected a JSON object or array")),
    }
}

/// Parses a JSON number or numeric string into a two-place decimal.
///
/// Numbers go through their textual form so `29.9` never picks up binary noise.
pub fn parse_price(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(number) => decimal_from_text(&number.to_string()),
        Value::String(text) => {
            let text = text.trim();
            if text.contains(',') && !text.contains('.') {
                decimal_from_text(&text.replace(',', "."))
            } else {
                decimal_from_text(text)
            }
        }
        _ => None,
    }?;
    Some(normalize_price(parsed))
}

fn decimal_from_text(text: &str) -> Option<Decimal> {
    Decimal::from_str(text).ok().or_else(|| Decimal::from_scientific(text).ok())
}

fn from_flat(object: &Map<String, Value>) -> Result<FetchedPrice, FetchError> {
    let raw = object.get("price").unwrap_or(&Value::Null);
    let price = parse_price(raw)
        .ok_or_else(|| malformed(&format!("`price` is not a decimal value: {raw}")))?;
    Ok(with_optional_name(price, string_field(object, &["name", "productName"])))
}

fn from_product(product: &Map<String, Value>) -> Result<FetchedPrice, FetchError> {
    let offer = product
        .get("items")
        .and_then(|items| items.pointer(OFFER_POINTER))
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("product has no commertialOffer"))?;

    let offer_price =
        ["Price", "price"].iter().find_map(|key| offer.get(*key).and_then(parse_price));
    let price = match offer_price {
        Some(price) if !price.is_zero() => price,
        _ => ["ListPrice", "listPrice"]
            .iter()
            .find_map(|key| offer.get(*key).and_then(parse_price))
            .or(offer_price)
            .ok_or_else(|| malformed("offer carries neither Price nor ListPrice"))?,
    };

    Ok(with_optional_name(price, string_field(product, &["productName", "name"])))
}

fn string_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn with_optional_name(price: Decimal, name: Option<&str>) -> FetchedPrice {
    match name {
        Some(name) => FetchedPrice::new(price).with_name(name),
        None => FetchedPrice::new(price),
    }
}

fn malformed(reason: &str) -> FetchError {
    FetchError::MalformedResponse(reason.to_owned())
}
