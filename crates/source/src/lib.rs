pub mod extract;
pub mod http;

pub use extract::{extract_offer, parse_price};
pub use http::{classify_status, HttpPriceFetcher, SourceInitError};
