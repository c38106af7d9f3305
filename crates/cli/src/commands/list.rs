use pricewatch_core::config::LoadOptions;
use pricewatch_core::{Catalog, Direction, ProductRecord};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::{load_catalog, load_config, to_data, CommandResult};

const COMMAND: &str = "list";

#[derive(Serialize)]
struct ListEntry<'a> {
    #[serde(flatten)]
    record: &'a ProductRecord,
    variation_pct: Option<Decimal>,
    direction: Option<Direction>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match load_catalog(COMMAND, &config) {
        Ok(catalog) => catalog,
        Err(result) => return result,
    };

    if json_output {
        let entries: Vec<ListEntry<'_>> = catalog
            .iter()
            .map(|record| ListEntry {
                record,
                variation_pct: record.variation_pct(),
                direction: record.direction(),
            })
            .collect();
        return CommandResult::success_with_data(
            COMMAND,
            format!("{} products", catalog.len()),
            to_data(&entries),
        );
    }

    CommandResult::plain(0, render_human(&catalog))
}

fn render_human(catalog: &Catalog) -> String {
    if catalog.is_empty() {
        return "catalog is empty; register products with `pricewatch add <barcode>`".to_string();
    }

    let mut lines = vec![format!("{} products", catalog.len())];
    for record in catalog {
        let price = match record.current_price() {
            Some(price) => price.to_string(),
            None => "-".to_string(),
        };
        let variation = match record.variation_pct() {
            Some(pct) => format!(" ({pct}%)"),
            None => String::new(),
        };
        let error = match record.last_error() {
            Some(kind) => format!(" [last error: {}]", kind.as_str()),
            None => String::new(),
        };
        lines.push(format!(
            "- {} {} [{}] {price}{variation}{error}",
            record.barcode(),
            record.display_name(),
            record.status().as_str(),
        ));
    }
    lines.join("\n")
}
