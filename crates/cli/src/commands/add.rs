use chrono::Utc;
use pricewatch_core::config::LoadOptions;
use pricewatch_core::{ApplicationError, Barcode};
use serde_json::json;

use crate::commands::{load_config, with_catalog, CommandResult};

const COMMAND: &str = "add";

pub fn run(options: &LoadOptions, barcode: &str, name: Option<&str>) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let barcode = match Barcode::parse(barcode) {
        Ok(barcode) => barcode,
        Err(error) => {
            return CommandResult::from_application_error(COMMAND, &ApplicationError::from(error))
        }
    };

    let result = with_catalog(COMMAND, &config, |catalog| {
        let record = catalog.register(barcode, name, Utc::now())?;
        Ok((record.barcode().clone(), record.display_name().to_owned(), catalog.len()))
    });

    match result {
        Ok((barcode, display_name, total)) => CommandResult::success_with_data(
            COMMAND,
            format!("registered {display_name} ({barcode}); catalog now holds {total} products"),
            Some(json!({ "barcode": barcode, "status": "pending", "total": total })),
        ),
        Err(result) => result,
    }
}
