use pricewatch_core::config::LoadOptions;
use pricewatch_core::{ApplicationError, Barcode};
use serde_json::json;

use crate::commands::{load_config, with_catalog, CommandResult};

const COMMAND: &str = "remove";

pub fn run(options: &LoadOptions, barcode: &str) -> CommandResult {
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
        let removed = catalog.remove(&barcode)?;
        Ok((removed.display_name().to_owned(), removed.history().len()))
    });

    match result {
        Ok((display_name, history_len)) => CommandResult::success_with_data(
            COMMAND,
            format!("removed {display_name} ({barcode}) and {history_len} history entries"),
            Some(json!({ "barcode": barcode, "history_entries": history_len })),
        ),
        Err(result) => result,
    }
}
