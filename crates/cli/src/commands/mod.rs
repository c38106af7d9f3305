pub mod add;
pub mod config;
pub mod doctor;
pub mod import;
pub mod list;
pub mod remove;
pub mod run;

use pricewatch_core::config::{AppConfig, LoadOptions};
use pricewatch_core::{ApplicationError, Catalog, CatalogStore};
use pricewatch_store::JsonFileCatalogStore;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME_INIT: u8 = 3;
pub const EXIT_CATALOG_LOAD: u8 = 4;
pub const EXIT_PERSISTENCE: u8 = 5;
pub const EXIT_INPUT: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_application_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }

    pub fn plain(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::from_application_error(command, &ApplicationError::from(error))
    })
}

pub(crate) fn runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME_INIT,
        )
    })
}

pub(crate) fn load_catalog(command: &str, config: &AppConfig) -> Result<Catalog, CommandResult> {
    let store = JsonFileCatalogStore::new(&config.catalog.path);
    runtime(command)?.block_on(store.load()).map_err(|error| {
        CommandResult::failure(command, "catalog_load", error.to_string(), EXIT_CATALOG_LOAD)
    })
}

/// Load, mutate and save the catalog once; nothing is written when `mutate` fails.
pub(crate) fn with_catalog<T>(
    command: &str,
    config: &AppConfig,
    mutate: impl FnOnce(&mut Catalog) -> Result<T, ApplicationError>,
) -> Result<T, CommandResult> {
    let store = JsonFileCatalogStore::new(&config.catalog.path);
    let runtime = runtime(command)?;

    let mut catalog = runtime.block_on(store.load()).map_err(|error| {
        CommandResult::failure(command, "catalog_load", error.to_string(), EXIT_CATALOG_LOAD)
    })?;

    let value = mutate(&mut catalog)
        .map_err(|error| CommandResult::from_application_error(command, &error))?;

    runtime.block_on(store.save(&catalog)).map_err(|error| {
        CommandResult::from_application_error(command, &ApplicationError::from(error))
    })?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use pricewatch_core::config::ConfigError;
    use pricewatch_core::{ApplicationError, Barcode, CatalogError};
    use serde_json::{json, Value};

    use super::{CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_RUNTIME_INIT};

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("valid json")
    }

    #[test]
    fn success_payload_omits_absent_data() {
        let result = CommandResult::success("add", "added 1");
        let payload = parse(&result.output);

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn application_error_maps_class_and_exit_code() {
        let error = ApplicationError::from(CatalogError::DuplicateIdentifier(
            Barcode::parse("789").expect("barcode"),
        ));
        let result = CommandResult::from_application_error("add", &error);
        let payload = parse(&result.output);

        assert_eq!(result.exit_code, EXIT_INPUT);
        assert_eq!(payload["error_class"], "duplicate_identifier");
    }

    #[test]
    fn config_and_integration_errors_keep_their_exit_codes() {
        let config = ApplicationError::from(ConfigError::Validation("bad level".to_owned()));
        let integration = ApplicationError::Integration("client build failed".to_owned());

        let config = CommandResult::from_application_error("run", &config);
        let integration = CommandResult::from_application_error("run", &integration);

        assert_eq!(config.exit_code, EXIT_CONFIG);
        assert_eq!(parse(&config.output)["error_class"], "config_validation");
        assert_eq!(integration.exit_code, EXIT_RUNTIME_INIT);
        assert_eq!(parse(&integration.output)["error_class"], "integration");
    }

    #[test]
    fn data_is_embedded_verbatim() {
        let result = CommandResult::success_with_data("list", "1 product", Some(json!([1, 2])));

        assert_eq!(parse(&result.output)["data"], json!([1, 2]));
    }
}
