use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrator::RunSettings;

pub const BARCODE_PLACEHOLDER: &str = "{barcode}";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub source: SourceConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub url_template: String,
    pub api_key: Option<SecretString>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<SecretString>,
    pub chat_id: Option<String>,
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub currency_symbol: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub source_url_template: Option<String>,
    pub source_max_concurrency: Option<usize>,
    pub telegram_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig { path: PathBuf::from("data/catalog.json") },
            source: SourceConfig {
                url_template: String::new(),
                api_key: None,
                user_agent: concat!("pricewatch/", env!("CARGO_PKG_VERSION")).to_string(),
                timeout_secs: 10,
                max_concurrency: 4,
            },
            telegram: TelegramConfig {
                enabled: false,
                bot_token: None,
                chat_id: None,
                api_base_url: "https://api.telegram.org".to_string(),
                timeout_secs: 10,
                currency_symbol: "R$".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SourceConfig {
    pub fn is_configured(&self) -> bool {
        !self.url_template.trim().is_empty()
    }

    /// Fails with an actionable message when no price source endpoint is set.
    pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
        if !self.is_configured() {
            return Err(ConfigError::Validation(format!(
                "source.url_template is required to fetch prices (for example `https://prices.example.com/api/products/{BARCODE_PLACEHOLDER}`)"
            )));
        }
        Ok(self.url_template.trim())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings { max_concurrency: self.max_concurrency, fetch_timeout: self.timeout() }
    }
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("pricewatch.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = path;
            }
        }

        if let Some(source) = patch.source {
            if let Some(url_template) = source.url_template {
                self.source.url_template = url_template;
            }
            if let Some(source_api_key_value) = source.api_key {
                self.source.api_key = Some(secret_value(source_api_key_value));
            }
            if let Some(user_agent) = source.user_agent {
                self.source.user_agent = user_agent;
            }
            if let Some(timeout_secs) = source.timeout_secs {
                self.source.timeout_secs = timeout_secs;
            }
            if let Some(max_concurrency) = source.max_concurrency {
                self.source.max_concurrency = max_concurrency;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(enabled) = telegram.enabled {
                self.telegram.enabled = enabled;
            }
            if let Some(telegram_bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = Some(secret_value(telegram_bot_token_value));
            }
            if let Some(chat_id) = telegram.chat_id {
                self.telegram.chat_id = Some(chat_id);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(timeout_secs) = telegram.timeout_secs {
                self.telegram.timeout_secs = timeout_secs;
            }
            if let Some(currency_symbol) = telegram.currency_symbol {
                self.telegram.currency_symbol = currency_symbol;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRICEWATCH_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("PRICEWATCH_SOURCE_URL_TEMPLATE") {
            self.source.url_template = value;
        }
        if let Some(value) = read_env("PRICEWATCH_SOURCE_API_KEY") {
            self.source.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PRICEWATCH_SOURCE_USER_AGENT") {
            self.source.user_agent = value;
        }
        if let Some(value) = read_env("PRICEWATCH_SOURCE_TIMEOUT_SECS") {
            self.source.timeout_secs = parse_u64("PRICEWATCH_SOURCE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PRICEWATCH_SOURCE_MAX_CONCURRENCY") {
            self.source.max_concurrency =
                parse_usize("PRICEWATCH_SOURCE_MAX_CONCURRENCY", &value)?;
        }

        if let Some(value) = read_env("PRICEWATCH_TELEGRAM_ENABLED") {
            self.telegram.enabled = parse_bool("PRICEWATCH_TELEGRAM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PRICEWATCH_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("PRICEWATCH_TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(value);
        }
        if let Some(value) = read_env("PRICEWATCH_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("PRICEWATCH_TELEGRAM_TIMEOUT_SECS") {
            self.telegram.timeout_secs = parse_u64("PRICEWATCH_TELEGRAM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PRICEWATCH_TELEGRAM_CURRENCY_SYMBOL") {
            self.telegram.currency_symbol = value;
        }

        let log_level =
            read_env("PRICEWATCH_LOGGING_LEVEL").or_else(|| read_env("PRICEWATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEWATCH_LOGGING_FORMAT").or_else(|| read_env("PRICEWATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = catalog_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(url_template) = overrides.source_url_template {
            self.source.url_template = url_template;
        }
        if let Some(max_concurrency) = overrides.source_max_concurrency {
            self.source.max_concurrency = max_concurrency;
        }
        if let Some(enabled) = overrides.telegram_enabled {
            self.telegram.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_source(&self.source)?;
        validate_telegram(&self.telegram)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pricewatch.toml"), PathBuf::from("config/pricewatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalog.path must not be empty".to_string()));
    }
    if catalog.path.is_dir() {
        return Err(ConfigError::Validation(format!(
            "catalog.path `{}` is a directory; point it at a JSON file",
            catalog.path.display()
        )));
    }
    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.is_configured() {
        let url = source.url_template.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "source.url_template must start with http:// or https://".to_string(),
            ));
        }
        if !url.contains(BARCODE_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "source.url_template must contain the `{BARCODE_PLACEHOLDER}` placeholder"
            )));
        }
    }

    if source.timeout_secs == 0 || source.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "source.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if source.max_concurrency == 0 || source.max_concurrency > 64 {
        return Err(ConfigError::Validation(
            "source.max_concurrency must be in range 1..=64".to_string(),
        ));
    }

    Ok(())
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    if telegram.timeout_secs == 0 || telegram.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "telegram.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if !telegram.api_base_url.starts_with("http://")
        && !telegram.api_base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.enabled {
        let token_missing = telegram
            .bot_token
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if token_missing {
            return Err(ConfigError::Validation(
                "telegram.bot_token is required when telegram.enabled is true. Create a bot with @BotFather to get one".to_string(),
            ));
        }

        let chat_missing =
            telegram.chat_id.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if chat_missing {
            return Err(ConfigError::Validation(
                "telegram.chat_id is required when telegram.enabled is true. Message the bot, then read it from https://api.telegram.org/bot<TOKEN>/getUpdates".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    source: Option<SourcePatch>,
    telegram: Option<TelegramPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SourcePatch {
    url_template: Option<String>,
    api_key: Option<String>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
    max_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    enabled: Option<bool>,
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
    currency_symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
