use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pricewatch_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

struct FieldSources<'a> {
    file_doc: Option<Value>,
    file_path: Option<PathBuf>,
    options: &'a LoadOptions,
}

impl FieldSources<'_> {
    fn line(&self, key: &str, value: &str, env_keys: &[&str], overridden: bool) -> String {
        format!("- {key} = {value} (source: {})", self.source(key, env_keys, overridden))
    }

    fn source(&self, key_path: &str, env_keys: &[&str], overridden: bool) -> String {
        if overridden {
            return "cli flag".to_string();
        }

        for env_key in env_keys {
            if env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false) {
                return format!("env ({env_key})");
            }
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let file_path = detect_config_path(options.config_path.as_deref());
    let sources = FieldSources {
        file_doc: load_config_file_doc(file_path.as_deref()),
        file_path,
        options,
    };

    CommandResult::plain(0, render(&config, &sources))
}

fn render(config: &AppConfig, sources: &FieldSources<'_>) -> String {
    let overrides = &sources.options.overrides;
    let mut lines =
        vec!["effective config (source precedence: cli flag > env > file > default):".to_string()];

    lines.push(sources.line(
        "catalog.path",
        &config.catalog.path.display().to_string(),
        &["PRICEWATCH_CATALOG_PATH"],
        overrides.catalog_path.is_some(),
    ));

    let url_template = if config.source.is_configured() {
        config.source.url_template.as_str()
    } else {
        "<unset>"
    };
    lines.push(sources.line(
        "source.url_template",
        url_template,
        &["PRICEWATCH_SOURCE_URL_TEMPLATE"],
        overrides.source_url_template.is_some(),
    ));
    lines.push(sources.line(
        "source.api_key",
        &redact(config.source.api_key.as_ref()),
        &["PRICEWATCH_SOURCE_API_KEY"],
        false,
    ));
    lines.push(sources.line(
        "source.user_agent",
        &config.source.user_agent,
        &["PRICEWATCH_SOURCE_USER_AGENT"],
        false,
    ));
    lines.push(sources.line(
        "source.timeout_secs",
        &config.source.timeout_secs.to_string(),
        &["PRICEWATCH_SOURCE_TIMEOUT_SECS"],
        false,
    ));
    lines.push(sources.line(
        "source.max_concurrency",
        &config.source.max_concurrency.to_string(),
        &["PRICEWATCH_SOURCE_MAX_CONCURRENCY"],
        overrides.source_max_concurrency.is_some(),
    ));

    lines.push(sources.line(
        "telegram.enabled",
        &config.telegram.enabled.to_string(),
        &["PRICEWATCH_TELEGRAM_ENABLED"],
        overrides.telegram_enabled.is_some(),
    ));
    lines.push(sources.line(
        "telegram.bot_token",
        &redact_bot_token(config.telegram.bot_token.as_ref()),
        &["PRICEWATCH_TELEGRAM_BOT_TOKEN"],
        false,
    ));
    lines.push(sources.line(
        "telegram.chat_id",
        config.telegram.chat_id.as_deref().unwrap_or("<unset>"),
        &["PRICEWATCH_TELEGRAM_CHAT_ID"],
        false,
    ));
    lines.push(sources.line(
        "telegram.api_base_url",
        &config.telegram.api_base_url,
        &["PRICEWATCH_TELEGRAM_API_BASE_URL"],
        false,
    ));
    lines.push(sources.line(
        "telegram.currency_symbol",
        &config.telegram.currency_symbol,
        &["PRICEWATCH_TELEGRAM_CURRENCY_SYMBOL"],
        false,
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["PRICEWATCH_LOGGING_LEVEL", "PRICEWATCH_LOG_LEVEL"],
        overrides.log_level.is_some(),
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        &["PRICEWATCH_LOGGING_FORMAT", "PRICEWATCH_LOG_FORMAT"],
        false,
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("pricewatch.toml"), PathBuf::from("config/pricewatch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if secret.expose_secret().trim().is_empty() => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}

/// Bot tokens look like `<bot id>:<secret>`; the id is safe to show.
fn redact_bot_token(token: Option<&SecretString>) -> String {
    let Some(token) = token else {
        return "<unset>".to_string();
    };
    let trimmed = token.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact, redact_bot_token};

    #[test]
    fn bot_token_keeps_only_the_bot_id() {
        let token = SecretString::from("123456:AAE-super-secret".to_string());

        assert_eq!(redact_bot_token(Some(&token)), "123456:***");
        assert_eq!(redact_bot_token(None), "<unset>");
    }

    #[test]
    fn api_key_is_fully_redacted() {
        let key = SecretString::from("abc".to_string());

        assert_eq!(redact(Some(&key)), "<redacted>");
        assert_eq!(redact(None), "<unset>");
    }

    #[test]
    fn dotted_paths_walk_nested_tables() {
        let doc: toml::Value =
            "[telegram]\nenabled = true\n".parse().expect("valid toml document");

        assert!(contains_path(&doc, "telegram.enabled"));
        assert!(!contains_path(&doc, "telegram.chat_id"));
        assert!(!contains_path(&doc, "source.url_template"));
    }
}
