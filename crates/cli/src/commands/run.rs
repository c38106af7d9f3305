use std::sync::Arc;

use anyhow::{Context, Result};
use pricewatch_core::config::{AppConfig, LoadOptions};
use pricewatch_core::{
    ApplicationError, Notifier, PriceFetcher, RunError, RunOrchestrator, RunSummary,
};
use pricewatch_source::HttpPriceFetcher;
use pricewatch_store::JsonFileCatalogStore;
use pricewatch_telegram::build_notifier;
use tracing::warn;

use crate::commands::{
    load_config, to_data, CommandResult, EXIT_CATALOG_LOAD, EXIT_PERSISTENCE, EXIT_RUNTIME_INIT,
};

const COMMAND: &str = "run";

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    if let Err(error) = config.source.require_endpoint() {
        return CommandResult::from_application_error(COMMAND, &ApplicationError::from(error));
    }

    let (fetcher, notifier) = match build_integrations(&config) {
        Ok(integrations) => integrations,
        Err(error) => {
            let error = ApplicationError::Integration(format!("{error:#}"));
            return CommandResult::from_application_error(COMMAND, &error);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME_INIT,
            )
        }
    };

    let store = Arc::new(JsonFileCatalogStore::new(&config.catalog.path));
    let orchestrator =
        RunOrchestrator::new(store, fetcher, notifier, config.source.run_settings());

    match runtime.block_on(orchestrator.run_until(shutdown_signal())) {
        Ok(summary) => {
            CommandResult::success_with_data(COMMAND, describe(&summary), to_data(&summary))
        }
        Err(error) => run_failure(error),
    }
}

fn run_failure(error: RunError) -> CommandResult {
    let message = error.to_string();
    match error {
        RunError::Load(_) => {
            CommandResult::failure(COMMAND, "catalog_load", message, EXIT_CATALOG_LOAD)
        }
        RunError::Persistence { summary, .. } => CommandResult::failure_with_data(
            COMMAND,
            "persistence",
            message,
            EXIT_PERSISTENCE,
            to_data(&summary),
        ),
    }
}

fn build_integrations(config: &AppConfig) -> Result<(Arc<dyn PriceFetcher>, Arc<dyn Notifier>)> {
    let fetcher =
        HttpPriceFetcher::from_config(&config.source).context("price source initialization")?;
    let notifier =
        build_notifier(&config.telegram).context("telegram notifier initialization")?;
    Ok((Arc::new(fetcher), notifier))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "cli.run.signal_unavailable",
            error = %error,
            "ctrl-c handler unavailable; run will not be interruptible"
        );
        std::future::pending::<()>().await;
    }
}

fn describe(summary: &RunSummary) -> String {
    let mut message = format!(
        "run {}: {} products, {} initialized, {} unchanged, {} changed, {} failed",
        summary.run_id,
        summary.total,
        summary.counts.initialized,
        summary.counts.unchanged,
        summary.counts.changed,
        summary.counts.no_change,
    );
    if summary.cancelled {
        message.push_str(&format!(" (cancelled, {} skipped)", summary.skipped));
    }
    message
}
