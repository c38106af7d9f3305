use pricewatch_core::config::{AppConfig, LoadOptions};
use pricewatch_core::CatalogStore;
use pricewatch_store::JsonFileCatalogStore;
use serde::Serialize;

use crate::commands::{runtime, CommandResult, EXIT_FAILURE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_FAILURE };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::plain(exit_code, output);
    }

    CommandResult::plain(exit_code, render_human(&report))
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_source(&config));
            checks.push(check_telegram(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_readable", "source_endpoint", "telegram_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let runtime = match runtime("doctor") {
        Ok(runtime) => runtime,
        Err(_) => {
            return DoctorCheck {
                name: "catalog_readable",
                status: CheckStatus::Fail,
                details: "failed to initialize async runtime".to_string(),
            };
        }
    };

    let store = JsonFileCatalogStore::new(&config.catalog.path);
    match runtime.block_on(store.load()) {
        Ok(catalog) if !store.path().exists() => DoctorCheck {
            name: "catalog_readable",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` does not exist yet; it is created on the first save ({} products)",
                store.location(),
                catalog.len()
            ),
        },
        Ok(catalog) => DoctorCheck {
            name: "catalog_readable",
            status: CheckStatus::Pass,
            details: format!("`{}` holds {} products", store.location(), catalog.len()),
        },
        Err(error) => DoctorCheck {
            name: "catalog_readable",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_source(config: &AppConfig) -> DoctorCheck {
    match config.source.require_endpoint() {
        Ok(url_template) => DoctorCheck {
            name: "source_endpoint",
            status: CheckStatus::Pass,
            details: format!("fetching from `{url_template}`"),
        },
        Err(error) => DoctorCheck {
            name: "source_endpoint",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_telegram(config: &AppConfig) -> DoctorCheck {
    if !config.telegram.enabled {
        return DoctorCheck {
            name: "telegram_readiness",
            status: CheckStatus::Skipped,
            details: "telegram disabled; price changes are only logged".to_string(),
        };
    }

    DoctorCheck {
        name: "telegram_readiness",
        status: CheckStatus::Pass,
        details: "bot token and chat id validated by config contract".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
