pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pricewatch_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pricewatch",
    version,
    about = "Retail price tracking CLI",
    long_about = "Track product prices by barcode, record price history, and notify on changes.",
    after_help = "Examples:\n  pricewatch add 7891000053508 --name \"Cafe Torrado 500g\"\n  pricewatch import barcodes.csv\n  pricewatch run\n  pricewatch list --json\n  pricewatch doctor"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a pricewatch.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override catalog.path")]
    catalog: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Fetch the current price of every product once and notify on changes")]
    Run,
    #[command(about = "Register a product to track")]
    Add {
        barcode: String,
        #[arg(long, help = "Human-readable product name")]
        name: Option<String>,
    },
    #[command(about = "Register products from a text/CSV file with one barcode per line")]
    Import { file: PathBuf },
    #[command(about = "Stop tracking a product and drop its history")]
    Remove { barcode: String },
    #[command(about = "Show tracked products with their current price and variation")]
    List {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog readability, and integration readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                catalog_path: self.catalog.clone(),
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Command output owns stdout; a second init (tests) is ignored.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let logging_config = AppConfig::load(options.clone()).unwrap_or_default();
    init_logging(&logging_config);

    let result = match &cli.command {
        Command::Run => commands::run::run(&options),
        Command::Add { barcode, name } => commands::add::run(&options, barcode, name.as_deref()),
        Command::Import { file } => commands::import::run(&options, file),
        Command::Remove { barcode } => commands::remove::run(&options, barcode),
        Command::List { json } => commands::list::run(&options, *json),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, *json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn global_flags_become_load_options() {
        let cli = Cli::parse_from([
            "pricewatch",
            "add",
            "7891000053508",
            "--name",
            "Cafe",
            "--catalog",
            "/tmp/catalog.json",
            "--config",
            "ops/pricewatch.toml",
        ]);

        let options = cli.load_options();

        assert!(matches!(
            cli.command,
            Command::Add { ref barcode, ref name }
                if barcode == "7891000053508" && name.as_deref() == Some("Cafe")
        ));
        assert_eq!(options.config_path, Some(PathBuf::from("ops/pricewatch.toml")));
        assert!(options.require_file);
        assert_eq!(options.overrides.catalog_path, Some(PathBuf::from("/tmp/catalog.json")));
    }

    #[test]
    fn without_config_flag_the_file_is_optional() {
        let cli = Cli::parse_from(["pricewatch", "list", "--json"]);

        let options = cli.load_options();

        assert!(matches!(cli.command, Command::List { json: true }));
        assert!(!options.require_file);
        assert_eq!(options.config_path, None);
    }
}
