//! Workshop Fetcher CLI application
//!
//! Command-line interface for downloading Steam Workshop items with SteamCMD
//! and checking installed mods for updates.

use std::process;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use workshop_fetcher::cli::{
    handle_check, handle_config, handle_download, handle_resolve, Cli, Commands,
};
use workshop_fetcher::config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config_override = cli.global.config.clone();

    // Config commands may save the file back, so environment credentials
    // must not leak into it
    let config = match cli.command {
        Commands::Config(_) => AppConfig::load_file_only(config_override.clone()).await,
        _ => AppConfig::load(config_override.clone()).await,
    }
    .context("Failed to load configuration")?;

    init_logging(&cli, &config.logging.level);

    info!("Workshop Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, config, quiet)
                .await
                .context("Download failed")
        }
        Commands::Resolve(args) => {
            info!("Executing resolve command");
            handle_resolve(args, config)
                .await
                .context("Resolve failed")
        }
        Commands::Check(args) => {
            info!("Executing check command");
            handle_check(args, config, quiet)
                .await
                .context("Update check failed")
        }
        Commands::Config(args) => handle_config(args, config, config_override)
            .await
            .context("Configuration command failed"),
    }
}

/// Initialize logging from CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, configured_level: &str) {
    let flag_given = cli.global.quiet || cli.global.verbose || cli.global.very_verbose;
    let level = if flag_given {
        cli.log_level().to_string().to_lowercase()
    } else {
        configured_level.to_string()
    };

    let filter = match format!("workshop_fetcher={}", level).parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => {
            eprintln!("Ignoring invalid log level '{}'", level);
            EnvFilter::from_default_env()
        }
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
