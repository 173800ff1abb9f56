//! Command-line argument parsing for Workshop Fetcher
//!
//! This module defines the CLI structure using clap derive macros: workshop
//! downloads, URL resolution, update checks and configuration management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Workshop Fetcher - Download and update Steam Workshop mods with SteamCMD
#[derive(Parser, Debug)]
#[command(
    name = "workshop_fetcher",
    version,
    about = "Download and update Steam Workshop mods with SteamCMD",
    long_about = "Resolves Steam Workshop item and collection URLs, downloads the items in batches with SteamCMD,
and checks installed mods against their workshop pages for updates."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level, includes raw SteamCMD output)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download workshop items and collections with SteamCMD
    Download(DownloadArgs),

    /// Resolve workshop URLs to app/item ids without downloading
    Resolve(ResolveArgs),

    /// Check installed mods for workshop updates
    Check(CheckArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Where workshop URLs come from
#[derive(Args, Debug, Clone, Default)]
pub struct UrlInput {
    /// Workshop item or collection URLs
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Read URLs from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl UrlInput {
    /// True when neither URLs nor a file were given, meaning stdin is read
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.file.is_none()
    }
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub input: UrlInput,

    /// Game whose settings to use
    #[arg(short, long)]
    pub game: Option<String>,

    /// Workshop items per SteamCMD run (overrides [downloader] batch_count)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Skip repeated items
    #[arg(long)]
    pub dedup: bool,

    /// Dry run - show the SteamCMD commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl DownloadArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == Some(0) {
            return Err("Batch size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Arguments for the resolve command
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub input: UrlInput,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Workshop item ids (defaults to [updater] mod_wids)
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,

    /// Game whose mod folder to check
    #[arg(short, long)]
    pub game: Option<String>,

    /// Print verdicts as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (passwords masked)
    Show,

    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file location
    Path,

    /// List configured games
    Games,

    /// Set one value and save the file
    Set {
        /// Section, e.g. default, downloader or games.RimWorld
        section: String,
        /// Key within the section
        key: String,
        /// New value
        value: String,
    },

    /// Prompt for SteamCMD credentials and save them
    Credentials,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args_validation() {
        let args = DownloadArgs {
            input: UrlInput::default(),
            game: None,
            batch_size: Some(3),
            dedup: false,
            dry_run: false,
        };
        assert!(args.validate().is_ok());

        let zero = DownloadArgs {
            batch_size: Some(0),
            ..args
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_parse_download() {
        let cli = Cli::try_parse_from([
            "workshop_fetcher",
            "-v",
            "download",
            "https://steamcommunity.com/sharedfiles/filedetails/?id=1",
            "--game",
            "RimWorld",
            "--batch-size",
            "2",
            "--dedup",
        ])
        .unwrap();

        assert!(cli.global.verbose);
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.input.urls.len(), 1);
                assert_eq!(args.game.as_deref(), Some("RimWorld"));
                assert_eq!(args.batch_size, Some(2));
                assert!(args.dedup);
                assert!(!args.input.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from([
            "workshop_fetcher",
            "config",
            "set",
            "downloader",
            "batch_count",
            "8",
        ])
        .unwrap();

        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Set { section, key, value },
            }) => {
                assert_eq!((section.as_str(), key.as_str(), value.as_str()), ("downloader", "batch_count", "8"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli::try_parse_from(["workshop_fetcher", "-q", "config", "path"]).unwrap();
        let cli_verbose = Cli::try_parse_from(["workshop_fetcher", "config", "path", "-v"]).unwrap();
        let cli_default = Cli::try_parse_from(["workshop_fetcher", "config", "path"]).unwrap();

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
        assert_eq!(cli_default.log_level(), tracing::Level::WARN);
    }
}
