//! Command-line interface components
//!
//! This module contains CLI-specific code for Workshop Fetcher, including
//! argument parsing, console progress display, and startup checks.

pub mod args;
pub mod commands;
pub mod progress;
pub mod startup;

pub use args::{
    CheckArgs, Cli, Commands, ConfigAction, ConfigArgs, DownloadArgs, GlobalArgs, ResolveArgs,
    UrlInput,
};
pub use commands::{handle_check, handle_config, handle_download, handle_resolve};
pub use progress::{ConsoleConfig, ConsoleSink};
pub use startup::{validate_startup, StartupStatus};
