//! Prelude module for Workshop Fetcher
//!
//! Re-exports the items most integrations need, so that
//! `use workshop_fetcher::prelude::*;` is enough for typical usage.
//!
//! # Usage
//!
//! ```rust,no_run
//! use workshop_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let settings = Settings::resolve(&config, Some("RimWorld"))?;
//!     let game = settings.require_game()?;
//!
//!     let checker = UpdateChecker::new(WorkshopClient::with_config(&settings.client)?);
//!     let ids = config.updater.mod_wids.clone();
//!     for (id, result) in checker.check_many(&ids, game, &TracingSink).await {
//!         println!("{}: {:?}", id, result.map(|v| v.needs_update));
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline components and their data
pub use crate::app::{
    AcquisitionTarget, BatchPlanner, DownloadPipeline, Game, InvocationOutcome, LoginMode,
    MemorySink, PageSource, PipelineReport, ProcessSupervisor, ProgressSink, Severity, SteamCmd,
    ToolInvocation, TracingSink, UpdateChecker, UpdateVerdict, UrlResolver, WorkshopClient,
};

// Configuration
pub use crate::config::{AppConfig, Settings};

// Commonly used constants
pub use crate::constants::{DEFAULT_BATCH_SIZE, ENV_PASSWORD, ENV_USERNAME, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
