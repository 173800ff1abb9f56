//! Core application logic for Workshop Fetcher
//!
//! This module contains the HTTP client, data models, and the four pipeline
//! components: URL resolution, batch planning, SteamCMD supervision and
//! update checking.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use workshop_fetcher::app::{DownloadPipeline, TracingSink, WorkshopClient};
//! use workshop_fetcher::config::{AppConfig, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None).await?;
//! let settings = Settings::resolve(&config, None)?;
//! let client = WorkshopClient::with_config(&settings.client)?;
//!
//! let pipeline = DownloadPipeline::new(client, settings, Arc::new(TracingSink))?;
//! let report = pipeline
//!     .run("https://steamcommunity.com/sharedfiles/filedetails/?id=818773962")
//!     .await?;
//! println!("{} batches succeeded", report.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod resolver;
pub mod supervisor;
pub mod updater;

// Re-export main public API
pub use client::{ClientConfig, PageSource, WorkshopClient};
pub use models::{
    AcquisitionTarget, Batch, ExitStatus, Game, InvocationOutcome, LocalInstallState, LoginMode,
    ModSnapshot, ToolInvocation, UpdateVerdict,
};
pub use pipeline::{BatchReport, DownloadPipeline, PipelineReport};
pub use planner::{BatchPlanner, SteamCmd};
pub use progress::{MemorySink, ProgressSink, Severity, TracingSink};
pub use resolver::{PageKind, UrlResolver};
pub use supervisor::{
    ItemReport, LineClass, OutputEvent, ProcessSupervisor, RunHandle, SupervisorState,
};
pub use updater::UpdateChecker;
