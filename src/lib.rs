//! Workshop Fetcher Library
//!
//! Downloads Steam Workshop items and collections through SteamCMD and checks
//! installed mods for updates by scraping their workshop pages.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
