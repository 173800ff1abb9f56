//! Application constants for Workshop Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for SteamCMD credentials
pub mod env {
    /// Environment variable overriding the configured SteamCMD username
    pub const USERNAME: &str = "STEAMCMD_USERNAME";

    /// Environment variable overriding the configured SteamCMD password
    pub const PASSWORD: &str = "STEAMCMD_PASSWORD";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Workshop-Fetcher/0.1.0 (Steam Workshop mod tool)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for Steam community requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 1;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
}

/// Steam community URLs and page markers
pub mod steam {
    /// Workshop item detail page, the item id is appended
    pub const FILE_DETAILS_URL: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";

    /// Tracking suffix appended to workshop links copied from search results
    pub const SEARCH_SUFFIX: &str = "&search";

    /// Script call present on collection pages, once per contained item
    pub const COLLECTION_MARKER: &str = "SubscribeCollectionItem";

    /// Script call present on single item pages
    pub const ITEM_MARKER: &str = "ShowAddToCollection";

    /// Separator between the site prefix and the item name in page titles
    pub const TITLE_DELIMITER: &str = "::";

    /// Timestamp layout used in the detail page stat blocks, e.g. `Jun 22, 2016 @ 4:54am`
    pub const TIMESTAMP_FORMAT: &str = "%b %d, %Y @ %I:%M%p";
}

/// CSS selectors for the workshop detail page
pub mod selectors {
    /// Stat blocks: file size, created, and (if revised) updated
    pub const DETAILS_STAT_SELECTOR: &str = "div.detailsStatRight";

    /// Hub tab linking to the owning app, last path segment is the app id
    pub const APP_HUB_TAB_SELECTOR: &str = "a.apphub_sectionTab";

    /// Owning game display name
    pub const APP_NAME_SELECTOR: &str = "div.apphub_AppName";

    /// Document title
    pub const TITLE_SELECTOR: &str = "title";
}

/// SteamCMD invocation and output protocol
pub mod steamcmd {
    /// Executable names probed when the configured path is a directory
    #[cfg(windows)]
    pub const EXECUTABLE_NAMES: &[&str] = &["steamcmd.exe"];

    /// Executable names probed when the configured path is a directory
    #[cfg(not(windows))]
    pub const EXECUTABLE_NAMES: &[&str] = &["steamcmd.sh", "steamcmd"];

    /// Login directive used when no credentials are configured
    pub const LOGIN_ANONYMOUS: &str = "+login anonymous";

    /// Per-item download directive prefix
    pub const DOWNLOAD_DIRECTIVE: &str = "+workshop_download_item";

    /// Validation flag trailing the download directives
    pub const VALIDATE: &str = "validate";

    /// Quit directive closing every invocation
    pub const QUIT: &str = "+quit";

    /// Emitted right before SteamCMD faults and exits
    pub const FAULT_BANNER: &str = "Redirecting stderr to";

    /// Interactive prompt, carries no information for a scripted run
    pub const IDLE_BANNER: &str = "-- type 'quit' to exit --";

    /// Workshop content directory below the SteamCMD install
    pub const WORKSHOP_CONTENT_DIR: [&str; 3] = ["steamapps", "workshop", "content"];
}

/// Batch planning defaults
pub mod batching {
    /// Default number of workshop items per SteamCMD invocation
    pub const DEFAULT_BATCH_SIZE: usize = 5;
}

/// Configuration file locations and section names
pub mod config {
    /// Project-local config file name
    pub const LOCAL_CONFIG_FILE: &str = "workshop-fetcher.toml";

    /// Directory below the user config dir
    pub const CONFIG_DIR_NAME: &str = "workshop-fetcher";

    /// File name inside the user config dir
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Section holding SteamCMD path and credentials
    pub const SECTION_DEFAULT: &str = "default";

    /// Section holding batching settings
    pub const SECTION_DOWNLOADER: &str = "downloader";

    /// Section holding the default update check list
    pub const SECTION_UPDATER: &str = "updater";
}

/// Logging constants
pub mod logging {
    /// Default log level; console output covers the rest
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use batching::DEFAULT_BATCH_SIZE;
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
