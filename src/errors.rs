//! Error types for Workshop Fetcher
//!
//! This module defines the error types for all components of the application.
//! Errors are designed to be actionable: a caller can tell a missing SteamCMD
//! install apart from a missing mod folder and prompt for the right fix.

use std::path::PathBuf;
use thiserror::Error;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for request")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Generic error for other issues
    #[error("{0}")]
    Other(String),
}

/// Errors resolving a single workshop URL into acquisition targets
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The line is not a parseable URL
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// The page could not be fetched
    #[error("Error getting page {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// Neither the collection nor the item marker is on the page
    #[error("No workshop item or collection found at {url}")]
    NoMatch { url: String },

    /// A marker is present but no id pair follows it
    #[error("Found {marker} on {url} but could not read the item and app ids")]
    MalformedMarker { url: String, marker: &'static str },
}

/// SteamCMD process errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// No SteamCMD path configured at all
    #[error("SteamCMD path is not configured. Set steamcmd_path in the [default] section")]
    NotConfigured,

    /// The configured path does not lead to an executable
    #[error("SteamCMD not found at {path}")]
    NotInstalled { path: PathBuf },

    /// The process could not be started
    #[error("Failed to start SteamCMD at {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pipe to the child was not available
    #[error("Failed to capture SteamCMD {stream}")]
    StreamCapture { stream: &'static str },

    /// A background run was cancelled or panicked
    #[error("SteamCMD background task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Errors checking a single mod for updates
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The game has no mod folder configured
    #[error("No mod folder configured for game '{game}'")]
    ModFolderNotConfigured { game: String },

    /// The configured mod folder does not exist
    #[error("Mod folder not found: {path}")]
    ModFolderNotFound { path: PathBuf },

    /// The item's own folder does not exist below the mod folder
    #[error("Mod not installed: {path} does not exist")]
    ItemFolderNotFound { path: PathBuf },

    /// Workshop item ids are digit strings
    #[error("Invalid workshop item id: '{item_id}'")]
    InvalidItemId { item_id: String },

    /// The detail page could not be fetched
    #[error("Failed to fetch details for item {item_id}: {source}")]
    Fetch {
        item_id: String,
        #[source]
        source: DownloadError,
    },

    /// A required element is missing from the detail page
    #[error("Expected element not found on detail page: {selector}")]
    ElementNotFound { selector: String },

    /// A stat block timestamp does not follow the expected layout
    #[error("Unrecognised workshop timestamp '{value}': {reason}")]
    TimestampParse { value: String, reason: String },

    /// The page carries a number of stat blocks this tool does not understand
    #[error("Unexpected number of stat blocks on detail page: {count}")]
    UnexpectedStatCount { count: usize },

    /// Reading local file metadata failed
    #[error("Failed to read local mod state at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    /// True for the missing-local-state family of failures
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            UpdateError::ModFolderNotConfigured { .. }
                | UpdateError::ModFolderNotFound { .. }
                | UpdateError::ItemFolderNotFound { .. }
        )
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Reading or writing the file failed
    #[error("Configuration file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Section/key pair this tool does not know about
    #[error("Unknown configuration key: [{section}] {key}")]
    UnknownKey { section: String, key: String },

    /// No game chosen for an operation that needs one
    #[error("No game selected. Pass --game or configure a [games.<name>] section")]
    NoGameSelected,

    /// The chosen game has no section
    #[error("Unknown game '{name}'. Configured games: {available}")]
    UnknownGame { name: String, available: String },

    /// Could not determine where the config file lives
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// URL resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// SteamCMD error
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Update check error
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(DownloadError::RateLimitExceeded)
            | AppError::Download(DownloadError::ServerOverloaded)
            | AppError::Download(DownloadError::Http(_))
            | AppError::Resolve(ResolveError::Fetch { .. })
            | AppError::Update(UpdateError::Fetch { .. }) => true,

            AppError::Tool(ToolError::NotInstalled { .. })
            | AppError::Tool(ToolError::NotConfigured)
            | AppError::Update(UpdateError::TimestampParse { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Download(_) => "download",
            AppError::Resolve(_) => "resolve",
            AppError::Tool(_) => "steamcmd",
            AppError::Update(_) => "update",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// HTTP result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// SteamCMD result type alias
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Update check result type alias
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
