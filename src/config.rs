//! Configuration management for Workshop Fetcher
//!
//! Settings live in a TOML file with one table per concern. Missing tables
//! and keys are filled with defaults on load, so an empty or partial file is
//! always valid. Values can also be read and written by `(section, key)`
//! name, which is what `config set` uses.
//!
//! Components never read [`AppConfig`] directly. A [`Settings`] snapshot is
//! resolved once before work starts and passed down.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::app::models::{is_digit_string, Game, LoginMode};
use crate::app::ClientConfig;
use crate::constants::{batching, config as names, env, limits, logging};
use crate::errors::{ConfigError, ConfigResult};

/// Accept either `5` or `"5"` for numeric settings
fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// SteamCMD location and login
    #[serde(rename = "default")]
    pub steamcmd: SteamCmdConfigToml,
    /// Batching settings
    pub downloader: DownloaderConfigToml,
    /// Default update check list
    pub updater: UpdaterConfigToml,
    /// Per-game settings keyed by game name
    pub games: BTreeMap<String, GameConfigToml>,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,

    #[serde(skip)]
    source_path: Option<PathBuf>,
}

/// `[default]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SteamCmdConfigToml {
    /// SteamCMD executable, or the directory containing it
    pub steamcmd_path: String,
    /// Steam account name; empty means anonymous login
    pub steamcmd_username: String,
    /// Steam account password
    pub steamcmd_password: String,
}

/// `[downloader]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DownloaderConfigToml {
    /// Workshop items per SteamCMD run
    #[serde(deserialize_with = "string_or_int")]
    pub batch_count: String,
    /// Drop repeated targets before planning
    pub dedup: bool,
}

impl Default for DownloaderConfigToml {
    fn default() -> Self {
        Self {
            batch_count: batching::DEFAULT_BATCH_SIZE.to_string(),
            dedup: false,
        }
    }
}

/// `[updater]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UpdaterConfigToml {
    /// Item ids checked when none are given on the command line
    pub mod_wids: Vec<String>,
}

/// `[games.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfigToml {
    #[serde(deserialize_with = "string_or_int")]
    pub appid: String,
    pub mod_folder_path: String,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum connections per host
    pub pool_max_per_host: usize,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Retries for transient failures
    pub max_retries: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        let runtime = ClientConfig::default();
        Self {
            tcp_keepalive_secs: runtime.tcp_keepalive.map(|d| d.as_secs()),
            pool_idle_timeout_secs: runtime.pool_idle_timeout.map(|d| d.as_secs()),
            pool_max_per_host: runtime.pool_max_per_host,
            request_timeout_secs: runtime.request_timeout.as_secs(),
            connect_timeout_secs: runtime.connect_timeout.as_secs(),
            rate_limit_rps: runtime.rate_limit_rps,
            max_retries: runtime.max_retries,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            max_retries: self.max_retries,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Expected true or false".to_string(),
        }),
    }
}

fn parse_batch_count(value: &str) -> ConfigResult<usize> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: format!("{}.batch_count", names::SECTION_DOWNLOADER),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let count: usize = value
        .trim()
        .parse()
        .map_err(|_| invalid("Batch count must be a whole number"))?;
    if count == 0 {
        return Err(invalid("Batch count must be at least 1"));
    }
    Ok(count)
}

fn parse_item_list(value: &str) -> ConfigResult<Vec<String>> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|id| {
            if is_digit_string(id) {
                Ok(id.to_string())
            } else {
                Err(ConfigError::InvalidValue {
                    field: format!("{}.mod_wids", names::SECTION_UPDATER),
                    value: id.to_string(),
                    reason: "Workshop ids must be numeric".to_string(),
                })
            }
        })
        .collect()
}

fn empty_to_none(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

impl AppConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, else the first standard location found)
    /// 3. Environment variables
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::load_file_only(config_file_override).await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load defaults and the config file, ignoring the environment
    ///
    /// Use this when the configuration is going to be saved back.
    pub async fn load_file_only(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(ref path) => Some(path.clone()),
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) if path.exists() => Self::load_from_file(&path).await,
            Some(path) if config_file_override.is_some() => Err(ConfigError::NotFound { path }),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file, filling missing keys with defaults
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::from_toml_str(&content)?;
        config.source_path = Some(path.to_path_buf());

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Credentials from the environment replace the file's
    pub fn apply_env_overrides(&mut self) {
        if let Ok(username) = std::env::var(env::USERNAME) {
            debug!("Using SteamCMD username from {}", env::USERNAME);
            self.steamcmd.steamcmd_username = username;
        }
        if let Ok(password) = std::env::var(env::PASSWORD) {
            debug!("Using SteamCMD password from {}", env::PASSWORD);
            self.steamcmd.steamcmd_password = password;
        }
    }

    /// File this configuration was loaded from, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn set_source_path(&mut self, path: PathBuf) {
        self.source_path = Some(path);
    }

    /// Names of the configured games, sorted
    pub fn games(&self) -> Vec<&str> {
        self.games.keys().map(String::as_str).collect()
    }

    /// Game table for a section name, `games.<name>` or the bare name
    fn game_section<'a>(&self, section: &'a str) -> Option<&'a str> {
        let name = section.strip_prefix("games.").unwrap_or(section);
        self.games.contains_key(name).then_some(name)
    }

    /// Look up a value by section and key
    pub fn lookup(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            (names::SECTION_DEFAULT, "steamcmd_path") => Some(self.steamcmd.steamcmd_path.clone()),
            (names::SECTION_DEFAULT, "steamcmd_username") => {
                Some(self.steamcmd.steamcmd_username.clone())
            }
            (names::SECTION_DEFAULT, "steamcmd_password") => {
                Some(self.steamcmd.steamcmd_password.clone())
            }
            (names::SECTION_DOWNLOADER, "batch_count") => Some(self.downloader.batch_count.clone()),
            (names::SECTION_DOWNLOADER, "dedup") => Some(self.downloader.dedup.to_string()),
            (names::SECTION_UPDATER, "mod_wids") => Some(self.updater.mod_wids.join(",")),
            ("logging", "level") => Some(self.logging.level.clone()),
            (section, key) => {
                let game = self.games.get(self.game_section(section)?)?;
                match key {
                    "appid" => Some(game.appid.clone()),
                    "mod_folder_path" => Some(game.mod_folder_path.clone()),
                    _ => None,
                }
            }
        }
    }

    /// Look up a value, returning `fallback` for unknown sections or keys
    pub fn get(&self, section: &str, key: &str, fallback: &str) -> String {
        self.lookup(section, key)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Update one value in memory; call [`AppConfig::save`] to persist it
    ///
    /// `games.<name>` sections are created on first write.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` when the value does not parse for its key
    /// and `ConfigError::UnknownKey` for anything else unrecognised
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> ConfigResult<()> {
        match (section, key) {
            (names::SECTION_DEFAULT, "steamcmd_path") => {
                self.steamcmd.steamcmd_path = value.to_string()
            }
            (names::SECTION_DEFAULT, "steamcmd_username") => {
                self.steamcmd.steamcmd_username = value.to_string()
            }
            (names::SECTION_DEFAULT, "steamcmd_password") => {
                self.steamcmd.steamcmd_password = value.to_string()
            }
            (names::SECTION_DOWNLOADER, "batch_count") => {
                self.downloader.batch_count = parse_batch_count(value)?.to_string()
            }
            (names::SECTION_DOWNLOADER, "dedup") => {
                self.downloader.dedup = parse_bool("downloader.dedup", value)?
            }
            (names::SECTION_UPDATER, "mod_wids") => self.updater.mod_wids = parse_item_list(value)?,
            ("logging", "level") => self.logging.level = value.to_string(),
            (section, key) => {
                let name = match section.strip_prefix("games.") {
                    Some(name) if !name.is_empty() => name,
                    _ => self.game_section(section).ok_or_else(|| ConfigError::UnknownKey {
                        section: section.to_string(),
                        key: key.to_string(),
                    })?,
                };
                let unknown = || ConfigError::UnknownKey {
                    section: section.to_string(),
                    key: key.to_string(),
                };
                match key {
                    "appid" => {
                        if !is_digit_string(value.trim()) {
                            return Err(ConfigError::InvalidValue {
                                field: format!("games.{}.appid", name),
                                value: value.to_string(),
                                reason: "App id must be numeric".to_string(),
                            });
                        }
                        self.games.entry(name.to_string()).or_default().appid =
                            value.trim().to_string();
                    }
                    "mod_folder_path" => {
                        self.games.entry(name.to_string()).or_default().mod_folder_path =
                            value.to_string();
                    }
                    _ => return Err(unknown()),
                }
            }
        }
        debug!("Set [{}] {}", section, key);
        Ok(())
    }

    /// Write the configuration back to where it was loaded from, or to the
    /// default location if it was not loaded from a file
    pub async fn save(&self) -> ConfigResult<PathBuf> {
        let path = match &self.source_path {
            Some(path) => path.clone(),
            None => Self::default_config_path()?,
        };
        self.save_to(&path).await?;
        Ok(path)
    }

    pub async fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        write_file(path, &content).await?;
        info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Initialize configuration on first run
    ///
    /// Creates a commented default config file if none exists
    pub async fn initialize_first_run() -> ConfigResult<PathBuf> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            return Ok(config_path);
        }

        info!("Creating default configuration file...");
        write_file(&config_path, &Self::generate_default_config_content()).await?;
        Ok(config_path)
    }

    /// Write the commented default file to `path`, replacing it only with `force`
    pub async fn write_default_config(path: &Path, force: bool) -> ConfigResult<bool> {
        if path.exists() && !force {
            return Ok(false);
        }
        write_file(path, &Self::generate_default_config_content()).await?;
        Ok(true)
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(format!("./{}", names::LOCAL_CONFIG_FILE))];
        if let Ok(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir
            .join(names::CONFIG_DIR_NAME)
            .join(names::CONFIG_FILE_NAME))
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        let client = ClientConfigToml::default();
        format!(
            r#"# Workshop Fetcher Configuration
# Missing keys fall back to the values shown here.

[default]
# SteamCMD executable, or the directory that contains it
steamcmd_path = ""
# Leave both empty for anonymous login.
# STEAMCMD_USERNAME / STEAMCMD_PASSWORD in the environment or .env take precedence.
steamcmd_username = ""
steamcmd_password = ""

[downloader]
# Workshop items per SteamCMD run
batch_count = "{}"
# Drop repeated items before downloading
dedup = false

[updater]
# Items checked by `check` when none are given
mod_wids = []

# One table per game
# [games.RimWorld]
# appid = "294100"
# mod_folder_path = "/path/to/RimWorld/Mods"

[client]
tcp_keepalive_secs = {}
pool_idle_timeout_secs = {}
pool_max_per_host = {}
request_timeout_secs = {}
connect_timeout_secs = {}
rate_limit_rps = {}
max_retries = {}

[logging]
level = "{}"  # error, warn, info, debug, trace
"#,
            batching::DEFAULT_BATCH_SIZE,
            client.tcp_keepalive_secs.unwrap_or(30),
            client.pool_idle_timeout_secs.unwrap_or(90),
            client.pool_max_per_host,
            client.request_timeout_secs,
            client.connect_timeout_secs,
            limits::DEFAULT_RATE_LIMIT_RPS,
            limits::MAX_RETRIES,
            logging::DEFAULT_LOG_LEVEL,
        )
    }
}

async fn write_file(path: &Path, content: &str) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// SteamCMD part of the runtime snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteamCmdSettings {
    /// Configured path, possibly a directory; `None` if unset
    pub path: Option<PathBuf>,
    pub login: LoginMode,
}

/// Read-only settings snapshot handed to the pipeline and update checker
#[derive(Debug, Clone)]
pub struct Settings {
    pub steamcmd: SteamCmdSettings,
    pub batch_size: usize,
    pub dedup: bool,
    pub game: Option<Game>,
    pub client: ClientConfig,
}

impl Settings {
    /// Validate the configuration and pick the game
    ///
    /// With no `game_name`, a single configured game is selected
    /// automatically.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownGame` for a name without a table and
    /// `ConfigError::InvalidValue` for a bad batch count or app id
    pub fn resolve(config: &AppConfig, game_name: Option<&str>) -> ConfigResult<Self> {
        let batch_size = parse_batch_count(&config.downloader.batch_count)?;

        let login = LoginMode::from_credentials(
            empty_to_none(&config.steamcmd.steamcmd_username),
            empty_to_none(&config.steamcmd.steamcmd_password),
        );

        let game_name = match game_name {
            Some(name) => Some(name),
            None if config.games.len() == 1 => config.games.keys().next().map(String::as_str),
            None => None,
        };

        let game = match game_name {
            Some(name) => {
                let table = config
                    .games
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownGame {
                        name: name.to_string(),
                        available: if config.games.is_empty() {
                            "none".to_string()
                        } else {
                            config.games().join(", ")
                        },
                    })?;
                Some(Game::new(
                    name,
                    table.appid.as_str(),
                    empty_to_none(&table.mod_folder_path).map(PathBuf::from),
                )?)
            }
            None => None,
        };

        Ok(Self {
            steamcmd: SteamCmdSettings {
                path: empty_to_none(&config.steamcmd.steamcmd_path).map(PathBuf::from),
                login,
            },
            batch_size,
            dedup: config.downloader.dedup,
            game,
            client: config.client.to_runtime_config(),
        })
    }

    /// The selected game, for operations that need one
    pub fn require_game(&self) -> ConfigResult<&Game> {
        self.game.as_ref().ok_or(ConfigError::NoGameSelected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[default]
steamcmd_path = "/opt/steamcmd"
steamcmd_username = "alice"
steamcmd_password = "secret"

[downloader]
batch_count = 3

[updater]
mod_wids = ["818773962", "2009463077"]

[games.RimWorld]
appid = 294100
mod_folder_path = "/games/RimWorld/Mods"

[logging]
level = "debug"
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.downloader.batch_count, "5");
        assert!(!config.downloader.dedup);
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.logging.level, "warn");
        assert!(config.games().is_empty());
    }

    #[test]
    fn test_generated_content_parses_to_defaults() {
        let content = AppConfig::generate_default_config_content();
        let parsed = AppConfig::from_toml_str(&content).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("[default]"));
        assert!(content.contains("[downloader]"));
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let config = AppConfig::from_toml_str("[default]\nsteamcmd_path = \"/x\"\n").unwrap();
        assert_eq!(config.steamcmd.steamcmd_path, "/x");
        assert_eq!(config.downloader.batch_count, "5");
        assert_eq!(config.client, ClientConfigToml::default());
    }

    #[test]
    fn test_get_with_fallback() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.get("default", "steamcmd_path", ""), "/opt/steamcmd");
        assert_eq!(config.get("downloader", "batch_count", "5"), "3");
        assert_eq!(config.get("RimWorld", "appid", ""), "294100");
        assert_eq!(
            config.get("games.RimWorld", "mod_folder_path", ""),
            "/games/RimWorld/Mods"
        );
        assert_eq!(config.get("updater", "mod_wids", ""), "818773962,2009463077");
        assert_eq!(config.get("Factorio", "appid", "none"), "none");
        assert_eq!(config.get("default", "nope", "fb"), "fb");
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = AppConfig::default();

        config.set("downloader", "batch_count", "8").unwrap();
        assert_eq!(config.downloader.batch_count, "8");
        assert!(matches!(
            config.set("downloader", "batch_count", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("downloader", "batch_count", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));

        config.set("downloader", "dedup", "yes").unwrap();
        assert!(config.downloader.dedup);

        config.set("updater", "mod_wids", "1, 2 3").unwrap();
        assert_eq!(config.updater.mod_wids, vec!["1", "2", "3"]);

        config.set("games.Stellaris", "appid", "281990").unwrap();
        config.set("Stellaris", "mod_folder_path", "/mods").unwrap();
        assert_eq!(config.games(), vec!["Stellaris"]);
        assert_eq!(config.games["Stellaris"].mod_folder_path, "/mods");

        assert!(matches!(
            config.set("nowhere", "appid", "1"),
            Err(ConfigError::UnknownKey { .. })
        ));
        assert!(matches!(
            config.set("Stellaris", "colour", "red"),
            Err(ConfigError::UnknownKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.set_source_path(path.clone());
        config.set("default", "steamcmd_path", "/srv/steamcmd").unwrap();
        assert_eq!(config.save().await.unwrap(), path);

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.steamcmd.steamcmd_path, "/srv/steamcmd");
        assert_eq!(reloaded.games["RimWorld"].appid, "294100");
        assert_eq!(reloaded.source_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(temp_dir.path().join("missing.toml"))).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_write_default_config_respects_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        assert!(AppConfig::write_default_config(&path, false).await.unwrap());
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();
        assert!(!AppConfig::write_default_config(&path, false).await.unwrap());
        assert!(AppConfig::write_default_config(&path, true).await.unwrap());

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_settings_snapshot() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let settings = Settings::resolve(&config, None).unwrap();

        assert_eq!(settings.batch_size, 3);
        assert_eq!(settings.steamcmd.path, Some(PathBuf::from("/opt/steamcmd")));
        assert_eq!(
            settings.steamcmd.login,
            LoginMode::from_credentials(Some("alice"), Some("secret"))
        );
        // Single configured game is picked automatically
        let game = settings.require_game().unwrap();
        assert_eq!(game.name(), "RimWorld");
        assert_eq!(game.app_id(), "294100");
    }

    #[test]
    fn test_settings_game_selection_errors() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            Settings::resolve(&config, Some("Factorio")),
            Err(ConfigError::UnknownGame { .. })
        ));

        let settings = Settings::resolve(&AppConfig::default(), None).unwrap();
        assert!(settings.steamcmd.login.is_anonymous());
        assert!(settings.steamcmd.path.is_none());
        assert!(matches!(
            settings.require_game(),
            Err(ConfigError::NoGameSelected)
        ));
    }

    #[test]
    fn test_settings_rejects_zero_batch() {
        let config = AppConfig::from_toml_str("[downloader]\nbatch_count = \"0\"\n").unwrap();
        assert!(matches!(
            Settings::resolve(&config, None),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
