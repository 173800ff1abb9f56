//! Startup checks for Workshop Fetcher
//!
//! Before a download or update check the CLI makes sure the pieces it needs
//! are configured, and points the user at the setting to fix when they are not.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::app::planner::SteamCmd;
use crate::config::{AppConfig, Settings};

/// Results of startup validation checks
#[derive(Debug, Clone, Default)]
pub struct StartupStatus {
    /// Whether a config file was found
    pub config_file: Option<PathBuf>,
    /// Located SteamCMD executable
    pub steamcmd: Option<PathBuf>,
    /// Whether a game is selected
    pub game_selected: bool,
    /// Whether login uses configured credentials
    pub has_credentials: bool,
}

impl StartupStatus {
    /// Ready to download
    pub fn can_download(&self) -> bool {
        self.steamcmd.is_some()
    }

    /// Ready to check for updates
    pub fn can_check(&self) -> bool {
        self.game_selected
    }

    /// Get a summary message for display
    pub fn summary(&self) -> String {
        let mut issues = Vec::new();
        if self.steamcmd.is_none() {
            issues.push("SteamCMD not found (set [default] steamcmd_path)");
        }
        if !self.game_selected {
            issues.push("no game selected (add a [games.<name>] table or pass --game)");
        }
        if issues.is_empty() {
            "✅ Ready".to_string()
        } else {
            format!("⚠️  Setup required: {}", issues.join(", "))
        }
    }
}

/// Inspect configuration and resolved settings
pub fn validate_startup(config: &AppConfig, settings: &Settings) -> StartupStatus {
    let steamcmd = settings
        .steamcmd
        .path
        .as_deref()
        .and_then(SteamCmd::locate);

    let status = StartupStatus {
        config_file: config.source_path().map(|p| p.to_path_buf()),
        steamcmd,
        game_selected: settings.game.is_some(),
        has_credentials: !settings.steamcmd.login.is_anonymous(),
    };

    match &status.steamcmd {
        Some(path) => debug!("SteamCMD found at {}", path.display()),
        None => info!("SteamCMD not located"),
    }
    if !status.has_credentials {
        debug!("Using anonymous SteamCMD login");
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unconfigured_status() {
        let config = AppConfig::default();
        let settings = Settings::resolve(&config, None).unwrap();
        let status = validate_startup(&config, &settings);

        assert!(!status.can_download());
        assert!(!status.can_check());
        assert!(status.summary().contains("steamcmd_path"));
    }

    #[test]
    fn test_ready_status() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(crate::constants::steamcmd::EXECUTABLE_NAMES[0]),
            "",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config
            .set("default", "steamcmd_path", &dir.path().display().to_string())
            .unwrap();
        config.set("games.RimWorld", "appid", "294100").unwrap();

        let settings = Settings::resolve(&config, None).unwrap();
        let status = validate_startup(&config, &settings);

        assert!(status.can_download());
        assert!(status.can_check());
        assert_eq!(status.summary(), "✅ Ready");
    }
}
