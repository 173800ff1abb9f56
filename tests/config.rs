//! Integration tests for configuration loading and the settings snapshot

use std::path::PathBuf;

use tempfile::TempDir;

use workshop_fetcher::app::LoginMode;
use workshop_fetcher::config::{AppConfig, Settings};
use workshop_fetcher::errors::ConfigError;

const CONFIG: &str = r#"
[default]
steamcmd_path = "/opt/steamcmd"
steamcmd_username = "file-user"
steamcmd_password = "file-pass"

[downloader]
batch_count = "4"
dedup = true

[games.RimWorld]
appid = "294100"
mod_folder_path = "/games/RimWorld/Mods"

[games.Stellaris]
appid = 281990
"#;

fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("workshop-fetcher.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

#[tokio::test]
async fn test_environment_overrides_file_credentials() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    std::env::set_var("STEAMCMD_USERNAME", "env-user");
    std::env::set_var("STEAMCMD_PASSWORD", "env-pass");

    let config = AppConfig::load(Some(path.clone())).await.unwrap();
    let file_only = AppConfig::load_file_only(Some(path)).await.unwrap();

    std::env::remove_var("STEAMCMD_USERNAME");
    std::env::remove_var("STEAMCMD_PASSWORD");

    assert_eq!(config.steamcmd.steamcmd_username, "env-user");
    assert_eq!(file_only.steamcmd.steamcmd_username, "file-user");

    let settings = Settings::resolve(&config, Some("RimWorld")).unwrap();
    assert_eq!(
        settings.steamcmd.login,
        LoginMode::from_credentials(Some("env-user"), Some("env-pass"))
    );
}

#[tokio::test]
async fn test_settings_from_file() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::load_file_only(Some(write_config(&dir)))
        .await
        .unwrap();

    assert_eq!(config.games(), vec!["RimWorld", "Stellaris"]);
    assert_eq!(config.get("Stellaris", "appid", ""), "281990");

    let settings = Settings::resolve(&config, Some("Stellaris")).unwrap();
    assert_eq!(settings.batch_size, 4);
    assert!(settings.dedup);
    let game = settings.require_game().unwrap();
    assert_eq!(game.app_id(), "281990");
    assert!(game.mod_folder_path().is_none());

    // Two games and none named
    let settings = Settings::resolve(&config, None).unwrap();
    assert!(matches!(
        settings.require_game(),
        Err(ConfigError::NoGameSelected)
    ));
}

#[tokio::test]
async fn test_set_and_save_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let mut config = AppConfig::load_file_only(Some(path.clone())).await.unwrap();
    config.set("downloader", "batch_count", "7").unwrap();
    config
        .set("games.Factorio", "appid", "427520")
        .unwrap();
    let saved_to = config.save().await.unwrap();
    assert_eq!(saved_to, path);

    let reloaded = AppConfig::load_file_only(Some(path)).await.unwrap();
    assert_eq!(reloaded.get("downloader", "batch_count", "5"), "7");
    assert_eq!(reloaded.get("games.Factorio", "appid", ""), "427520");
    assert_eq!(
        reloaded.get("RimWorld", "mod_folder_path", ""),
        "/games/RimWorld/Mods"
    );
}

#[tokio::test]
async fn test_invalid_toml_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[downloader\nbatch_count = 3").unwrap();

    assert!(matches!(
        AppConfig::load_file_only(Some(path)).await,
        Err(ConfigError::InvalidFormat(_))
    ));
}
