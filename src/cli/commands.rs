//! Command handlers for Workshop Fetcher CLI
//!
//! This module implements the command handlers that connect CLI arguments to
//! the download pipeline, the URL resolver, the update checker and the
//! configuration file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::app::{
    DownloadPipeline, TracingSink, UpdateChecker, UpdateVerdict, UrlResolver, WorkshopClient,
};
use crate::cli::progress::{ConsoleConfig, ConsoleSink};
use crate::cli::startup::validate_startup;
use crate::cli::{CheckArgs, ConfigAction, ConfigArgs, DownloadArgs, ResolveArgs, UrlInput};
use crate::config::{AppConfig, Settings};
use crate::errors::{AppError, ConfigError, Result};

/// Collect URL text from arguments, a file, or stdin
async fn read_input(input: &UrlInput) -> Result<String> {
    let mut text = input.urls.join("\n");

    if let Some(file) = &input.file {
        let content = tokio::fs::read_to_string(file).await.map_err(|e| {
            AppError::generic(format!("Failed to read {}: {}", file.display(), e))
        })?;
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&content);
    }

    if input.is_empty() {
        if atty::is(atty::Stream::Stdin) {
            println!("Paste workshop URLs, one per line, then press Ctrl-D:");
        }
        tokio::io::stdin().read_to_string(&mut text).await?;
    }

    Ok(text)
}

fn console_sink(quiet: bool) -> Arc<ConsoleSink> {
    Arc::new(ConsoleSink::new(ConsoleConfig {
        quiet,
        ..Default::default()
    }))
}

/// Handle the download command
///
/// Resolves the given URLs, splits the items into batches and runs SteamCMD
/// once per batch.
pub async fn handle_download(args: DownloadArgs, config: AppConfig, quiet: bool) -> Result<()> {
    let start_time = Instant::now();
    args.validate().map_err(AppError::generic)?;

    let mut settings = Settings::resolve(&config, args.game.as_deref())?;
    if let Some(batch_size) = args.batch_size {
        settings.batch_size = batch_size;
    }
    settings.dedup |= args.dedup;

    let status = validate_startup(&config, &settings);
    if !status.can_download() {
        println!("{}", status.summary());
    }

    let raw_text = read_input(&args.input).await?;
    let client = WorkshopClient::with_config(&settings.client)?;
    let sink = console_sink(quiet);
    let pipeline = DownloadPipeline::new(client, settings, sink.clone())?;

    if args.dry_run {
        let (_, invocations) = pipeline.prepare(&raw_text).await?;
        sink.finish();
        println!("Dry run: {} SteamCMD runs planned", invocations.len());
        for invocation in &invocations {
            println!("  {}", invocation.redacted_command_line());
        }
        return Ok(());
    }

    let report = pipeline.run(&raw_text).await?;
    sink.finish();

    let on_disk = report.on_disk().count();
    println!();
    println!("📊 Download summary");
    println!("   Items:   {}", report.targets.len());
    println!(
        "   Batches: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    println!("   On disk: {}", on_disk);
    println!("   Time:    {:.1?}", start_time.elapsed());

    info!(
        targets = report.targets.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Download command finished"
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(AppError::generic(format!(
            "{} of {} batches failed",
            report.failed(),
            report.batches.len()
        )))
    }
}

/// Handle the resolve command
pub async fn handle_resolve(args: ResolveArgs, config: AppConfig) -> Result<()> {
    let raw_text = read_input(&args.input).await?;
    let client = WorkshopClient::with_config(&config.client.to_runtime_config())?;
    let resolver = UrlResolver::new(client);

    let targets = resolver.resolve(&raw_text, &TracingSink).await;
    let mut stdout = io::stdout().lock();
    for target in &targets {
        writeln!(stdout, "{}\t{}", target.app_id(), target.item_id())?;
    }

    debug!("Printed {} targets", targets.len());
    Ok(())
}

#[derive(Serialize)]
struct CheckRecord<'a> {
    item_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<&'a UpdateVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Handle the check command
pub async fn handle_check(args: CheckArgs, config: AppConfig, quiet: bool) -> Result<()> {
    let settings = Settings::resolve(&config, args.game.as_deref())?;
    let game = settings.require_game()?;

    let ids = if args.ids.is_empty() {
        config.updater.mod_wids.clone()
    } else {
        args.ids.clone()
    };
    if ids.is_empty() {
        return Err(AppError::generic(
            "No workshop ids given. Pass ids or set [updater] mod_wids",
        ));
    }

    let client = WorkshopClient::with_config(&settings.client)?;
    let checker = UpdateChecker::new(client);

    let results = if args.json {
        checker.check_many(&ids, game, &TracingSink).await
    } else {
        let sink = console_sink(quiet);
        let results = checker.check_many(&ids, game, &*sink).await;
        sink.finish();
        results
    };

    let stale: Vec<&str> = results
        .iter()
        .filter(|(_, r)| matches!(r, Ok(v) if v.needs_update))
        .map(|(id, _)| id.as_str())
        .collect();

    if args.json {
        let records: Vec<CheckRecord<'_>> = results
            .iter()
            .map(|(item_id, result)| CheckRecord {
                item_id,
                verdict: result.as_ref().ok(),
                error: result.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| AppError::generic(format!("Failed to encode results: {}", e)))?;
        println!("{}", json);
    } else if stale.is_empty() {
        println!("All checked mods for {} are up to date", game.name());
    } else {
        println!("{} mods need updates: {}", stale.len(), stale.join(", "));
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        warn!("{} of {} update checks failed", failed, results.len());
    }
    Ok(())
}

/// Copy with the password masked, for display
fn masked(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if !shown.steamcmd.steamcmd_password.is_empty() {
        shown.steamcmd.steamcmd_password = "********".to_string();
    }
    shown
}

fn target_path(config: &AppConfig, config_override: Option<&Path>) -> Result<PathBuf> {
    match (config_override, config.source_path()) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(path)) => Ok(path.to_path_buf()),
        (None, None) => Ok(AppConfig::default_config_path()?),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Handle configuration management commands
pub async fn handle_config(
    args: ConfigArgs,
    mut config: AppConfig,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(&masked(&config)).map_err(ConfigError::from)?;
            print!("{}", content);
        }
        ConfigAction::Init { force } => {
            let path = match config_override {
                Some(path) => path,
                None => AppConfig::default_config_path()?,
            };
            if AppConfig::write_default_config(&path, force).await? {
                println!("📁 Created default configuration file:");
                println!("   {}", path.display());
                println!("   You can customize settings by editing this file.");
            } else {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite it.");
            }
        }
        ConfigAction::Path => {
            let path = target_path(&config, config_override.as_deref())?;
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} (not created yet)", path.display());
            }
        }
        ConfigAction::Games => {
            if config.games.is_empty() {
                println!("No games configured. Add one with:");
                println!("  workshop_fetcher config set games.<name> appid <appid>");
            }
            for (name, game) in &config.games {
                let folder = if game.mod_folder_path.is_empty() {
                    "(no mod folder)"
                } else {
                    game.mod_folder_path.as_str()
                };
                println!("{}\t{}\t{}", name, game.appid, folder);
            }
        }
        ConfigAction::Set {
            section,
            key,
            value,
        } => {
            config.set(&section, &key, &value)?;
            let path = target_path(&config, config_override.as_deref())?;
            config.save_to(&path).await?;
            println!("Set [{}] {} in {}", section, key, path.display());
        }
        ConfigAction::Credentials => {
            let username = prompt("Steam username (empty for anonymous): ")?;
            let password = if username.is_empty() {
                String::new()
            } else {
                rpassword::prompt_password("Steam password: ")?
            };

            config.set("default", "steamcmd_username", &username)?;
            config.set("default", "steamcmd_password", &password)?;
            let path = target_path(&config, config_override.as_deref())?;
            config.save_to(&path).await?;

            if username.is_empty() {
                println!("✅ SteamCMD will log in anonymously");
            } else {
                println!("✅ Saved credentials for {} to {}", username, path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_input_merges_args_and_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("urls.txt");
        std::fs::write(&file, "https://b\nhttps://c\n").unwrap();

        let input = UrlInput {
            urls: vec!["https://a".to_string()],
            file: Some(file),
        };
        let text = read_input(&input).await.unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["https://a", "https://b", "https://c"]);
    }

    #[test]
    fn test_masked_hides_password() {
        let mut config = AppConfig::default();
        config.set("default", "steamcmd_password", "hunter2").unwrap();
        let shown = toml::to_string_pretty(&masked(&config)).unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("********"));
    }

    #[tokio::test]
    async fn test_config_set_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let args = ConfigArgs {
            action: ConfigAction::Set {
                section: "downloader".to_string(),
                key: "batch_count".to_string(),
                value: "9".to_string(),
            },
        };
        handle_config(args, AppConfig::default(), Some(path.clone()))
            .await
            .unwrap();

        let saved = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(saved.downloader.batch_count, "9");
    }

    #[tokio::test]
    async fn test_check_requires_game() {
        let args = CheckArgs {
            ids: vec!["1".to_string()],
            game: None,
            json: false,
        };
        let result = handle_check(args, AppConfig::default(), true).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::NoGameSelected))
        ));
    }
}
