//! Mod update detection
//!
//! A mod is stale when its workshop page shows an update newer than the
//! modification time of its local folder, `<mod_folder>/<item id>`.
//! Local state is checked before the page is fetched, so a mod that is not
//! installed costs no request.

pub mod parse;

use std::path::Path;

use tracing::{debug, info, warn};
use url::Url;

use crate::app::client::PageSource;
use crate::app::models::{is_digit_string, Game, LocalInstallState, ModSnapshot, UpdateVerdict};
use crate::app::progress::{ProgressSink, Severity};
use crate::constants::steam;
use crate::errors::{UpdateError, UpdateResult};

pub use parse::{parse_detail_page, parse_steam_timestamp};

/// Detail page URL for a workshop item
pub fn detail_url(item_id: &str) -> UpdateResult<Url> {
    if !is_digit_string(item_id) {
        return Err(UpdateError::InvalidItemId {
            item_id: item_id.to_string(),
        });
    }
    Url::parse(&format!("{}{}", steam::FILE_DETAILS_URL, item_id)).map_err(|_| {
        UpdateError::InvalidItemId {
            item_id: item_id.to_string(),
        }
    })
}

/// Stat the installed copy of an item
///
/// # Errors
///
/// `UpdateError::ModFolderNotFound` or `UpdateError::ItemFolderNotFound`
/// when either directory is missing
pub fn probe_local(mod_folder: &Path, item_id: &str) -> UpdateResult<LocalInstallState> {
    if !mod_folder.exists() {
        return Err(UpdateError::ModFolderNotFound {
            path: mod_folder.to_path_buf(),
        });
    }

    let local_path = mod_folder.join(item_id);
    if !local_path.exists() {
        return Err(UpdateError::ItemFolderNotFound { path: local_path });
    }

    let modified = std::fs::metadata(&local_path)
        .and_then(|meta| meta.modified())
        .map_err(|source| UpdateError::Io {
            path: local_path.clone(),
            source,
        })?;

    Ok(LocalInstallState {
        item_id: item_id.to_string(),
        local_path,
        local_modified_epoch: Some(parse::system_time_to_epoch(modified)),
    })
}

/// Compares installed mods against their workshop pages
#[derive(Debug)]
pub struct UpdateChecker<P> {
    source: P,
}

impl<P: PageSource> UpdateChecker<P> {
    pub fn new(source: P) -> Self {
        Self { source }
    }

    /// Fetch and parse the detail page of one item
    pub async fn fetch_snapshot(&self, item_id: &str) -> UpdateResult<ModSnapshot> {
        let url = detail_url(item_id)?;
        debug!("Fetching detail page {}", url);
        let html = self
            .source
            .fetch_page(&url)
            .await
            .map_err(|source| UpdateError::Fetch {
                item_id: item_id.to_string(),
                source,
            })?;
        parse_detail_page(&html)
    }

    /// Decide whether one installed mod needs an update
    ///
    /// # Errors
    ///
    /// Missing local folders are reported before any network access; fetch
    /// and parse failures follow.
    pub async fn check(&self, item_id: &str, mod_folder: &Path) -> UpdateResult<UpdateVerdict> {
        if !is_digit_string(item_id) {
            return Err(UpdateError::InvalidItemId {
                item_id: item_id.to_string(),
            });
        }
        let local = probe_local(mod_folder, item_id)?;
        let snapshot = self.fetch_snapshot(item_id).await?;
        let verdict = UpdateVerdict::evaluate(&snapshot, &local);

        debug!(
            item_id,
            name = %verdict.name,
            needs_update = verdict.needs_update,
            removed = verdict.removed_from_steam,
            "Checked mod"
        );
        Ok(verdict)
    }

    /// Check one mod of a configured game
    pub async fn check_game(&self, item_id: &str, game: &Game) -> UpdateResult<UpdateVerdict> {
        let mod_folder = game
            .mod_folder_path()
            .ok_or_else(|| UpdateError::ModFolderNotConfigured {
                game: game.name().to_string(),
            })?;
        self.check(item_id, mod_folder).await
    }

    /// Check several mods of a game in order
    ///
    /// Every id gets its own result; one failure does not hide the rest.
    pub async fn check_many(
        &self,
        item_ids: &[String],
        game: &Game,
        sink: &dyn ProgressSink,
    ) -> Vec<(String, UpdateResult<UpdateVerdict>)> {
        let total = item_ids.len();
        let mut results = Vec::with_capacity(total);

        for (done, item_id) in item_ids.iter().enumerate() {
            let result = self.check_game(item_id, game).await;
            match &result {
                Ok(verdict) if verdict.removed_from_steam => sink.append_line(
                    &format!("{} ({}) has been removed from Steam", verdict.name, item_id),
                    Severity::Warning,
                ),
                Ok(verdict) if verdict.needs_update => sink.append_line(
                    &format!("{} ({}) needs an update", verdict.name, item_id),
                    Severity::Info,
                ),
                Ok(verdict) => sink.append_line(
                    &format!("{} ({}) is up to date", verdict.name, item_id),
                    Severity::Success,
                ),
                Err(e) => {
                    warn!("Update check failed for {}: {}", item_id, e);
                    sink.append_line(&format!("{}: {}", item_id, e), Severity::Error);
                }
            }
            sink.set_progress(100.0 * (done + 1) as f64 / total as f64);
            results.push((item_id.clone(), result));
        }

        let stale = results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(v) if v.needs_update))
            .count();
        info!("Checked {} mods for {}, {} need updates", total, game.name(), stale);
        results
    }
}
