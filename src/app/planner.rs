//! Batch planning for SteamCMD runs
//!
//! SteamCMD downloads every `+workshop_download_item` directive it is given
//! in one session, and a session that faults loses all of them. Targets are
//! therefore split into bounded batches, one SteamCMD invocation each.
//! Planning is pure: nothing here touches the network, and only
//! [`SteamCmd::locate`] looks at the filesystem.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::app::models::{AcquisitionTarget, Batch, LoginMode, ToolInvocation};
use crate::constants::{batching, steamcmd};
use crate::errors::{ConfigError, ConfigResult, ToolError, ToolResult};

/// Partition `targets` into batches of at most `batch_size`, preserving order
pub fn plan(targets: &[AcquisitionTarget], batch_size: NonZeroUsize) -> Vec<Batch> {
    targets
        .chunks(batch_size.get())
        .enumerate()
        .map(|(index, chunk)| Batch::new(index, chunk.to_vec()))
        .collect()
}

/// Remove repeated targets, keeping the first occurrence of each
pub fn dedup_targets(targets: Vec<AcquisitionTarget>) -> Vec<AcquisitionTarget> {
    let mut seen = HashSet::with_capacity(targets.len());
    targets
        .into_iter()
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

/// Assemble the SteamCMD argument vector for one batch
pub fn build_invocation(batch: Batch, executable: &Path, login: &LoginMode) -> ToolInvocation {
    ToolInvocation::new(executable.to_path_buf(), login.clone(), batch)
}

/// Splits targets into batches and turns them into invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlanner {
    batch_size: NonZeroUsize,
}

impl Default for BatchPlanner {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(batching::DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl BatchPlanner {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a batch size of zero
    pub fn new(batch_size: usize) -> ConfigResult<Self> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or_else(|| ConfigError::InvalidValue {
            field: "downloader.batch_count".to_string(),
            value: batch_size.to_string(),
            reason: "Batch size must be at least 1".to_string(),
        })?;
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    pub fn plan(&self, targets: &[AcquisitionTarget]) -> Vec<Batch> {
        plan(targets, self.batch_size)
    }

    /// One invocation per batch, in batch order
    pub fn invocations(
        &self,
        targets: &[AcquisitionTarget],
        executable: &Path,
        login: &LoginMode,
    ) -> Vec<ToolInvocation> {
        let batches = self.plan(targets);
        debug!(
            "Planned {} batches of up to {} items for {} targets",
            batches.len(),
            self.batch_size,
            targets.len()
        );
        batches
            .into_iter()
            .map(|batch| build_invocation(batch, executable, login))
            .collect()
    }
}

/// A located SteamCMD installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteamCmd {
    executable: PathBuf,
}

impl SteamCmd {
    /// Find the executable from a configured path
    ///
    /// The path may name the executable itself or the directory holding it.
    pub fn locate(configured: &Path) -> Option<PathBuf> {
        if configured.is_file() {
            return Some(configured.to_path_buf());
        }
        if configured.is_dir() {
            return steamcmd::EXECUTABLE_NAMES
                .iter()
                .map(|name| configured.join(name))
                .find(|candidate| candidate.is_file());
        }
        None
    }

    /// # Errors
    ///
    /// `ToolError::NotConfigured` when no path is set, `ToolError::NotInstalled`
    /// when the path does not lead to an executable
    pub fn from_config(configured: Option<&Path>) -> ToolResult<Self> {
        let configured = configured
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ToolError::NotConfigured)?;

        let executable = Self::locate(configured).ok_or_else(|| ToolError::NotInstalled {
            path: configured.to_path_buf(),
        })?;

        Ok(Self { executable })
    }

    pub fn is_installed(configured: &Path) -> bool {
        Self::locate(configured).is_some()
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Directory SteamCMD runs from and writes its `steamapps` tree into
    pub fn install_dir(&self) -> &Path {
        self.executable.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Where SteamCMD places a downloaded workshop item
    pub fn workshop_content_path(&self, target: &AcquisitionTarget) -> PathBuf {
        let mut path = self.install_dir().to_path_buf();
        for segment in steamcmd::WORKSHOP_CONTENT_DIR {
            path.push(segment);
        }
        path.join(target.app_id()).join(target.item_id())
    }
}
