//! End-to-end download pipeline
//!
//! `raw text → UrlResolver → (dedup) → BatchPlanner → ProcessSupervisor`,
//! one batch at a time. SteamCMD is located before anything else happens, so
//! a missing install fails the whole run up front. After that, failures are
//! per batch: a failed batch is reported and the next one still runs. There
//! is no retry.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::client::PageSource;
use crate::app::models::{AcquisitionTarget, InvocationOutcome, LoginMode, ToolInvocation};
use crate::app::planner::{dedup_targets, BatchPlanner, SteamCmd};
use crate::app::progress::{ProgressSink, Severity};
use crate::app::resolver::UrlResolver;
use crate::app::supervisor::{parse_item_report, ItemReport, ProcessSupervisor};
use crate::config::Settings;
use crate::errors::Result;

/// What happened to one batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub targets: Vec<AcquisitionTarget>,
    pub outcome: InvocationOutcome,
    /// Per-item lines SteamCMD printed
    pub items: Vec<ItemReport>,
    /// Targets whose content folder exists after the run
    pub on_disk: Vec<AcquisitionTarget>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Targets after resolution and optional dedup, in plan order
    pub targets: Vec<AcquisitionTarget>,
    pub batches: Vec<BatchReport>,
}

impl PipelineReport {
    /// Number of batches that finished successfully
    pub fn succeeded(&self) -> usize {
        self.batches.iter().filter(|b| b.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.batches.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Targets found in SteamCMD's workshop content folder
    pub fn on_disk(&self) -> impl Iterator<Item = &AcquisitionTarget> {
        self.batches.iter().flat_map(|b| b.on_disk.iter())
    }
}

/// Resolves, plans and downloads workshop items
pub struct DownloadPipeline<P> {
    resolver: UrlResolver<P>,
    planner: BatchPlanner,
    settings: Settings,
    sink: Arc<dyn ProgressSink>,
}

impl<P: PageSource> DownloadPipeline<P> {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the snapshot's batch size is zero
    pub fn new(source: P, settings: Settings, sink: Arc<dyn ProgressSink>) -> Result<Self> {
        let planner = BatchPlanner::new(settings.batch_size)?;
        Ok(Self {
            resolver: UrlResolver::new(source),
            planner,
            settings,
            sink,
        })
    }

    fn login(&self) -> &LoginMode {
        &self.settings.steamcmd.login
    }

    /// Locate SteamCMD, resolve `raw_text` and plan the invocations
    ///
    /// Nothing is run; this is also what a dry run shows.
    ///
    /// # Errors
    ///
    /// `ToolError::NotConfigured` or `ToolError::NotInstalled` before any
    /// page is fetched
    pub async fn prepare(&self, raw_text: &str) -> Result<(SteamCmd, Vec<ToolInvocation>)> {
        let steamcmd = SteamCmd::from_config(self.settings.steamcmd.path.as_deref())?;

        let mut targets = self.resolver.resolve(raw_text, self.sink.as_ref()).await;
        if self.settings.dedup {
            let before = targets.len();
            targets = dedup_targets(targets);
            if targets.len() < before {
                self.sink.append_line(
                    &format!("Skipped {} duplicate items", before - targets.len()),
                    Severity::Info,
                );
            }
        }

        let invocations = self
            .planner
            .invocations(&targets, steamcmd.executable(), self.login());
        Ok((steamcmd, invocations))
    }

    /// Run the whole pipeline
    pub async fn run(&self, raw_text: &str) -> Result<PipelineReport> {
        let (steamcmd, invocations) = self.prepare(raw_text).await?;
        Ok(self.execute(&steamcmd, invocations).await)
    }

    /// Run planned invocations sequentially
    pub async fn execute(
        &self,
        steamcmd: &SteamCmd,
        invocations: Vec<ToolInvocation>,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();
        let total = invocations.len();

        if total == 0 {
            self.sink
                .append_line("No workshop items to download", Severity::Warning);
            self.sink.set_progress(100.0);
            return report;
        }

        let supervisor = ProcessSupervisor::new(Arc::clone(&self.sink));
        self.sink.set_progress(0.0);

        for (done, invocation) in invocations.into_iter().enumerate() {
            let batch = invocation.batch().clone();
            self.sink.append_line(
                &format!(
                    "Downloading batch {}/{} ({} items)",
                    done + 1,
                    total,
                    batch.len()
                ),
                Severity::Info,
            );

            let outcome = match supervisor.run(&invocation).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Batch {} could not run: {}", done + 1, e);
                    let mut outcome = InvocationOutcome::running();
                    outcome.finish_failure(None, Some(e.to_string()));
                    outcome
                }
            };

            if outcome.is_success() {
                self.sink.append_line(
                    &format!("Batch {}/{} finished", done + 1, total),
                    Severity::Success,
                );
            } else {
                self.sink.append_line(
                    &format!(
                        "Batch {}/{} failed: {}",
                        done + 1,
                        total,
                        outcome.error_line.as_deref().unwrap_or("unknown error")
                    ),
                    Severity::Error,
                );
            }

            let items = outcome
                .captured_output
                .iter()
                .filter_map(|line| parse_item_report(line))
                .collect();
            let on_disk = batch
                .targets()
                .iter()
                .filter(|t| steamcmd.workshop_content_path(t).exists())
                .cloned()
                .collect();

            report.targets.extend(batch.targets().iter().cloned());
            report.batches.push(BatchReport {
                index: batch.index(),
                targets: batch.targets().to_vec(),
                outcome,
                items,
                on_disk,
            });

            self.sink
                .set_progress(100.0 * (done + 1) as f64 / total as f64);
        }

        info!(
            "Download finished: {} of {} batches succeeded",
            report.succeeded(),
            total
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::progress::MemorySink;
    use crate::config::SteamCmdSettings;
    use crate::app::ClientConfig;
    use crate::errors::{AppError, DownloadError, DownloadResult, ToolError};
    use std::future::Future;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use url::Url;

    struct OneItemPerUrl;

    impl PageSource for OneItemPerUrl {
        fn fetch_page(&self, url: &Url) -> impl Future<Output = DownloadResult<String>> + Send {
            let result = url
                .query_pairs()
                .find(|(k, _)| k == "id")
                .map(|(_, id)| format!("ShowAddToCollection( '{}', '294100' );", id))
                .ok_or(DownloadError::ServerError { status: 404 });
            async move { result }
        }
    }

    fn settings(path: Option<PathBuf>, batch_size: usize, dedup: bool) -> Settings {
        Settings {
            steamcmd: SteamCmdSettings {
                path,
                login: LoginMode::Anonymous,
            },
            batch_size,
            dedup,
            game: None,
            client: ClientConfig::default(),
        }
    }

    fn urls(ids: &[u32]) -> String {
        ids.iter()
            .map(|id| format!("https://steamcommunity.com/sharedfiles/filedetails/?id={}", id))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_missing_tool_aborts_before_resolving() {
        let sink = Arc::new(MemorySink::new());
        let pipeline =
            DownloadPipeline::new(OneItemPerUrl, settings(None, 5, false), sink.clone()).unwrap();

        let result = pipeline.run(&urls(&[1, 2])).await;

        assert!(matches!(
            result,
            Err(AppError::Tool(ToolError::NotConfigured))
        ));
        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_plans_batches_with_dedup() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join(crate::constants::steamcmd::EXECUTABLE_NAMES[0]);
        std::fs::write(&exe, "").unwrap();

        let sink = Arc::new(MemorySink::new());
        let pipeline = DownloadPipeline::new(
            OneItemPerUrl,
            settings(Some(dir.path().to_path_buf()), 2, true),
            sink.clone(),
        )
        .unwrap();

        let (steamcmd, invocations) = pipeline.prepare(&urls(&[1, 2, 1, 3])).await.unwrap();

        assert_eq!(steamcmd.executable(), exe.as_path());
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].batch().len(), 2);
        assert_eq!(invocations[1].batch().targets()[0].item_id(), "3");
        assert_eq!(sink.lines_with(Severity::Info).last().unwrap(), "Skipped 1 duplicate items");
    }

    #[tokio::test]
    async fn test_empty_input_runs_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(crate::constants::steamcmd::EXECUTABLE_NAMES[0]), "").unwrap();
        let sink = Arc::new(MemorySink::new());
        let pipeline = DownloadPipeline::new(
            OneItemPerUrl,
            settings(Some(dir.path().to_path_buf()), 5, false),
            sink.clone(),
        )
        .unwrap();

        let report = pipeline.run("\n\n").await.unwrap();

        assert!(report.batches.is_empty());
        assert!(report.is_success());
        assert_eq!(sink.progress_history(), vec![100.0]);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = DownloadPipeline::new(
            OneItemPerUrl,
            settings(None, 0, false),
            Arc::new(MemorySink::new()),
        );
        assert!(result.is_err());
    }
}
