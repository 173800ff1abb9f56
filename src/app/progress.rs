//! Progress reporting seam between the core and whatever renders it
//!
//! Core components never talk to a terminal or window directly. They report
//! through a [`ProgressSink`], which the CLI implements with an indicatif bar
//! and which tests implement with [`MemorySink`]. Sinks may be written from a
//! background task, so every implementation must be `Send + Sync`.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, error, info, warn};

/// How prominent a reported line is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// Verbatim output from SteamCMD
    Output,
    Info,
    Success,
    Warning,
    Error,
}

/// Append-only console plus a progress value
pub trait ProgressSink: Send + Sync {
    /// Append one line of text
    fn append_line(&self, text: &str, severity: Severity);

    /// Overall progress in percent, 0.0 to 100.0
    fn set_progress(&self, percent: f64);
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn append_line(&self, text: &str, severity: Severity) {
        (**self).append_line(text, severity)
    }

    fn set_progress(&self, percent: f64) {
        (**self).set_progress(percent)
    }
}

/// Sink that forwards everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn append_line(&self, text: &str, severity: Severity) {
        match severity {
            Severity::Output => debug!(target: "workshop_fetcher::steamcmd", "{}", text),
            Severity::Info | Severity::Success => info!("{}", text),
            Severity::Warning => warn!("{}", text),
            Severity::Error => error!("{}", text),
        }
    }

    fn set_progress(&self, percent: f64) {
        debug!("Progress: {:.0}%", percent);
    }
}

/// Sink that records everything in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkState>>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    lines: Vec<(String, Severity)>,
    progress: Vec<f64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines with their severity
    pub fn lines(&self) -> Vec<(String, Severity)> {
        self.lock().lines.clone()
    }

    /// Recorded lines of one severity
    pub fn lines_with(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .lines
            .iter()
            .filter(|(_, s)| *s == severity)
            .map(|(text, _)| text.clone())
            .collect()
    }

    /// Every progress value reported, in order
    pub fn progress_history(&self) -> Vec<f64> {
        self.lock().progress.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySinkState> {
        // A panicking writer leaves the recorded data intact
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for MemorySink {
    fn append_line(&self, text: &str, severity: Severity) {
        self.lock().lines.push((text.to_string(), severity));
    }

    fn set_progress(&self, percent: f64) {
        self.lock().progress.push(percent.clamp(0.0, 100.0));
    }
}
