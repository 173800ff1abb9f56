//! Console rendering of pipeline progress
//!
//! [`ConsoleSink`] prints sink lines as they arrive and, when stdout is a
//! terminal, keeps an indicatif bar below them showing overall progress.
//! Off a terminal it falls back to plain lines so output stays pipe-friendly.

use std::io::{self, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::app::progress::{ProgressSink, Severity};

/// Display options
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Draw a progress bar when attached to a terminal
    pub enable_progress_bar: bool,
    /// Echo raw SteamCMD output
    pub show_tool_output: bool,
    /// Only print warnings and errors
    pub quiet: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: true,
            show_tool_output: true,
            quiet: false,
        }
    }
}

/// Line prefix for a severity
fn prefix(severity: Severity) -> &'static str {
    match severity {
        Severity::Output => "  ",
        Severity::Info => "",
        Severity::Success => "✅ ",
        Severity::Warning => "⚠️  ",
        Severity::Error => "❌ ",
    }
}

/// Format one sink line for the console
pub fn format_line(text: &str, severity: Severity) -> String {
    format!("{}{}", prefix(severity), text)
}

/// [`ProgressSink`] that writes to the terminal
pub struct ConsoleSink {
    config: ConsoleConfig,
    bar: Option<ProgressBar>,
    last_percent: Mutex<f64>,
}

impl ConsoleSink {
    pub fn new(config: ConsoleConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stdout);
        let bar = (config.enable_progress_bar && is_terminal && !config.quiet)
            .then(Self::create_bar)
            .flatten();

        Self {
            config,
            bar,
            last_percent: Mutex::new(0.0),
        }
    }

    fn create_bar() -> Option<ProgressBar> {
        let style = match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        {
            Ok(style) => style.progress_chars("##-"),
            Err(e) => {
                debug!("Progress bar template error: {}", e);
                return None;
            }
        };
        let bar = ProgressBar::new(100);
        bar.set_style(style);
        Some(bar)
    }

    fn wants(&self, severity: Severity) -> bool {
        match severity {
            Severity::Warning | Severity::Error => true,
            Severity::Output => self.config.show_tool_output && !self.config.quiet,
            Severity::Info | Severity::Success => !self.config.quiet,
        }
    }

    /// Last progress value reported
    pub fn percent(&self) -> f64 {
        *self
            .last_percent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove the bar, leaving printed lines in place
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn append_line(&self, text: &str, severity: Severity) {
        if !self.wants(severity) {
            return;
        }
        let line = format_line(text, severity);
        match (&self.bar, severity) {
            (Some(bar), _) => bar.println(line),
            (None, Severity::Warning | Severity::Error) => {
                let _ = writeln!(io::stderr(), "{}", line);
            }
            (None, _) => {
                let _ = writeln!(io::stdout(), "{}", line);
            }
        }
    }

    fn set_progress(&self, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        *self
            .last_percent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = percent;

        match &self.bar {
            Some(bar) => bar.set_position(percent.round() as u64),
            None if !self.config.quiet => {
                let _ = writeln!(io::stdout(), "Progress: {:.0}%", percent);
            }
            None => {}
        }
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("done", Severity::Success), "✅ done");
        assert_eq!(format_line("Loading", Severity::Output), "  Loading");
        assert_eq!(format_line("plain", Severity::Info), "plain");
    }

    #[test]
    fn test_quiet_filters_informational_lines() {
        let sink = ConsoleSink::new(ConsoleConfig {
            enable_progress_bar: false,
            show_tool_output: true,
            quiet: true,
        });
        assert!(!sink.wants(Severity::Info));
        assert!(!sink.wants(Severity::Output));
        assert!(sink.wants(Severity::Error));
    }

    #[test]
    fn test_progress_is_clamped() {
        let sink = ConsoleSink::new(ConsoleConfig {
            enable_progress_bar: false,
            quiet: true,
            ..Default::default()
        });
        sink.set_progress(140.0);
        assert_eq!(sink.percent(), 100.0);
    }
}
