//! SteamCMD output line classification
//!
//! SteamCMD is an interactive console program; when scripted it still
//! prints its prompt and, on internal faults, announces that it is about to
//! redirect stderr and die. These banners are the only protocol it offers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::constants::steamcmd;

static ITEM_SUCCESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Success\. Downloaded item (\d+)").unwrap());
static ITEM_FAILURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ERROR! Download item (\d+) failed(?: \(([^)]*)\))?").unwrap());

/// What a single output line means to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// Interactive prompt; dropped
    Idle,
    /// Fault banner; `before_banner` is the text preceding it on the line
    Fault { before_banner: &'a str },
    /// Anything else; forwarded verbatim
    Other,
}

/// Classify one line of SteamCMD output
pub fn classify_line(line: &str) -> LineClass<'_> {
    if let Some(index) = line.find(steamcmd::FAULT_BANNER) {
        return LineClass::Fault {
            before_banner: &line[..index],
        };
    }
    if line.trim_start().starts_with(steamcmd::IDLE_BANNER) {
        return LineClass::Idle;
    }
    LineClass::Other
}

/// Per-item result SteamCMD prints after each download directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ItemReport {
    Downloaded { item_id: String },
    Failed { item_id: String, reason: Option<String> },
}

/// Parse an item success/failure line, if this is one
pub fn parse_item_report(line: &str) -> Option<ItemReport> {
    if let Some(captures) = ITEM_SUCCESS_RE.captures(line) {
        return Some(ItemReport::Downloaded {
            item_id: captures[1].to_string(),
        });
    }
    ITEM_FAILURE_RE.captures(line).map(|captures| ItemReport::Failed {
        item_id: captures[1].to_string(),
        reason: captures.get(2).map(|m| m.as_str().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_banner_keeps_prefix() {
        let line = "Assertion Failed: bad state Redirecting stderr to '/tmp/logs/stderr.txt'";
        assert_eq!(
            classify_line(line),
            LineClass::Fault {
                before_banner: "Assertion Failed: bad state "
            }
        );
    }

    #[test]
    fn test_idle_and_other() {
        assert_eq!(classify_line("-- type 'quit' to exit --"), LineClass::Idle);
        assert_eq!(classify_line("  -- type 'quit' to exit --"), LineClass::Idle);
        assert_eq!(classify_line("Loading Steam API...OK"), LineClass::Other);
        // The prompt text only counts at the start of a line
        assert_eq!(
            classify_line("echo -- type 'quit' to exit --"),
            LineClass::Other
        );
    }

    #[test]
    fn test_item_reports() {
        assert_eq!(
            parse_item_report(
                r#"Success. Downloaded item 818773962 to "/steamcmd/steamapps/workshop/content/294100/818773962" (1234 bytes)"#
            ),
            Some(ItemReport::Downloaded {
                item_id: "818773962".to_string()
            })
        );
        assert_eq!(
            parse_item_report("ERROR! Download item 123 failed (File Not Found)."),
            Some(ItemReport::Failed {
                item_id: "123".to_string(),
                reason: Some("File Not Found".to_string())
            })
        );
        assert_eq!(parse_item_report("Logging in user 'anonymous'"), None);
    }
}
