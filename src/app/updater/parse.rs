//! Workshop detail page scraping

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::app::models::ModSnapshot;
use crate::constants::{selectors, steam};
use crate::errors::{UpdateError, UpdateResult};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(selectors::TITLE_SELECTOR).unwrap());
static APP_HUB_TAB: Lazy<Selector> =
    Lazy::new(|| Selector::parse(selectors::APP_HUB_TAB_SELECTOR).unwrap());
static APP_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(selectors::APP_NAME_SELECTOR).unwrap());
static DETAILS_STAT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(selectors::DETAILS_STAT_SELECTOR).unwrap());

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first<'a>(document: &'a Html, selector: &Selector, name: &str) -> UpdateResult<ElementRef<'a>> {
    document
        .select(selector)
        .next()
        .ok_or_else(|| UpdateError::ElementNotFound {
            selector: name.to_string(),
        })
}

/// Item name from a title like `Steam Workshop::Harmony`
fn mod_name(title: &str) -> String {
    match title.split_once(steam::TITLE_DELIMITER) {
        Some((_, name)) => name.trim().to_string(),
        None => title.trim().to_string(),
    }
}

/// Last path segment of the app hub tab link, e.g. `294100`
fn app_id_from_tab(tab: ElementRef<'_>) -> String {
    tab.value()
        .attr("href")
        .map(|href| href.trim_end_matches('/'))
        .and_then(|href| href.rsplit('/').next())
        .unwrap_or_default()
        .to_string()
}

/// Parse a stat block timestamp such as `Jun 22, 2016 @ 4:54am`
///
/// Steam renders these in the viewer's local time, so they are read as local
/// time and converted to Unix seconds.
pub fn parse_steam_timestamp(value: &str) -> UpdateResult<i64> {
    let value = value.trim();
    let naive = NaiveDateTime::parse_from_str(value, steam::TIMESTAMP_FORMAT).map_err(|e| {
        UpdateError::TimestampParse {
            value: value.to_string(),
            reason: e.to_string(),
        }
    })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| UpdateError::TimestampParse {
            value: value.to_string(),
            reason: "time does not exist in the local timezone".to_string(),
        })
}

/// Convert a file modification time to Unix seconds
pub fn system_time_to_epoch(time: std::time::SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

/// Extract a [`ModSnapshot`] from a workshop detail page
///
/// The number of stat blocks decides the shape: none means the item was
/// removed, two means it was never revised, three carries the last update.
///
/// # Errors
///
/// `UpdateError::ElementNotFound` if a live item's page lacks the title or
/// app hub elements, `UpdateError::TimestampParse` for an unreadable date and
/// `UpdateError::UnexpectedStatCount` for any other number of stat blocks
pub fn parse_detail_page(html: &str) -> UpdateResult<ModSnapshot> {
    let document = Html::parse_document(html);
    let stats: Vec<String> = document.select(&DETAILS_STAT).map(element_text).collect();

    // Removed items render an error page without the app hub header
    if stats.is_empty() {
        let name = document
            .select(&TITLE)
            .next()
            .map(|title| mod_name(&element_text(title)))
            .unwrap_or_default();
        let owner_game = document
            .select(&APP_NAME)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let app_id = document
            .select(&APP_HUB_TAB)
            .next()
            .map(app_id_from_tab)
            .unwrap_or_default();
        return Ok(ModSnapshot::removed(name, owner_game, app_id));
    }

    let name = mod_name(&element_text(first(
        &document,
        &TITLE,
        selectors::TITLE_SELECTOR,
    )?));
    let app_id = app_id_from_tab(first(
        &document,
        &APP_HUB_TAB,
        selectors::APP_HUB_TAB_SELECTOR,
    )?);
    let owner_game = element_text(first(
        &document,
        &APP_NAME,
        selectors::APP_NAME_SELECTOR,
    )?);

    match stats.len() {
        2 => {
            let created = parse_steam_timestamp(&stats[1])?;
            Ok(ModSnapshot::published(name, owner_game, app_id, created, None))
        }
        3 => {
            let created = parse_steam_timestamp(&stats[1])?;
            let updated = parse_steam_timestamp(&stats[2])?;
            Ok(ModSnapshot::published(
                name,
                owner_game,
                app_id,
                created,
                Some(updated),
            ))
        }
        count => Err(UpdateError::UnexpectedStatCount { count }),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Detail page with the given stat block contents
    pub fn detail_page(stats: &[&str]) -> String {
        let blocks: String = stats
            .iter()
            .map(|s| format!(r#"<div class="detailsStatRight">{}</div>"#, s))
            .collect();
        format!(
            r#"<html><head><title>Steam Workshop::Harmony</title></head>
<body>
  <div class="apphub_HomeHeaderContent">
    <div class="apphub_AppName ellipsis">RimWorld</div>
    <a class="apphub_sectionTab" href="https://steamcommunity.com/app/294100">Workshop</a>
  </div>
  <div class="detailsStatsContainerRight">{}</div>
</body></html>"#,
            blocks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::detail_page;
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let expected = Local
            .with_ymd_and_hms(2016, 6, 22, 16, 54, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(parse_steam_timestamp("Jun 22, 2016 @ 4:54pm").unwrap(), expected);
        assert_eq!(parse_steam_timestamp(" Jun 22, 2016 @ 4:54PM ").unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_mismatch_is_error() {
        assert!(matches!(
            parse_steam_timestamp("22/06/2016 16:54"),
            Err(UpdateError::TimestampParse { .. })
        ));
    }

    #[test]
    fn test_removed_item() {
        let snapshot = parse_detail_page(&detail_page(&[])).unwrap();
        assert!(snapshot.removed_from_steam);
        assert_eq!(snapshot.created_at_epoch, None);
        assert_eq!(snapshot.updated_at_epoch, None);
        assert_eq!(snapshot.name, "Harmony");
        assert_eq!(snapshot.owner_game, "RimWorld");
        assert_eq!(snapshot.app_id, "294100");
    }

    #[test]
    fn test_never_updated_item() {
        let snapshot =
            parse_detail_page(&detail_page(&["1.2 MB", "Jun 22, 2016 @ 4:54am"])).unwrap();
        assert!(!snapshot.removed_from_steam);
        assert!(snapshot.created_at_epoch.is_some());
        assert_eq!(snapshot.updated_at_epoch, None);
    }

    #[test]
    fn test_updated_item() {
        let snapshot = parse_detail_page(&detail_page(&[
            "1.2 MB",
            "Jun 22, 2016 @ 4:54am",
            "Mar 3, 2021 @ 11:02pm",
        ]))
        .unwrap();
        assert_eq!(
            snapshot.updated_at_epoch,
            Some(parse_steam_timestamp("Mar 3, 2021 @ 11:02pm").unwrap())
        );
    }

    #[test]
    fn test_bad_timestamp_is_hard_error() {
        let result = parse_detail_page(&detail_page(&["1.2 MB", "yesterday"]));
        assert!(matches!(result, Err(UpdateError::TimestampParse { .. })));
    }

    #[test]
    fn test_unexpected_stat_count() {
        let result = parse_detail_page(&detail_page(&["1.2 MB"]));
        assert!(matches!(
            result,
            Err(UpdateError::UnexpectedStatCount { count: 1 })
        ));
    }

    #[test]
    fn test_removed_item_error_page() {
        let page = r#"<html><head><title>Steam Community :: Error</title></head>
<body><div class="error_ctn">There was a problem accessing the item.</div></body></html>"#;
        let snapshot = parse_detail_page(page).unwrap();
        assert!(snapshot.removed_from_steam);
        assert_eq!(snapshot.name, "Error");
        assert_eq!(snapshot.owner_game, "");
        assert_eq!(snapshot.app_id, "");
    }

    #[test]
    fn test_missing_app_hub() {
        let result = parse_detail_page(
            r#"<html><head><title>Steam Workshop::X</title></head>
<body><div class="detailsStatRight">1 MB</div><div class="detailsStatRight">Jun 22, 2016 @ 4:54am</div></body></html>"#,
        );
        assert!(matches!(result, Err(UpdateError::ElementNotFound { .. })));
    }
}
