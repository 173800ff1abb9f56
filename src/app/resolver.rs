//! Workshop URL resolution
//!
//! Turns free-form text (one URL per line) into [`AcquisitionTarget`]s by
//! fetching each page and reading the item/app id pairs out of the script
//! calls Steam embeds in it. Collection pages call `SubscribeCollectionItem`
//! once per contained item; single item pages call `ShowAddToCollection` once.
//!
//! Resolution fails soft: a line that cannot be fetched or does not look like
//! a workshop page is reported to the [`ProgressSink`] and skipped, and the
//! remaining lines are still resolved.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::client::PageSource;
use crate::app::models::AcquisitionTarget;
use crate::app::progress::{ProgressSink, Severity};
use crate::constants::steam;
use crate::errors::{ResolveError, ResolveResult};

static COLLECTION_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SubscribeCollectionItem[\( ']+(\d+)[ ',]+(\d+)'").unwrap());
static ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ShowAddToCollection[\( ']+(\d+)[ ',]+(\d+)'").unwrap());

/// What a fetched page turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// Collection page with its items in document order
    Collection(Vec<AcquisitionTarget>),
    /// Single workshop item
    Item(AcquisitionTarget),
    /// Neither marker present
    Unrecognized,
}

impl PageKind {
    pub fn into_targets(self) -> Vec<AcquisitionTarget> {
        match self {
            PageKind::Collection(targets) => targets,
            PageKind::Item(target) => vec![target],
            PageKind::Unrecognized => Vec::new(),
        }
    }
}

/// Drop the `&search...` tracking suffix Steam appends to links from search results
pub fn strip_search_suffix(url: &str) -> &str {
    match url.find(steam::SEARCH_SUFFIX) {
        Some(index) => &url[..index],
        None => url,
    }
}

fn captures_to_target(captures: regex::Captures<'_>) -> Option<AcquisitionTarget> {
    // Steam passes (item id, app id); targets are keyed app first
    let item_id = captures.get(1)?.as_str();
    let app_id = captures.get(2)?.as_str();
    AcquisitionTarget::new(app_id, item_id)
}

/// Classify a page body by its marker and extract the id pairs
///
/// The collection marker wins when both are present, since collection pages
/// can embed item widgets of their own.
pub fn classify_page(html: &str) -> Option<PageKind> {
    if html.contains(steam::COLLECTION_MARKER) {
        let targets: Vec<_> = COLLECTION_ITEM_RE
            .captures_iter(html)
            .filter_map(captures_to_target)
            .collect();
        if targets.is_empty() {
            return None;
        }
        Some(PageKind::Collection(targets))
    } else if html.contains(steam::ITEM_MARKER) {
        ITEM_RE
            .captures(html)
            .and_then(captures_to_target)
            .map(PageKind::Item)
    } else {
        Some(PageKind::Unrecognized)
    }
}

/// Resolves workshop URLs into acquisition targets
#[derive(Debug)]
pub struct UrlResolver<P> {
    source: P,
}

impl<P: PageSource> UrlResolver<P> {
    pub fn new(source: P) -> Self {
        Self { source }
    }

    /// Resolve every non-blank line of `raw_text`, in line order
    ///
    /// Lines that fail are reported to `sink` as warnings and contribute
    /// nothing. Duplicate targets are kept; see
    /// [`dedup_targets`](crate::app::planner::dedup_targets).
    pub async fn resolve(&self, raw_text: &str, sink: &dyn ProgressSink) -> Vec<AcquisitionTarget> {
        let mut targets = Vec::new();

        for line in raw_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.resolve_page(line).await {
                Ok(kind) => {
                    match &kind {
                        PageKind::Collection(items) => sink.append_line(
                            &format!("Found collection with {} items", items.len()),
                            Severity::Info,
                        ),
                        PageKind::Item(item) => sink.append_line(
                            &format!("Found workshop item {}", item),
                            Severity::Info,
                        ),
                        PageKind::Unrecognized => {}
                    }
                    targets.extend(kind.into_targets());
                }
                Err(e) => {
                    warn!("Skipping line '{}': {}", line, e);
                    sink.append_line(&e.to_string(), Severity::Warning);
                }
            }
        }

        info!("Resolved {} workshop targets", targets.len());
        targets
    }

    /// Resolve a single URL
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the URL is invalid, the fetch fails, or the
    /// page carries no usable marker
    pub async fn resolve_line(&self, line: &str) -> ResolveResult<Vec<AcquisitionTarget>> {
        Ok(self.resolve_page(line).await?.into_targets())
    }

    /// Fetch and classify a single URL; never yields `PageKind::Unrecognized`
    async fn resolve_page(&self, line: &str) -> ResolveResult<PageKind> {
        let cleaned = strip_search_suffix(line.trim());
        let url = Url::parse(cleaned).map_err(|e| ResolveError::InvalidUrl {
            url: cleaned.to_string(),
            error: e.to_string(),
        })?;

        debug!("Fetching workshop page {}", url);
        let html = self
            .source
            .fetch_page(&url)
            .await
            .map_err(|source| ResolveError::Fetch {
                url: url.to_string(),
                source,
            })?;

        match classify_page(&html) {
            Some(PageKind::Unrecognized) => Err(ResolveError::NoMatch {
                url: url.to_string(),
            }),
            Some(kind) => Ok(kind),
            None => Err(ResolveError::MalformedMarker {
                url: url.to_string(),
                marker: if html.contains(steam::COLLECTION_MARKER) {
                    steam::COLLECTION_MARKER
                } else {
                    steam::ITEM_MARKER
                },
            }),
        }
    }
}
