//! Dispatch page fetcher.
//!
//! The Real-Time 911 page is served one calendar day at a time. An incident
//! dispatched shortly before midnight only appears on the previous day's
//! page, so a snapshot normally merges today's window with yesterday's.

use chrono::NaiveDate;
use sea_fires_feed_models::RawRow;

use crate::parser::RowParser;
use crate::{FeedError, retry};

/// Seattle Fire Department Real-Time 911 endpoint.
pub const DEFAULT_FEED_URL: &str =
    "http://www2.seattle.gov/fire/realtime911/getRecsForDatePub.asp";

/// Date format used by the `incDate` query parameter.
const DATE_PARAM_FORMAT: &str = "%m/%d/%Y";

/// One day's page of the dispatch feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedWindow {
    /// The current day, as the server sees it.
    Today,
    /// A specific calendar day.
    Day(NaiveDate),
}

impl FeedWindow {
    /// The query parameter selecting this window.
    #[must_use]
    pub fn query(&self) -> (&'static str, String) {
        match self {
            Self::Today => ("action", "Today".to_string()),
            Self::Day(date) => ("incDate", date.format(DATE_PARAM_FORMAT).to_string()),
        }
    }
}

/// Windows making up one snapshot: today, then optionally yesterday.
#[must_use]
pub fn snapshot_windows(today: NaiveDate, include_yesterday: bool) -> Vec<FeedWindow> {
    let mut windows = vec![FeedWindow::Today];
    if include_yesterday && let Some(yesterday) = today.pred_opt() {
        windows.push(FeedWindow::Day(yesterday));
    }
    windows
}

/// HTTP client for the dispatch feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl FeedClient {
    /// Creates a client for the feed at `base_url`, identifying itself with
    /// `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Downloads the raw page for one window.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the request fails after retries.
    pub async fn fetch_window(&self, window: FeedWindow) -> Result<String, FeedError> {
        let (key, value) = window.query();
        log::debug!("Fetching {} ({key}={value})", self.base_url);

        retry::send_text(|| {
            self.client
                .get(&self.base_url)
                .query(&[(key, value.as_str())])
        })
        .await
    }

    /// Fetches and parses every window of a snapshot, returning the merged
    /// active rows in window order.
    ///
    /// Rows are not deduplicated across windows. Any failed window fails
    /// the whole snapshot so that a partial feed is never reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if any window cannot be fetched.
    pub async fn fetch_snapshot(
        &self,
        today: NaiveDate,
        include_yesterday: bool,
    ) -> Result<Vec<RawRow>, FeedError> {
        let mut documents = Vec::new();
        for window in snapshot_windows(today, include_yesterday) {
            documents.push(self.fetch_window(window).await?);
        }

        Ok(merge_documents(documents.iter().map(String::as_str)))
    }
}

/// Parses each document with one reused [`RowParser`] and concatenates the
/// rows, in document order.
#[must_use]
pub fn merge_documents<'a>(documents: impl IntoIterator<Item = &'a str>) -> Vec<RawRow> {
    let mut parser = RowParser::new();
    let mut rows = Vec::new();

    for (index, document) in documents.into_iter().enumerate() {
        parser.feed(document);
        let document_rows = parser.take_rows();
        log::debug!("Document {index}: {} active row(s)", document_rows.len());
        rows.extend(document_rows);
    }

    rows
}
