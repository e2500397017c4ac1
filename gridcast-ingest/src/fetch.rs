use std::time::Duration;

use async_trait::async_trait;
use csv::StringRecord;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::error::SyncError;

pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Raw rows for one fetch window, headers kept so downstream mapping is
/// by column name, never by position.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

/// Remote source boundary: one inclusive calendar-date range per call.
///
/// Implementations hold no state and never retry; a failed call surfaces as
/// `SyncError::Fetch` and the scheduler's next invocation retries naturally.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, start: Date, end: Date) -> Result<RawBatch, SyncError>;
}

/// Downloads the REN datahub production-breakdown CSV export.
pub struct RenDatahubFetcher {
    client: reqwest::Client,
    base_url: String,
    culture: String,
}

impl RenDatahubFetcher {
    pub fn new(
        base_url: impl Into<String>,
        culture: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Fetch(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            culture: culture.into(),
        })
    }
}

#[async_trait]
impl Fetch for RenDatahubFetcher {
    async fn fetch(&self, start: Date, end: Date) -> Result<RawBatch, SyncError> {
        let url = format!(
            "{}?startDateString={}&endDateString={}&culture={}",
            self.base_url,
            start.format(DATE_FORMAT)?,
            end.format(DATE_FORMAT)?,
            self.culture
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SyncError::Fetch(format!("non-success response: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Fetch(format!("failed to read response body: {e}")))?;

        parse_payload(&body)
    }
}

/// The export starts with a two-line title preamble before the real header.
const PREAMBLE_LINES: usize = 2;

/// Parse the `;`-separated export body. A payload that cannot be parsed as
/// CSV is a fetch failure: the remote sent something other than the export.
pub(crate) fn parse_payload(body: &str) -> Result<RawBatch, SyncError> {
    let mut rest = body;
    for _ in 0..PREAMBLE_LINES {
        match rest.split_once('\n') {
            Some((_, tail)) => rest = tail,
            None => {
                return Err(SyncError::Fetch(
                    "payload shorter than the expected preamble".to_string(),
                ))
            }
        }
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(rest.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| SyncError::Fetch(format!("failed to read payload header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| SyncError::Fetch(format!("malformed payload row: {e}")))?;
        rows.push(record);
    }

    Ok(RawBatch { headers, rows })
}
