//! Timeline fetcher
//!
//! Reads the `events` and `eras` ranges from the spreadsheet and turns them
//! into one complete [`Timeline`]. A fetch either produces the whole
//! timeline or an error; nothing partial ever leaves this module.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::rows::{parse_era_row, parse_event_row, ParseError};
use super::Timeline;

/// Environment variable holding the service-account credentials blob
pub const CREDENTIALS_ENV: &str = "GOOGLE_JSON_CREDENTIALS";

/// Environment variable holding the spreadsheet identifier
pub const SPREADSHEET_ID_ENV: &str = "SPREADSHEET_ID";

/// Range holding events: start, end, title, description, group
pub const EVENTS_RANGE: &str = "events!A2:E";

/// Range holding eras: start, end, title
pub const ERAS_RANGE: &str = "eras!A2:C";

/// Sheet line of the first data row; line 1 is the header
pub const FIRST_DATA_LINE: usize = 2;

/// Upper bound on a whole fetch unless configured otherwise
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// One row of cells as returned by the source
pub type Row = Vec<Value>;

/// Broad category of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Configuration,
    Upstream,
    RowParse,
}

/// Errors that can occur while fetching a timeline
#[derive(Debug, Error)]
pub enum FetchError {
    /// A required setting is missing or unusable
    #[error("{0}")]
    Configuration(String),

    /// Authentication, connection or remote service failure
    #[error("upstream: {0}")]
    Upstream(String),

    /// A row in one of the sheets is malformed
    #[error(transparent)]
    RowParse(#[from] ParseError),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Configuration(_) => FetchErrorKind::Configuration,
            FetchError::Upstream(_) => FetchErrorKind::Upstream,
            FetchError::RowParse(_) => FetchErrorKind::RowParse,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Upstream(err.to_string())
    }
}

/// An open session against one spreadsheet
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Reads every row of `range` (A1 notation), in sheet order.
    ///
    /// Rows may be shorter than the range when trailing cells are empty.
    async fn read_range(&self, range: &str) -> Result<Vec<Row>, FetchError>;
}

/// Opens authenticated sessions against a spreadsheet backend
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticates with `credentials` and binds the session to `spreadsheet_id`.
    async fn connect(
        &self,
        credentials: &str,
        spreadsheet_id: &str,
    ) -> Result<Box<dyn SheetSource>, FetchError>;
}

/// Settings consulted on every fetch
#[derive(Clone)]
pub struct FetchConfig {
    /// Service-account credentials blob (JSON)
    pub credentials: Option<String>,
    /// Identifier of the spreadsheet to read
    pub spreadsheet_id: Option<String>,
    /// Deadline for connecting and reading both ranges
    pub timeout: Duration,
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            spreadsheet_id: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Builds complete timelines from a spreadsheet backend
#[derive(Clone)]
pub struct Fetcher {
    connector: Arc<dyn Connector>,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(connector: Arc<dyn Connector>, config: FetchConfig) -> Self {
        Self { connector, config }
    }

    /// Fetches and parses both sheets.
    ///
    /// # Returns
    /// * `Ok(Timeline)` - every row of both ranges parsed, in sheet order
    /// * `Err(FetchError::Configuration)` - credentials or spreadsheet id not set or empty
    /// * `Err(FetchError::Upstream)` - auth, network or remote failure, or the deadline passed
    /// * `Err(FetchError::RowParse)` - the first malformed row of either range
    pub async fn fetch_timeline(&self) -> Result<Timeline, FetchError> {
        let credentials = self
            .config
            .credentials
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FetchError::Configuration(format!("{CREDENTIALS_ENV} not found")))?;
        let spreadsheet_id = self
            .config
            .spreadsheet_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FetchError::Configuration(format!("{SPREADSHEET_ID_ENV} not found")))?;

        let timeout = self.config.timeout;
        tokio::time::timeout(timeout, self.read_timeline(credentials, spreadsheet_id))
            .await
            .map_err(|_| FetchError::Upstream(format!("timed out after {}s", timeout.as_secs_f64())))?
    }

    async fn read_timeline(
        &self,
        credentials: &str,
        spreadsheet_id: &str,
    ) -> Result<Timeline, FetchError> {
        let source = self.connector.connect(credentials, spreadsheet_id).await?;

        let rows = source.read_range(EVENTS_RANGE).await?;
        let events = parse_rows(&rows, parse_event_row)?;

        let rows = source.read_range(ERAS_RANGE).await?;
        let eras = parse_rows(&rows, parse_era_row)?;

        tracing::debug!(events = events.len(), eras = eras.len(), "fetched timeline");
        Ok(Timeline { events, eras })
    }
}

/// Parses every row, stopping at the first failure.
fn parse_rows<T>(
    rows: &[Row],
    parse: fn(&[Value], usize) -> Result<T, ParseError>,
) -> Result<Vec<T>, ParseError> {
    rows.iter()
        .enumerate()
        .map(|(i, cells)| parse(cells, i + FIRST_DATA_LINE))
        .collect()
}
