//! Google Sheets API client
//!
//! Implements [`Connector`] on top of the Sheets v4 `values.get` endpoint,
//! authenticating with a service account.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::auth::{ServiceAccount, SPREADSHEETS_READONLY_SCOPE};
use super::{Connector, FetchError, Row, SheetSource};

/// Base URL for the Sheets API
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Response body of `spreadsheets.values.get`
#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range holds no data
    #[serde(default)]
    values: Vec<Row>,
}

/// Connector for spreadsheets hosted on Google Sheets
#[derive(Debug, Clone)]
pub struct GoogleSheets {
    client: Client,
    base_url: String,
}

impl Default for GoogleSheets {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleSheets {
    /// Create a connector talking to the public Sheets API
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    /// Create a connector with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    /// Point the connector at another Sheets-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Connector for GoogleSheets {
    async fn connect(
        &self,
        credentials: &str,
        spreadsheet_id: &str,
    ) -> Result<Box<dyn SheetSource>, FetchError> {
        let account = ServiceAccount::from_json(credentials)?;
        let token = account
            .access_token(&self.client, SPREADSHEETS_READONLY_SCOPE)
            .await?;
        tracing::debug!(client_email = %account.client_email, "obtained sheets access token");

        Ok(Box::new(SheetsSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        }))
    }
}

/// An authenticated session bound to one spreadsheet
struct SheetsSession {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
}

#[async_trait]
impl SheetSource for SheetsSession {
    async fn read_range(&self, range: &str) -> Result<Vec<Row>, FetchError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream(format!(
                "reading {range} failed with {status}: {body}"
            )));
        }

        let text = response.text().await?;
        let value_range: ValueRange = serde_json::from_str(&text)
            .map_err(|e| FetchError::Upstream(format!("invalid response for {range}: {e}")))?;

        Ok(value_range.values)
    }
}
