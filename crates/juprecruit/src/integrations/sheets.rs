//! Google Sheets v4 implementation of the submission ledger.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::IntegrationError;
use crate::config::SheetTarget;
use crate::recruitment::ledger::{
    header_range, headers_need_update, AppendOutcome, LedgerError, LedgerRow, SubmissionLedger,
    JOB_HEADERS, TALENT_HEADERS,
};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies OAuth bearer tokens for the spreadsheets scope.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, LedgerError>;
}

pub struct GoogleSheetsLedger {
    http: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
    talent: SheetTarget,
    jobs: SheetTarget,
}

impl fmt::Debug for GoogleSheetsLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSheetsLedger")
            .field("base_url", &self.base_url)
            .field("talent", &self.talent)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl GoogleSheetsLedger {
    pub fn new(
        tokens: Arc<dyn AccessTokenSource>,
        talent: SheetTarget,
        jobs: SheetTarget,
    ) -> Result<Self, IntegrationError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: SHEETS_API_BASE.to_string(),
            tokens,
            talent,
            jobs,
        })
    }

    /// Point the ledger at another Sheets endpoint (used against mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn spreadsheet_url(&self, target: &SheetTarget) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(&target.spreadsheet_id)
        )
    }

    fn values_url(&self, target: &SheetTarget, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(target),
            urlencoding::encode(range)
        )
    }

    /// Add the target tab when the spreadsheet does not have it yet.
    async fn ensure_sheet(&self, target: &SheetTarget, token: &str) -> Result<(), LedgerError> {
        let response = self
            .http
            .get(self.spreadsheet_url(target))
            .query(&[("fields", "sheets.properties")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(backend)?;
        let spreadsheet: Spreadsheet = decode(check(response).await?).await?;

        let exists = spreadsheet
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == target.title);
        if exists {
            return Ok(());
        }

        let request = json!({
            "requests": [{ "addSheet": { "properties": { "title": target.title } } }]
        });
        let response = self
            .http
            .post(format!("{}:batchUpdate", self.spreadsheet_url(target)))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(backend)?;
        check(response).await?;
        info!(title = %target.title, "ledger sheet created");
        Ok(())
    }

    /// Write the header row when it is missing or shorter than the expected layout.
    async fn ensure_headers(
        &self,
        target: &SheetTarget,
        headers: &[&str],
        token: &str,
    ) -> Result<(), LedgerError> {
        let range = header_range(&target.title, headers.len());
        let response = self
            .http
            .get(self.values_url(target, &range))
            .bearer_auth(token)
            .send()
            .await
            .map_err(backend)?;
        let current: ValueRange = decode(check(response).await?).await?;
        let first_row = current.values.first().map(Vec::as_slice);

        if !headers_need_update(first_row, headers) {
            return Ok(());
        }

        let response = self
            .http
            .put(self.values_url(target, &range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(token)
            .json(&json!({ "range": range, "values": [headers] }))
            .send()
            .await
            .map_err(backend)?;
        check(response).await?;
        debug!(%range, "ledger headers written");
        Ok(())
    }

    async fn append(
        &self,
        target: &SheetTarget,
        row: LedgerRow,
        token: &str,
    ) -> Result<AppendOutcome, LedgerError> {
        let url = format!(
            "{}/values/{}:append",
            self.spreadsheet_url(target),
            urlencoding::encode(&target.title)
        );
        let response = self
            .http
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(token)
            .json(&json!({ "values": [row.cells()] }))
            .send()
            .await
            .map_err(backend)?;
        let appended: AppendResponse = decode(check(response).await?).await?;

        Ok(AppendOutcome {
            updated_range: appended.updates.updated_range,
        })
    }
}

#[async_trait]
impl SubmissionLedger for GoogleSheetsLedger {
    async fn append_talent(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        let token = self.tokens.access_token().await?;
        self.ensure_headers(&self.talent, &TALENT_HEADERS, &token)
            .await?;
        self.append(&self.talent, row, &token).await
    }

    async fn append_job_application(&self, row: LedgerRow) -> Result<AppendOutcome, LedgerError> {
        let token = self.tokens.access_token().await?;
        self.ensure_sheet(&self.jobs, &token).await?;
        self.ensure_headers(&self.jobs, &JOB_HEADERS, &token).await?;
        self.append(&self.jobs, row, &token).await
    }
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: String,
}

async fn check(response: Response) -> Result<Response, LedgerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(LedgerError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LedgerError::Auth(message)),
        _ => Err(LedgerError::Backend(format!("{status}: {message}"))),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, LedgerError> {
    response
        .json::<T>()
        .await
        .map_err(|err| LedgerError::Backend(format!("unexpected spreadsheet payload: {err}")))
}

fn backend(err: reqwest::Error) -> LedgerError {
    LedgerError::Backend(err.to_string())
}
