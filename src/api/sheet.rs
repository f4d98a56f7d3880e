//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.

use crate::api::{A1Range, CellValue, Grid, Sheet, TokenProvider};
use crate::error::Res;
use crate::Config;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use tracing::trace;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait against the Google Sheets API. Reads go through `sheets::Client`.
/// The first-tab lookup and the `RAW` write go straight to the REST API with `reqwest` because the
/// generated client has no field mask and always sends strings. It takes a `TokenProvider`, on
/// which it calls refresh to keep the token up-to-date.
pub(crate) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(crate) fn new(config: &Config, token_provider: TokenProvider) -> Self {
        Self {
            spreadsheet_id: config.spreadsheet_id().to_string(),
            token_provider,
            http: reqwest::Client::new(),
        }
    }

    /// Creates a new sheets client with a refreshed access token.
    async fn client(&mut self) -> Res<sheets::Client> {
        let access_token = self.token_provider.token_with_refresh().await?;
        // The sheets crate wants client_id, client_secret and redirect_uri for its own OAuth
        // handling. We only ever hand it an access token.
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token,
            String::new(),
        ))
    }

    fn url(&self, segments: &[&str]) -> Res<Url> {
        let mut url = Url::parse(SHEETS_API).context("Invalid Sheets API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("The Sheets API URL cannot be a base"))?
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn first_tab(&mut self) -> Res<String> {
        trace!("first_tab for {}", self.spreadsheet_id);
        let token = self.token_provider.token_with_refresh().await?;
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send the spreadsheet metadata request")?;
        let tabs: SpreadsheetTabs = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse the spreadsheet metadata")?;
        tabs.sheets
            .into_iter()
            .next()
            .map(|tab| tab.properties.title)
            .context("The spreadsheet has no tabs")
    }

    async fn get_column(&mut self, range: &A1Range) -> Res<Grid> {
        trace!("get_column for {range}");
        let response = self
            .client()
            .await?
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range.to_string(),
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response.body.values)
    }

    async fn batch_get_columns(&mut self, ranges: &[A1Range]) -> Res<Vec<Grid>> {
        trace!("batch_get_columns for {} ranges", ranges.len());
        let names: Vec<String> = ranges.iter().map(|r| r.to_string()).collect();
        let response = self
            .client()
            .await?
            .spreadsheets()
            .values_batch_get(
                &self.spreadsheet_id,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                &names,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {}", names.join(", ")))?;
        let grids: Vec<Grid> = response
            .body
            .value_ranges
            .into_iter()
            .map(|value_range| value_range.values)
            .collect();
        ensure!(
            grids.len() == ranges.len(),
            "Asked for {} ranges but received {}",
            ranges.len(),
            grids.len()
        );
        Ok(grids)
    }

    async fn write_cells(&mut self, range: &A1Range, values: &[CellValue]) -> Res<()> {
        trace!("write_cells for {range}");
        let token = self.token_provider.token_with_refresh().await?;
        let range_name = range.to_string();
        let mut url = self.url(&["values", &range_name])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let body = WriteRequest {
            range: &range_name,
            major_dimension: "ROWS",
            values: [values],
        };
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send the write request for {range}"))?;
        check_status(response).await?;
        Ok(())
    }
}

/// The part of the spreadsheet metadata that we ask for with
/// `fields=sheets.properties.title`. Tabs come back in display order.
#[derive(Debug, Deserialize)]
struct SpreadsheetTabs {
    #[serde(default)]
    sheets: Vec<TabEntry>,
}

#[derive(Debug, Deserialize)]
struct TabEntry {
    properties: TabProperties,
}

#[derive(Debug, Deserialize)]
struct TabProperties {
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest<'a> {
    range: &'a str,
    major_dimension: &'a str,
    values: [&'a [CellValue]; 1],
}

async fn check_status(response: reqwest::Response) -> Res<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    bail!("Google Sheets API request failed with status {status}: {body}")
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_tabs_deserialize() {
        let json = r#"{"sheets":[{"properties":{"title":"November 2025"}},{"properties":{"title":"October 2025"}}]}"#;
        let tabs: SpreadsheetTabs = serde_json::from_str(json).unwrap();
        assert_eq!(tabs.sheets[0].properties.title, "November 2025");
        let empty: SpreadsheetTabs = serde_json::from_str("{}").unwrap();
        assert!(empty.sheets.is_empty());
    }

    #[test]
    fn test_write_request_body() {
        let values = vec![
            CellValue::Text("Lunch".to_string()),
            CellValue::Number(Decimal::from_str("2.95").unwrap()),
        ];
        let body = WriteRequest {
            range: "'October 2025'!A8:B8",
            major_dimension: "ROWS",
            values: [values.as_slice()],
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"range":"'October 2025'!A8:B8","majorDimension":"ROWS","values":[["Lunch",2.95]]}"#
        );
    }
}
