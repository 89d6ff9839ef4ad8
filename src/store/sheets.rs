//! Google Sheets v4 adapter
//!
//! Plain REST over a blocking `reqwest` client with a bearer token. Obtaining
//! the token is left to the caller (`SHEETS_ACCESS_TOKEN`).

use super::{quoted_sheet, AppendReceipt, SheetPort};
use crate::config::{column_letters, ColumnIndices, Config};
use crate::error::StoreError;
use crate::format::{FormatRequest, Rgb};
use crate::types::{HistoryRow, SourceRow};
use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DESTINATION_COLUMNS: &str = "A:H";

pub struct SheetsClient {
    client: Client,
    token: String,
    spreadsheet_id: String,
    source_sheet: String,
    destination_sheet: String,
    columns: ColumnIndices,
    destination_sheet_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: String,
    #[serde(default)]
    updated_rows: usize,
    #[serde(default)]
    updated_cells: usize,
}

impl SheetsClient {
    pub fn new(config: &Config, token: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent("topten_keywords/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            token,
            spreadsheet_id: config.spreadsheet_id.clone(),
            source_sheet: config.source_sheet.clone(),
            destination_sheet: config.destination_sheet.clone(),
            columns: config.source_columns.indices()?,
            destination_sheet_id: None,
        })
    }

    /// Build from config, reading the bearer token from `SHEETS_ACCESS_TOKEN`.
    pub fn from_env(config: &Config) -> Result<Self> {
        let token = std::env::var("SHEETS_ACCESS_TOKEN")
            .context("SHEETS_ACCESS_TOKEN is not set")?;
        Self::new(config, token)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(API_BASE).map_err(|e| StoreError::Malformed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed("API base cannot carry a path".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", range])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("majorDimension", "ROWS")])
            .send()?;
        let body: ValueRange = check(resp)?.json()?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    fn batch_update(&self, requests: Vec<Value>) -> Result<(), StoreError> {
        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url(&[batch.as_str()])?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "requests": requests }))
            .send()?;
        check(resp)?;
        Ok(())
    }

    fn destination_sheet_id(&mut self) -> Result<i64, StoreError> {
        if let Some(id) = self.destination_sheet_id {
            return Ok(id);
        }
        let url = self.url(&[self.spreadsheet_id.as_str()])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("fields", "sheets.properties")])
            .send()?;
        let meta: Value = check(resp)?.json()?;
        let id = find_sheet_id(&meta, &self.destination_sheet)
            .ok_or_else(|| StoreError::SheetNotFound(self.destination_sheet.clone()))?;
        self.destination_sheet_id = Some(id);
        Ok(id)
    }
}

impl SheetPort for SheetsClient {
    fn read_source_rows(&mut self) -> Result<Vec<SourceRow>, StoreError> {
        let range = format!(
            "{}!A1:{}",
            quoted_sheet(&self.source_sheet),
            column_letters(self.columns.max())
        );
        let values = self.get_values(&range)?;
        debug!(rows = values.len(), "source rows read");

        let cols = self.columns;
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
                SourceRow {
                    row_number: u32::try_from(i + 1).unwrap_or(u32::MAX),
                    category_id: cell(cols.category_id),
                    category_name: cell(cols.category_name),
                    raw_html: cell(cols.html),
                    marker: cell(cols.marker),
                }
            })
            .collect())
    }

    fn mark_row(&mut self, row_number: u32, message: &str) -> Result<(), StoreError> {
        let range = format!(
            "{}!{}{}",
            quoted_sheet(&self.source_sheet),
            column_letters(self.columns.marker),
            row_number
        );
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", range.as_str()])?;
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": [[message]] }))
            .send()?;
        check(resp)?;
        Ok(())
    }

    fn read_destination_rows(&mut self) -> Result<Vec<HistoryRow>, StoreError> {
        let range = format!("{}!{}", quoted_sheet(&self.destination_sheet), DESTINATION_COLUMNS);
        Ok(self
            .get_values(&range)?
            .into_iter()
            .map(|cells| HistoryRow { cells })
            .collect())
    }

    fn row_background(&mut self, row_number: usize) -> Result<Option<Rgb>, StoreError> {
        let range = format!("{}!A{}", quoted_sheet(&self.destination_sheet), row_number);
        let url = self.url(&[self.spreadsheet_id.as_str()])?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[
                ("ranges", range.as_str()),
                ("fields", "sheets.data.rowData.values.userEnteredFormat.backgroundColor"),
            ])
            .send()?;
        let body: Value = check(resp)?.json()?;
        background_from_response(&body)
    }

    fn append_results(&mut self, rows: &[Vec<String>]) -> Result<AppendReceipt, StoreError> {
        let append = format!(
            "{}!{}:append",
            quoted_sheet(&self.destination_sheet),
            DESTINATION_COLUMNS
        );
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", append.as_str()])?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": rows }))
            .send()?;
        let body: AppendResponse = check(resp)?.json()?;
        let updates = body
            .updates
            .ok_or_else(|| StoreError::Malformed("append response has no updates".to_string()))?;

        Ok(AppendReceipt {
            updated_range: updates.updated_range,
            updated_rows: if updates.updated_rows > 0 { updates.updated_rows } else { rows.len() },
            updated_cells: updates.updated_cells,
        })
    }

    fn apply_formatting(&mut self, requests: &[FormatRequest]) -> Result<(), StoreError> {
        if requests.is_empty() {
            return Ok(());
        }
        let sheet_id = self.destination_sheet_id()?;
        let body: Vec<Value> = requests
            .iter()
            .map(|r| repeat_cell(sheet_id, r))
            .collect();
        self.batch_update(body)
    }
}

fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    })
}

fn cell_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
        other => other.to_string(),
    }
}

fn find_sheet_id(meta: &Value, title: &str) -> Option<i64> {
    meta.get("sheets")?
        .as_array()?
        .iter()
        .filter_map(|s| s.get("properties"))
        .find(|p| p.get("title").and_then(Value::as_str) == Some(title))
        .and_then(|p| p.get("sheetId"))
        .and_then(Value::as_i64)
}

fn background_from_response(body: &Value) -> Result<Option<Rgb>, StoreError> {
    match body.pointer("/sheets/0/data/0/rowData/0/values/0/userEnteredFormat/backgroundColor") {
        None => Ok(None),
        Some(color) => serde_json::from_value(color.clone())
            .map(Some)
            .map_err(|e| StoreError::Malformed(format!("backgroundColor: {}", e))),
    }
}

fn repeat_cell(sheet_id: i64, request: &FormatRequest) -> Value {
    match request {
        FormatRequest::TextColor { row, column, color } => json!({
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": row,
                    "endRowIndex": row + 1,
                    "startColumnIndex": column,
                    "endColumnIndex": column + 1,
                },
                "cell": { "userEnteredFormat": { "textFormat": { "foregroundColor": color } } },
                "fields": "userEnteredFormat.textFormat.foregroundColor",
            }
        }),
        FormatRequest::Background {
            start_row,
            end_row,
            columns,
            color,
        } => json!({
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": start_row,
                    "endRowIndex": end_row,
                    "startColumnIndex": columns.start,
                    "endColumnIndex": columns.end,
                },
                "cell": { "userEnteredFormat": { "backgroundColor": color } },
                "fields": "userEnteredFormat.backgroundColor",
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BLUE, WHITE};

    #[test]
    fn test_background_from_response() {
        let body = json!({
            "sheets": [{ "data": [{ "rowData": [{ "values": [{
                "userEnteredFormat": { "backgroundColor": { "red": 0.9019608, "green": 0.9019608, "blue": 0.9019608 } }
            }]}]}]}]
        });
        let color = background_from_response(&body).unwrap().unwrap();
        assert!((color.red - 0.9019608).abs() < 1e-9);

        let unset = json!({ "sheets": [{ "data": [{ "rowData": [{ "values": [{}] }] }] }] });
        assert_eq!(background_from_response(&unset).unwrap(), None);
    }

    #[test]
    fn test_black_background_has_omitted_channels() {
        let body = json!({
            "sheets": [{ "data": [{ "rowData": [{ "values": [{
                "userEnteredFormat": { "backgroundColor": {} }
            }]}]}]}]
        });
        let color = background_from_response(&body).unwrap().unwrap();
        assert_eq!((color.red, color.green, color.blue), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_find_sheet_id() {
        let meta = json!({ "sheets": [
            { "properties": { "sheetId": 0, "title": "Sheet1" } },
            { "properties": { "sheetId": 42, "title": "Top10" } },
        ]});
        assert_eq!(find_sheet_id(&meta, "Top10"), Some(42));
        assert_eq!(find_sheet_id(&meta, "missing"), None);
    }

    #[test]
    fn test_repeat_cell_shapes() {
        let text = repeat_cell(7, &FormatRequest::TextColor { row: 9, column: 6, color: BLUE });
        assert_eq!(text["repeatCell"]["range"]["startRowIndex"], 9);
        assert_eq!(text["repeatCell"]["range"]["endColumnIndex"], 7);
        assert_eq!(text["repeatCell"]["cell"]["userEnteredFormat"]["textFormat"]["foregroundColor"]["blue"], 1.0);

        let band = repeat_cell(
            7,
            &FormatRequest::Background { start_row: 9, end_row: 19, columns: 0..9, color: WHITE },
        );
        assert_eq!(band["repeatCell"]["range"]["sheetId"], 7);
        assert_eq!(band["repeatCell"]["range"]["endRowIndex"], 19);
        assert_eq!(band["repeatCell"]["range"]["endColumnIndex"], 9);
        assert_eq!(band["repeatCell"]["fields"], "userEnteredFormat.backgroundColor");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&json!("a")), "a");
        assert_eq!(cell_to_string(&json!(5)), "5");
        assert_eq!(cell_to_string(&json!(true)), "TRUE");
        assert_eq!(cell_to_string(&Value::Null), "");
    }
}
