//! Google Sheets integration for subjective sleep annotations
//!
//! The sheet holds one row per night: a date in column A and a short quality
//! code in column B (see `subjective`). Rows are read through the Sheets v4
//! values endpoint with an API key, so the sheet must be link-readable.

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

use crate::subjective::{parse_subjective, SubjectiveRecord};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_RANGE: &str = "Sheet1!A:B";
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// ---------------------------------------------------------------------------
/// Credentials
/// ---------------------------------------------------------------------------

/// `google-credentials.json`
#[derive(Debug, Clone, Deserialize)]
pub struct SheetCredentials {
  pub api_key: String,
  pub spreadsheet_id: String,
  #[serde(default = "default_range")]
  pub range: String,
}

fn default_range() -> String {
  DEFAULT_RANGE.to_string()
}

impl SheetCredentials {
  pub fn load(path: &Path) -> Result<Self, SheetsError> {
    if !path.exists() {
      return Err(SheetsError::MissingCredentials(path.display().to_string()));
    }

    let raw = std::fs::read_to_string(path)
      .map_err(|e| SheetsError::InvalidCredentials(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
      .map_err(|e| SheetsError::InvalidCredentials(format!("{}: {}", path.display(), e)))
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
  #[error("Missing spreadsheet credentials: {0}")]
  MissingCredentials(String),

  #[error("Invalid spreadsheet credentials: {0}")]
  InvalidCredentials(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Sheets API error {status}: {body}")]
  Api { status: StatusCode, body: String },
}

/// ---------------------------------------------------------------------------
/// API Client
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ValueRange {
  #[serde(default)]
  values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
  http: Client,
  api_base: String,
}

impl Default for SheetsClient {
  fn default() -> Self {
    Self::with_base(SHEETS_API_BASE)
  }
}

impl SheetsClient {
  pub fn with_base(api_base: &str) -> Self {
    Self {
      http: Client::new(),
      api_base: api_base.to_string(),
    }
  }

  fn values_url(&self, credentials: &SheetCredentials) -> Result<Url, SheetsError> {
    let mut url = Url::parse(&self.api_base)
      .map_err(|e| SheetsError::InvalidCredentials(format!("bad API base: {}", e)))?;

    url
      .path_segments_mut()
      .map_err(|_| SheetsError::InvalidCredentials("bad API base".to_string()))?
      .pop_if_empty()
      .extend([
        "v4",
        "spreadsheets",
        credentials.spreadsheet_id.as_str(),
        "values",
        credentials.range.as_str(),
      ]);
    url.query_pairs_mut().append_pair("key", &credentials.api_key);

    Ok(url)
  }

  /// All rows in the configured range, cells rendered as strings
  pub async fn fetch_rows(&self, credentials: &SheetCredentials) -> Result<Vec<Vec<String>>, SheetsError> {
    let url = self.values_url(credentials)?;
    let response = self.http.get(url).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(SheetsError::Api { status, body });
    }

    let range: ValueRange = response.json().await?;
    Ok(
      range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect(),
    )
  }
}

fn cell_text(cell: Value) -> String {
  match cell {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Row Parsing
/// ---------------------------------------------------------------------------

fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  DATE_FORMATS
    .iter()
    .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Rows without a recognisable date (headers) or without a code are skipped.
/// A later row for the same date replaces an earlier one.
pub fn parse_rows(rows: &[Vec<String>]) -> BTreeMap<NaiveDate, SubjectiveRecord> {
  let mut by_date = BTreeMap::new();

  for row in rows {
    let (Some(date_cell), Some(code_cell)) = (row.first(), row.get(1)) else {
      continue;
    };
    let Some(date) = parse_sheet_date(date_cell) else {
      log::debug!("Skipping sheet row with unparseable date {:?}", date_cell);
      continue;
    };
    let code = code_cell.trim();
    if code.is_empty() {
      continue;
    }
    by_date.insert(date, parse_subjective(code));
  }

  by_date
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
