use crate::config::Paths;
use crate::error::AppResult;
use crate::sheets::{parse_rows, SheetCredentials, SheetsClient};
use crate::store;

/// Refresh `subjective.json` from the spreadsheet alone.
pub async fn sheet(paths: &Paths) -> AppResult<usize> {
  let credentials = SheetCredentials::load(&paths.google_credentials_file())?;
  sync_subjective(paths, &SheetsClient::default(), &credentials).await
}

pub(crate) async fn sync_subjective(
  paths: &Paths,
  client: &SheetsClient,
  credentials: &SheetCredentials,
) -> AppResult<usize> {
  let rows = client.fetch_rows(credentials).await?;
  let records = parse_rows(&rows);
  log::debug!("Parsed {} of {} spreadsheet rows", records.len(), rows.len());

  store::write_json(&paths.subjective_file(), &records)?;
  println!("Saved {} subjective ratings", records.len());
  Ok(records.len())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::tests::temp_paths;
  use crate::error::AppError;
  use crate::sheets::SheetsError;
  use crate::subjective::SubjectiveRecord;
  use crate::test_utils::date;
  use chrono::NaiveDate;
  use std::collections::BTreeMap;

  #[tokio::test]
  async fn test_sheet_requires_credentials() {
    let (_dir, paths) = temp_paths();
    let result = sheet(&paths).await;
    assert!(matches!(
      result,
      Err(AppError::Sheets(SheetsError::MissingCredentials(_)))
    ));
  }

  #[tokio::test]
  async fn test_sync_subjective_replaces_file() {
    let (_dir, paths) = temp_paths();
    store::write_json(&paths.subjective_file(), &serde_json::json!({"2024-12-01": {
      "code": "a", "score": 1, "raw": "a1", "exclude": false
    }}))
    .unwrap();

    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", mockito::Matcher::Regex(r"^/v4/spreadsheets/s1/values/".into()))
      .with_status(200)
      .with_body(r#"{"values":[["1/5/2025","x"],["2025-01-06","c8"]]}"#)
      .create_async()
      .await;

    let credentials = SheetCredentials {
      api_key: "k".to_string(),
      spreadsheet_id: "s1".to_string(),
      range: "Sheet1!A:B".to_string(),
    };
    let count = sync_subjective(&paths, &SheetsClient::with_base(&server.url()), &credentials)
      .await
      .unwrap();
    assert_eq!(count, 2);

    let stored: BTreeMap<NaiveDate, SubjectiveRecord> =
      store::read_json(&paths.subjective_file()).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[&date("2025-01-05")].exclude);
    assert_eq!(stored[&date("2025-01-06")].code.as_deref(), Some("c"));
  }
}
