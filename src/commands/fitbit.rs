use crate::commands::sheet::sync_subjective;
use crate::commands::{fitbit_client, load_tokens, save_tokens};
use crate::config::Paths;
use crate::error::{AppError, AppResult};
use crate::fitbit::{
  accept_callback, bind_callback_listener, build_auth_url, lookback_window, FitbitClient,
  FitbitConfig,
};
use crate::sheets::{SheetCredentials, SheetsClient};
use crate::store;
use chrono::{Local, NaiveDate};
use serde_json::Value;

/// ---------------------------------------------------------------------------
/// OAuth Flow
/// ---------------------------------------------------------------------------

/// Open the authorization page, wait for the redirect, and store the tokens.
pub async fn auth(paths: &Paths) -> AppResult<()> {
  let config = FitbitConfig::load(&paths.client_file())?;
  let auth_url = build_auth_url(&config)?;

  // Bind before opening the browser so a fast redirect can't miss us
  let listener = bind_callback_listener()?;

  println!("Opening browser for authorization...");
  if let Err(e) = opener::open(&auth_url) {
    log::warn!("Could not open browser: {}", e);
  }
  println!("If the browser did not open, visit:\n{}", auth_url);

  let callback = tokio::task::spawn_blocking(move || accept_callback(&listener))
    .await
    .map_err(|e| AppError::Server(e.to_string()))??;

  let tokens = FitbitClient::new(config).exchange_code(&callback.code).await?;
  save_tokens(paths, &tokens)?;

  println!("Authentication successful. Tokens saved.");
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Dump
/// ---------------------------------------------------------------------------

pub async fn dump(paths: &Paths, days: u32) -> AppResult<()> {
  let client = authenticated_client(paths)?;
  let window = lookback_window(Local::now().date_naive(), days);
  let records = dump_with(paths, &client, window).await?;

  let formatted = serde_json::to_string_pretty(&records)
    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
  println!("{}", formatted);
  Ok(())
}

/// Raw sleep records for `window`. Refreshed tokens are written back.
pub async fn dump_with(
  paths: &Paths,
  client: &FitbitClient,
  (start, end): (NaiveDate, NaiveDate),
) -> AppResult<Vec<Value>> {
  let mut tokens = load_tokens(paths)?;

  let fetched = client.fetch_sleep(&mut tokens, start, end).await?;
  if fetched.refreshed {
    save_tokens(paths, &tokens)?;
  }

  log::info!("Fetched {} sleep records ({} to {})", fetched.data.len(), start, end);
  Ok(fetched.data)
}

/// Fails with `NotAuthenticated` before `client.json` is consulted.
fn authenticated_client(paths: &Paths) -> AppResult<FitbitClient> {
  if !paths.tokens_file().exists() {
    return Err(AppError::NotAuthenticated);
  }
  fitbit_client(paths)
}

/// ---------------------------------------------------------------------------
/// Sync
/// ---------------------------------------------------------------------------

/// Record counts written by one sync. `subjective` is `None` when the
/// spreadsheet step was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
  pub sleep: usize,
  pub activities: usize,
  pub subjective: Option<usize>,
}

pub async fn sync(paths: &Paths, days: u32) -> AppResult<SyncSummary> {
  let client = authenticated_client(paths)?;
  let window = lookback_window(Local::now().date_naive(), days);
  sync_with(paths, &client, &SheetsClient::default(), window).await
}

/// Fetch sleep, activities and (if configured) the spreadsheet, replacing
/// each data file wholesale.
pub async fn sync_with(
  paths: &Paths,
  client: &FitbitClient,
  sheets: &SheetsClient,
  (start, end): (NaiveDate, NaiveDate),
) -> AppResult<SyncSummary> {
  let mut tokens = load_tokens(paths)?;

  let sleep = client.fetch_sleep(&mut tokens, start, end).await?;
  if sleep.refreshed {
    save_tokens(paths, &tokens)?;
  }
  store::write_json(&paths.sleep_file(), &sleep.data)?;
  println!("Saved {} sleep records", sleep.data.len());

  let activities = client.fetch_activities(&mut tokens, start).await?;
  if activities.refreshed {
    save_tokens(paths, &tokens)?;
  }
  store::write_json(&paths.activities_file(), &activities.data)?;
  println!("Saved {} activities", activities.data.len());

  let credentials_file = paths.google_credentials_file();
  let subjective = if credentials_file.exists() {
    let credentials = SheetCredentials::load(&credentials_file)?;
    Some(sync_subjective(paths, sheets, &credentials).await?)
  } else {
    println!(
      "Skipping spreadsheet: {} not found",
      credentials_file.display()
    );
    None
  };

  Ok(SyncSummary {
    sleep: sleep.data.len(),
    activities: activities.data.len(),
    subjective,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
