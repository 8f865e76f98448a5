//! Fitbit integration for sleep and activity data
//!
//! This module handles Fitbit OAuth (authorization code grant, HTTP Basic
//! client authentication) and the two data endpoints we read. Data requests
//! that come back 401 are retried exactly once after a token refresh.

use chrono::{Duration, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const FITBIT_AUTH_URL: &str = "https://www.fitbit.com/oauth2/authorize";
const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
const FITBIT_API_BASE: &str = "https://api.fitbit.com";
const REDIRECT_PORT: u16 = 8080;
const REDIRECT_URI: &str = "http://localhost:8080/";
const SCOPES: &str = "sleep activity";
const ACTIVITY_PAGE_LIMIT: u32 = 100;

/// ---------------------------------------------------------------------------
/// OAuth Data Structures
/// ---------------------------------------------------------------------------

/// Registered application credentials (`client.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct FitbitConfig {
  pub client_id: String,
  pub client_secret: String,
  #[serde(skip, default = "default_redirect_uri")]
  pub redirect_uri: String,
}

fn default_redirect_uri() -> String {
  REDIRECT_URI.to_string()
}

impl FitbitConfig {
  pub fn load(path: &Path) -> Result<Self, FitbitError> {
    if !path.exists() {
      return Err(FitbitError::MissingConfig(format!(
        "Missing {}. Create it with:\n{{\"client_id\": \"YOUR_ID\", \"client_secret\": \"YOUR_SECRET\"}}",
        path.display()
      )));
    }

    let raw = std::fs::read_to_string(path)
      .map_err(|e| FitbitError::MissingConfig(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
      .map_err(|e| FitbitError::MissingConfig(format!("Invalid {}: {}", path.display(), e)))
  }
}

/// Token endpoint response, stored as-is in `tokens.json`.
/// Fields we don't use (`expires_in`, `user_id`, `scope`, ...) ride along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitbitTokens {
  pub access_token: String,
  pub refresh_token: String,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, Value>,
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FitbitError {
  #[error("{0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("OAuth error: {0}")]
  OAuth(String),

  #[error("Callback server error: {0}")]
  Server(String),

  #[error("API error {status}: {body}")]
  Api { status: StatusCode, body: String },
}

/// ---------------------------------------------------------------------------
/// OAuth URL Generation
/// ---------------------------------------------------------------------------

pub fn build_auth_url(config: &FitbitConfig) -> Result<String, FitbitError> {
  let mut url = Url::parse(FITBIT_AUTH_URL).map_err(|e| FitbitError::OAuth(e.to_string()))?;

  url
    .query_pairs_mut()
    .append_pair("response_type", "code")
    .append_pair("client_id", &config.client_id)
    .append_pair("redirect_uri", &config.redirect_uri)
    .append_pair("scope", SCOPES);

  Ok(url.to_string())
}

/// ---------------------------------------------------------------------------
/// OAuth Callback Server
/// ---------------------------------------------------------------------------

pub struct CallbackResult {
  pub code: String,
}

pub fn bind_callback_listener() -> Result<TcpListener, FitbitError> {
  let listener = TcpListener::bind(format!("127.0.0.1:{}", REDIRECT_PORT))
    .map_err(|e| FitbitError::Server(format!("Failed to bind port {}: {}", REDIRECT_PORT, e)))?;
  log::info!("Listening for OAuth callback on port {}...", REDIRECT_PORT);
  Ok(listener)
}

/// Block until one request arrives and hand back its authorization code.
pub fn accept_callback(listener: &TcpListener) -> Result<CallbackResult, FitbitError> {
  let (mut stream, _) = listener
    .accept()
    .map_err(|e| FitbitError::Server(format!("Connection error: {}", e)))?;

  let mut buffer = [0; 2048];
  let bytes_read = stream
    .read(&mut buffer)
    .map_err(|e| FitbitError::Server(format!("Failed to read: {}", e)))?;
  let request = String::from_utf8_lossy(&buffer[..bytes_read]);

  let result = match extract_query_param(&request, "code") {
    Some(code) => Ok(CallbackResult { code }),
    None => Err(FitbitError::OAuth(
      extract_query_param(&request, "error")
        .unwrap_or_else(|| "No authorization code received".to_string()),
    )),
  };

  let response = match &result {
    Ok(_) => build_success_response(),
    Err(e) => build_error_response(&e.to_string()),
  };
  stream.write_all(response.as_bytes()).ok();
  stream.flush().ok();

  if result.is_ok() {
    log::info!("Received authorization code");
  }
  result
}

fn extract_query_param(request: &str, key: &str) -> Option<String> {
  let first_line = request.lines().next()?;
  let target = first_line.split_whitespace().nth(1)?;
  let url = Url::parse(&format!("http://localhost{}", target)).ok()?;

  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
    .filter(|v| !v.is_empty())
}

fn build_success_response() -> String {
  let body = r#"<!DOCTYPE html>
<html>
<head><title>Sleep - Connected!</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
  <h1>Success! You can close this tab.</h1>
</body>
</html>"#;
  format!(
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
    body.len(),
    body
  )
}

fn build_error_response(error: &str) -> String {
  let body = format!(
    r#"<!DOCTYPE html>
<html>
<head><title>Sleep - Error</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
  <h1>Authorization Failed</h1>
  <p>{}</p>
</body>
</html>"#,
    error
  );
  format!(
    "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
    body.len(),
    body
  )
}

/// ---------------------------------------------------------------------------
/// API Client
/// ---------------------------------------------------------------------------

/// Data returned by a fetch, and whether the tokens had to be refreshed
/// to get it. Callers persist the tokens when `refreshed` is set.
#[derive(Debug)]
pub struct Fetched<T> {
  pub data: T,
  pub refreshed: bool,
}

/// Inclusive `(start, end)` for the last `days` days ending `today`.
pub fn lookback_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
  let span = i64::from(days.max(1)) - 1;
  (today - Duration::days(span), today)
}

pub struct FitbitClient {
  http: Client,
  config: FitbitConfig,
  api_base: String,
  token_url: String,
}

impl FitbitClient {
  pub fn new(config: FitbitConfig) -> Self {
    Self::with_endpoints(config, FITBIT_API_BASE, FITBIT_TOKEN_URL)
  }

  pub fn with_endpoints(config: FitbitConfig, api_base: &str, token_url: &str) -> Self {
    Self {
      http: Client::new(),
      config,
      api_base: api_base.trim_end_matches('/').to_string(),
      token_url: token_url.to_string(),
    }
  }

  /// Exchange an authorization code for access and refresh tokens
  pub async fn exchange_code(&self, code: &str) -> Result<FitbitTokens, FitbitError> {
    let form = [
      ("client_id", self.config.client_id.as_str()),
      ("grant_type", "authorization_code"),
      ("redirect_uri", self.config.redirect_uri.as_str()),
      ("code", code),
    ];
    self.token_request(&form, "Token exchange").await
  }

  pub async fn refresh(&self, refresh_token: &str) -> Result<FitbitTokens, FitbitError> {
    let form = [
      ("grant_type", "refresh_token"),
      ("refresh_token", refresh_token),
    ];
    self.token_request(&form, "Token refresh").await
  }

  async fn token_request(
    &self,
    form: &[(&str, &str)],
    action: &str,
  ) -> Result<FitbitTokens, FitbitError> {
    let response = self
      .http
      .post(&self.token_url)
      .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
      .form(form)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(FitbitError::OAuth(format!(
        "{} failed ({}): {}",
        action, status, error_text
      )));
    }

    Ok(response.json().await?)
  }

  /// Sleep log entries between `start` and `end`, inclusive
  pub async fn fetch_sleep(
    &self,
    tokens: &mut FitbitTokens,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Fetched<Vec<Value>>, FitbitError> {
    let url = format!(
      "{}/1.2/user/-/sleep/date/{}/{}.json",
      self.api_base, start, end
    );
    let (body, refreshed) = self.get_with_refresh(&url, tokens).await?;
    Ok(Fetched {
      data: take_array(body, "sleep"),
      refreshed,
    })
  }

  /// First page of the activity log after `after`
  pub async fn fetch_activities(
    &self,
    tokens: &mut FitbitTokens,
    after: NaiveDate,
  ) -> Result<Fetched<Vec<Value>>, FitbitError> {
    let url = format!(
      "{}/1/user/-/activities/list.json?afterDate={}&sort=asc&offset=0&limit={}",
      self.api_base, after, ACTIVITY_PAGE_LIMIT
    );
    let (body, refreshed) = self.get_with_refresh(&url, tokens).await?;
    Ok(Fetched {
      data: take_array(body, "activities"),
      refreshed,
    })
  }

  async fn get_with_refresh(
    &self,
    url: &str,
    tokens: &mut FitbitTokens,
  ) -> Result<(Value, bool), FitbitError> {
    let mut refreshed = false;
    let mut response = self
      .http
      .get(url)
      .bearer_auth(&tokens.access_token)
      .send()
      .await?;

    if response.status() == StatusCode::UNAUTHORIZED {
      log::info!("Access token expired, refreshing");
      *tokens = self.refresh(&tokens.refresh_token).await?;
      refreshed = true;

      response = self
        .http
        .get(url)
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    }

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(FitbitError::Api { status, body });
    }

    Ok((response.json().await?, refreshed))
  }
}

fn take_array(mut body: Value, key: &str) -> Vec<Value> {
  match body.get_mut(key).map(Value::take) {
    Some(Value::Array(items)) => items,
    _ => Vec::new(),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
