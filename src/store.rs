//! JSON file storage
//!
//! Every durable artifact (tokens, fetched data, fixups, the chart) is a
//! single JSON document that is read and replaced wholesale.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },

  #[error("Invalid JSON in {path}: {source}")]
  Json {
    path: String,
    source: serde_json::Error,
  },
}

impl StoreError {
  fn io(path: &Path, source: std::io::Error) -> Self {
    StoreError::Io {
      path: path.display().to_string(),
      source,
    }
  }

  fn json(path: &Path, source: serde_json::Error) -> Self {
    StoreError::Json {
      path: path.display().to_string(),
      source,
    }
  }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
  let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
  serde_json::from_str(&raw).map_err(|e| StoreError::json(path, e))
}

/// Like [`read_json`], but a missing file yields `T::default()`.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
  if !path.exists() {
    log::debug!("{} not found, using empty default", path.display());
    return Ok(T::default());
  }
  read_json(path)
}

/// Pretty-printed, newline-terminated; parent directories are created.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
  }

  let formatted = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
  fs::write(path, format!("{formatted}\n")).map_err(|e| StoreError::io(path, e))?;

  log::debug!("Wrote {}", path.display());
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tempfile::TempDir;

  #[test]
  fn test_write_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("data").join("sleep.json");

    write_json(&path, &json!([{ "dateOfSleep": "2025-01-01" }])).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.ends_with("}\n]\n"));
    let back: serde_json::Value = read_json(&path).unwrap();
    assert_eq!(back, json!([{ "dateOfSleep": "2025-01-01" }]));
  }

  #[test]
  fn test_missing_file_defaults() {
    let dir = TempDir::new().unwrap();
    let values: Vec<serde_json::Value> = read_json_or_default(&dir.path().join("fixups.json")).unwrap();
    assert!(values.is_empty());
  }

  #[test]
  fn test_missing_file_is_an_error_for_read_json() {
    let dir = TempDir::new().unwrap();
    let result: Result<Vec<serde_json::Value>, _> = read_json(&dir.path().join("sleep.json"));
    assert!(matches!(result, Err(StoreError::Io { .. })));
  }

  #[test]
  fn test_invalid_json_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tokens.json");
    fs::write(&path, "{ not json").unwrap();

    let err = read_json::<serde_json::Value>(&path).unwrap_err();
    assert!(matches!(err, StoreError::Json { .. }));
    assert!(err.to_string().contains("tokens.json"));
  }
}
