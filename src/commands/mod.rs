//! One entry point per CLI subcommand
//!
//! Commands print their user-facing result on stdout and leave diagnostics
//! to `log`. Network-facing commands have a `*_with` variant taking the
//! clients explicitly so they can be pointed at a mock server.

pub mod chart;
pub mod fitbit;
pub mod fixup;
pub mod serve;
pub mod sheet;

use crate::config::Paths;
use crate::error::{AppError, AppResult};
use crate::fitbit::{FitbitClient, FitbitConfig, FitbitTokens};
use crate::store;

/// ---------------------------------------------------------------------------
/// Token Store
/// ---------------------------------------------------------------------------

pub(crate) fn load_tokens(paths: &Paths) -> AppResult<FitbitTokens> {
  let path = paths.tokens_file();
  if !path.exists() {
    return Err(AppError::NotAuthenticated);
  }
  Ok(store::read_json(&path)?)
}

pub(crate) fn save_tokens(paths: &Paths, tokens: &FitbitTokens) -> AppResult<()> {
  store::write_json(&paths.tokens_file(), tokens)?;
  log::debug!("Saved tokens to {}", paths.tokens_file().display());
  Ok(())
}

pub(crate) fn fitbit_client(paths: &Paths) -> AppResult<FitbitClient> {
  let config = FitbitConfig::load(&paths.client_file())?;
  Ok(FitbitClient::new(config))
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::test_utils::mock_tokens;
  use tempfile::TempDir;

  /// Paths rooted in a fresh temporary directory
  pub(crate) fn temp_paths() -> (TempDir, Paths) {
    let dir = TempDir::new().unwrap();
    let paths = Paths {
      config_dir: dir.path().join("config"),
      data_dir: dir.path().join("data"),
      docs_dir: dir.path().join("docs"),
    };
    (dir, paths)
  }

  #[test]
  fn test_missing_tokens_is_not_authenticated() {
    let (_dir, paths) = temp_paths();
    assert!(matches!(load_tokens(&paths), Err(AppError::NotAuthenticated)));
  }

  #[test]
  fn test_tokens_round_trip_through_config_dir() {
    let (_dir, paths) = temp_paths();
    let mut tokens = mock_tokens("access");
    tokens.extra.insert("user_id".to_string(), "U1".into());

    save_tokens(&paths, &tokens).unwrap();
    assert!(paths.tokens_file().starts_with(&paths.config_dir));
    assert_eq!(load_tokens(&paths).unwrap(), tokens);
  }

  #[test]
  fn test_missing_client_config() {
    let (_dir, paths) = temp_paths();
    let err = fitbit_client(&paths).err().unwrap();
    assert!(err.to_string().contains("client.json"));
  }
}
