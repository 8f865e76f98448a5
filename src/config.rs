//! Filesystem locations
//!
//! Credentials and tokens live in the user's config directory; fetched data
//! and the generated chart live next to the project. Each location can be
//! overridden from the environment (or `.env`).

use std::env;
use std::path::PathBuf;

const CONFIG_DIR_VAR: &str = "SLEEP_CONFIG_DIR";
const DATA_DIR_VAR: &str = "SLEEP_DATA_DIR";
const DOCS_DIR_VAR: &str = "SLEEP_DOCS_DIR";

const CLIENT_JSON: &str = "client.json";
const TOKENS_JSON: &str = "tokens.json";
const GOOGLE_CREDENTIALS_JSON: &str = "google-credentials.json";
const SLEEP_JSON: &str = "sleep.json";
const ACTIVITIES_JSON: &str = "activities.json";
const SUBJECTIVE_JSON: &str = "subjective.json";
const FIXUPS_JSON: &str = "fixups.json";
const CHART_JSON: &str = "data.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
  pub config_dir: PathBuf,
  pub data_dir: PathBuf,
  pub docs_dir: PathBuf,
}

impl Paths {
  pub fn from_env() -> Self {
    Self {
      config_dir: dir_from_env(CONFIG_DIR_VAR).unwrap_or_else(default_config_dir),
      data_dir: dir_from_env(DATA_DIR_VAR).unwrap_or_else(|| PathBuf::from("data")),
      docs_dir: dir_from_env(DOCS_DIR_VAR).unwrap_or_else(|| PathBuf::from("docs")),
    }
  }

  pub fn client_file(&self) -> PathBuf {
    self.config_dir.join(CLIENT_JSON)
  }

  pub fn tokens_file(&self) -> PathBuf {
    self.config_dir.join(TOKENS_JSON)
  }

  pub fn google_credentials_file(&self) -> PathBuf {
    self.config_dir.join(GOOGLE_CREDENTIALS_JSON)
  }

  pub fn sleep_file(&self) -> PathBuf {
    self.data_dir.join(SLEEP_JSON)
  }

  pub fn activities_file(&self) -> PathBuf {
    self.data_dir.join(ACTIVITIES_JSON)
  }

  pub fn subjective_file(&self) -> PathBuf {
    self.data_dir.join(SUBJECTIVE_JSON)
  }

  pub fn fixups_file(&self) -> PathBuf {
    self.data_dir.join(FIXUPS_JSON)
  }

  pub fn chart_file(&self) -> PathBuf {
    self.docs_dir.join(CHART_JSON)
  }

  pub fn log_config(&self) {
    log::debug!("Configuration loaded:");
    log::debug!("  {:<16}: {}", CONFIG_DIR_VAR, self.config_dir.display());
    log::debug!("  {:<16}: {}", DATA_DIR_VAR, self.data_dir.display());
    log::debug!("  {:<16}: {}", DOCS_DIR_VAR, self.docs_dir.display());
  }
}

fn dir_from_env(var: &str) -> Option<PathBuf> {
  env::var_os(var)
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
}

fn default_config_dir() -> PathBuf {
  env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_default()
    .join(".config")
    .join("sleep")
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_defaults() {
    temp_env::with_vars(
      [
        ("HOME", Some("/home/sleeper")),
        (CONFIG_DIR_VAR, None),
        (DATA_DIR_VAR, None),
        (DOCS_DIR_VAR, None),
      ],
      || {
        let paths = Paths::from_env();
        assert_eq!(paths.config_dir, PathBuf::from("/home/sleeper/.config/sleep"));
        assert_eq!(paths.data_dir, PathBuf::from("data"));
        assert_eq!(paths.docs_dir, PathBuf::from("docs"));
        assert_eq!(paths.tokens_file(), PathBuf::from("/home/sleeper/.config/sleep/tokens.json"));
        assert_eq!(paths.chart_file(), PathBuf::from("docs/data.json"));
      },
    );
  }

  #[test]
  #[serial]
  fn test_env_overrides() {
    temp_env::with_vars(
      [
        (CONFIG_DIR_VAR, Some("/etc/sleep")),
        (DATA_DIR_VAR, Some("/var/lib/sleep")),
        (DOCS_DIR_VAR, Some("/srv/sleep")),
      ],
      || {
        let paths = Paths::from_env();
        assert_eq!(paths.client_file(), PathBuf::from("/etc/sleep/client.json"));
        assert_eq!(paths.sleep_file(), PathBuf::from("/var/lib/sleep/sleep.json"));
        assert_eq!(paths.fixups_file(), PathBuf::from("/var/lib/sleep/fixups.json"));
        assert_eq!(paths.chart_file(), PathBuf::from("/srv/sleep/data.json"));
      },
    );
  }

  #[test]
  #[serial]
  fn test_empty_override_falls_back() {
    temp_env::with_vars([(DATA_DIR_VAR, Some(""))], || {
      assert_eq!(Paths::from_env().data_dir, PathBuf::from("data"));
    });
  }
}
