use crate::fitbit::FitbitError;
use crate::fixup::FixupError;
use crate::sheets::SheetsError;
use crate::store::StoreError;

/// Everything a subcommand can fail with. `main` prints the message and
/// exits non-zero.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("Not authenticated. Run 'sleep auth' first.")]
  NotAuthenticated,

  #[error("No data. Run 'sleep sync' first.")]
  NoData,

  #[error("{0}")]
  InvalidInput(String),

  #[error("Server error: {0}")]
  Server(String),

  #[error(transparent)]
  Fitbit(#[from] FitbitError),

  #[error(transparent)]
  Sheets(#[from] SheetsError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Fixup(#[from] FixupError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
