//! Error type for `nutri-store-sqlite`.

use nutri_core::LedgerFailure;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Ledger(#[from] nutri_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row violates an invariant the schema cannot express.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl Error {
  /// Whether this failure came from losing a write race: a duplicate week
  /// number on the partial unique index, or a busy database.
  pub fn is_conflict(&self) -> bool {
    let sqlite = match self {
      Error::Sqlite(e) => e,
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => e,
      _ => return false,
    };
    match sqlite {
      rusqlite::Error::SqliteFailure(code, _) => {
        code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
          || code.code == rusqlite::ErrorCode::DatabaseBusy
      }
      _ => false,
    }
  }
}

impl LedgerFailure for Error {
  fn ledger_error(&self) -> Option<&nutri_core::Error> {
    match self {
      Error::Ledger(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
