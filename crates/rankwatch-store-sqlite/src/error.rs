//! Error type for `rankwatch-store-sqlite`.

use rankwatch_core::store::StoreFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownVariant {
    column: &'static str,
    value:  String,
  },
}

impl StoreFailure for Error {
  fn is_unique_violation(&self) -> bool {
    use rusqlite::ffi::{SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE};

    matches!(
      self,
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _)
      )) if e.extended_code == SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == SQLITE_CONSTRAINT_PRIMARYKEY
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
