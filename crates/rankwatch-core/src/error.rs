//! Error types for `rankwatch-core`.
//!
//! Use cases fail with one of four business kinds or an opaque store failure.
//! Transports map [`ErrorKind`] to their own status codes.

use thiserror::Error;
use uuid::Uuid;

use crate::{store::StoreFailure, validate::ValidationErrors};

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
  User,
  Place,
  Keyword,
  PlaceKeyword,
  Competitor,
  NotificationSetting,
  NotificationLog,
}

/// Coarse error category, independent of any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  InvalidState,
  ValidationFailed,
  Infrastructure,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} not found: {1}")]
  NotFound(Resource, Uuid),

  /// A uniqueness invariant would be violated.
  #[error("conflict: {0}")]
  Conflict(String),

  /// A gating predicate on the parent entity does not hold.
  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("validation failed: {0}")]
  ValidationFailed(ValidationErrors),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(..) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::InvalidState(_) => ErrorKind::InvalidState,
      Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
      Self::Store(_) => ErrorKind::Infrastructure,
    }
  }

  /// Wrap a backend failure. Unique-constraint violations become
  /// [`Error::Conflict`] so that a duplicate which slipped past the
  /// application-level check reports the same outcome as one that didn't.
  pub fn store<E: StoreFailure>(err: E) -> Self {
    if err.is_unique_violation() {
      Self::Conflict(err.to_string())
    } else {
      Self::Store(Box::new(err))
    }
  }
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::ValidationFailed(errors) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
