//! Error types for `agora-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} must not be empty")]
  EmptyField(&'static str),

  #[error("{field} exceeds {max} characters")]
  TooLong { field: &'static str, max: usize },

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("unknown likeable kind: {0:?}")]
  UnknownLikeableKind(String),

  #[error("reaction state lock poisoned")]
  LockPoisoned,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
