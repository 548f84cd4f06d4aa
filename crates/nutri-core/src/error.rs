//! Error types for `nutri-core`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::subject::{ClientId, GroupId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("client not found: {0}")]
  ClientNotFound(ClientId),

  #[error("group not found: {0}")]
  GroupNotFound(GroupId),

  #[error("diet template not found: {0}")]
  TemplateNotFound(i64),

  #[error("diet assignment not found: {0}")]
  AssignmentNotFound(i64),

  #[error("diet assignment {id} is not the latest (latest is {latest:?})")]
  NotLatest { id: i64, latest: Option<i64> },

  #[error("client {0} has no regular diet assigned")]
  NoAssignment(ClientId),

  #[error(
    "weight update for client {client} not allowed before {allowed_from} \
     ({days_remaining} day(s) remaining)"
  )]
  NotAllowed {
    client:         ClientId,
    allowed_from:   NaiveDate,
    days_remaining: i64,
  },

  #[error("weight already reported on diet assignment {0}")]
  WeightAlreadyReported(i64),

  #[error("concurrent assignment conflict persisted after retry")]
  Conflict,

  #[error("unknown diet type code: {0}")]
  UnknownDietType(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Exposes the domain-level failure carried by a backend error, if any.
///
/// Backends wrap [`Error`] alongside their own storage failures; callers use
/// this to tell business-rule rejections apart from internal faults.
pub trait LedgerFailure {
  fn ledger_error(&self) -> Option<&Error>;
}

impl LedgerFailure for Error {
  fn ledger_error(&self) -> Option<&Error> { Some(self) }
}
