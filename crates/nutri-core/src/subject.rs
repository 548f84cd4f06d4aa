//! Subjects: who a diet assignment is handed to.
//!
//! Regular diets are personal and target a single client. Detox diets are
//! shared and target a whole group; every client in that group sees them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, diet::DietType};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Identity of a client in the directory.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct ClientId(pub i64);

/// Identity of a client group in the directory.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for ClientId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Display for GroupId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// The target of a diet assignment: exactly one client or exactly one group.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
  Client(ClientId),
  Group(GroupId),
}

impl Subject {
  pub fn client(id: i64) -> Self { Self::Client(ClientId(id)) }

  pub fn group(id: i64) -> Self { Self::Group(GroupId(id)) }

  pub fn client_id(&self) -> Option<ClientId> {
    match self {
      Self::Client(id) => Some(*id),
      Self::Group(_) => None,
    }
  }

  pub fn group_id(&self) -> Option<GroupId> {
    match self {
      Self::Client(_) => None,
      Self::Group(id) => Some(*id),
    }
  }

  /// Reject ids that can never exist (the directory hands out ids from 1).
  pub fn validate_id(&self) -> Result<()> {
    let raw = match self {
      Self::Client(ClientId(id)) | Self::Group(GroupId(id)) => *id,
    };
    if raw <= 0 {
      return Err(Error::Validation(format!("malformed subject id: {self}")));
    }
    Ok(())
  }

  /// Check that this subject kind is the one `diet_type` binds to.
  ///
  /// Regular diets go to clients only; detox diets go to groups only.
  pub fn check_binding(&self, diet_type: DietType) -> Result<()> {
    let ok = match self {
      Self::Client(_) => diet_type.targets_client(),
      Self::Group(_) => !diet_type.targets_client(),
    };
    if ok {
      Ok(())
    } else {
      Err(Error::Validation(format!(
        "{diet_type} diet cannot be assigned to {self}"
      )))
    }
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Client(id) => write!(f, "client {id}"),
      Self::Group(id) => write!(f, "group {id}"),
    }
  }
}
