//! The client/group directory and diet-template catalogue.
//!
//! These are collaborators of the ledger: it asks them whether a subject
//! exists, which group a client belongs to, and what a template contains.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  LedgerFailure,
  subject::{ClientId, GroupId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
  pub id:        ClientId,
  pub name:      String,
  pub group_id:  Option<GroupId>,
  /// Inactive clients keep their history but see no current diet.
  pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
  pub id:   GroupId,
  pub name: String,
}

/// A reusable diet body an admin can assign as-is or start from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietTemplate {
  pub id:         i64,
  pub name:       String,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
  pub name:      String,
  pub group_id:  Option<GroupId>,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool { true }

/// Lookup and registration of the entities a diet can reference.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + LedgerFailure + Send + Sync + 'static;

  fn add_group(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn group(
    &self,
    id: GroupId,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// Returns an error if `input.group_id` names a missing group.
  fn add_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  fn client(
    &self,
    id: ClientId,
  ) -> impl Future<Output = Result<Option<Client>, Self::Error>> + Send + '_;

  /// Activate or deactivate `id`, returning the updated client.
  fn set_client_active(
    &self,
    id: ClientId,
    is_active: bool,
  ) -> impl Future<Output = Result<Client, Self::Error>> + Send + '_;

  fn list_clients(
    &self,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;

  fn add_template(
    &self,
    name: String,
    content: String,
  ) -> impl Future<Output = Result<DietTemplate, Self::Error>> + Send + '_;

  /// Soft-deleted templates are reported as missing.
  fn template(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<DietTemplate>, Self::Error>> + Send + '_;

  /// Replace name and content of a live template.
  fn update_template(
    &self,
    id: i64,
    name: String,
    content: String,
  ) -> impl Future<Output = Result<DietTemplate, Self::Error>> + Send + '_;

  /// Soft-delete a template. Assignments keep their reference and still show
  /// its name.
  fn delete_template(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_templates(
    &self,
  ) -> impl Future<Output = Result<Vec<DietTemplate>, Self::Error>> + Send + '_;
}
