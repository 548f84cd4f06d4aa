//! Handlers for the directory: groups, clients, and diet templates.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/groups` | Body: `{"name":"..."}`; returns 201 |
//! | `GET`  | `/admin/clients` | Each client with `last_diet_date` |
//! | `POST` | `/admin/clients` | Body: [`NewClient`]; returns 201 |
//! | `PUT`  | `/admin/clients/:client_id/active` | Body: [`ActiveBody`] |
//! | `GET`  | `/admin/templates` | |
//! | `POST` | `/admin/templates` | Body: [`TemplateBody`]; returns 201 |
//! | `GET`  | `/admin/templates/:id` | |
//! | `PUT`  | `/admin/templates/:id` | Body: [`TemplateBody`] |
//! | `DELETE` | `/admin/templates/:id` | Soft delete; returns 204 |

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use nutri_core::{
  directory::{Client, DietTemplate, Directory, Group, NewClient},
  store::DietLedger,
  subject::{ClientId, GroupId},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, views::ClientSummary};

// ─── Lookups shared by other handlers ────────────────────────────────────────

pub(crate) async fn require_client<S: Directory>(
  store: &S,
  id: ClientId,
) -> Result<Client, ApiError> {
  store
    .client(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| nutri_core::Error::ClientNotFound(id).into())
}

pub(crate) async fn require_group<S: Directory>(
  store: &S,
  id: GroupId,
) -> Result<Group, ApiError> {
  store
    .group(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| nutri_core::Error::GroupNotFound(id).into())
}

fn require_name(name: &str) -> Result<(), ApiError> {
  if name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  Ok(())
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateGroupBody {
  pub name: String,
}

/// `POST /admin/groups`
pub async fn create_group<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateGroupBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DietLedger + Directory,
{
  require_name(&body.name)?;
  let group = state
    .store
    .add_group(body.name)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(group)))
}

// ─── Clients ─────────────────────────────────────────────────────────────────

/// `POST /admin/clients`
pub async fn create_client<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewClient>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DietLedger + Directory,
{
  require_name(&body.name)?;
  let client = state
    .store
    .add_client(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(client)))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub is_active: bool,
}

/// `PUT /admin/clients/:client_id/active`
pub async fn set_client_active<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Client>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = state
    .store
    .set_client_active(ClientId(client_id), body.is_active)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(client_id, is_active = client.is_active, "changed client activation");
  Ok(Json(client))
}

/// `GET /admin/clients`
pub async fn list_clients<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<ClientSummary>>, ApiError>
where
  S: DietLedger + Directory,
{
  let clients = state
    .store
    .list_clients()
    .await
    .map_err(ApiError::from_store)?;
  let last: HashMap<_, _> = state
    .store
    .last_assignment_dates()
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .collect();

  let summaries = clients
    .into_iter()
    .map(|client| ClientSummary {
      last_diet_date: last.get(&client.id).copied(),
      client,
    })
    .collect();
  Ok(Json(summaries))
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TemplateBody {
  pub name:    String,
  pub content: String,
}

/// `POST /admin/templates`
pub async fn create_template<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<TemplateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DietLedger + Directory,
{
  require_name(&body.name)?;
  let template = state
    .store
    .add_template(body.name, body.content)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(template)))
}

/// `GET /admin/templates`
pub async fn list_templates<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<DietTemplate>>, ApiError>
where
  S: DietLedger + Directory,
{
  let templates = state
    .store
    .list_templates()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(templates))
}

/// `GET /admin/templates/:id`
pub async fn get_template<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<DietTemplate>, ApiError>
where
  S: DietLedger + Directory,
{
  let template = state
    .store
    .template(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(nutri_core::Error::TemplateNotFound(id))?;
  Ok(Json(template))
}

/// `PUT /admin/templates/:id`
pub async fn update_template<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<TemplateBody>,
) -> Result<Json<DietTemplate>, ApiError>
where
  S: DietLedger + Directory,
{
  require_name(&body.name)?;
  let template = state
    .store
    .update_template(id, body.name, body.content)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(template))
}

/// `DELETE /admin/templates/:id`: rows already assigned keep the reference.
pub async fn delete_template<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: DietLedger + Directory,
{
  state
    .store
    .delete_template(id)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(id, "deleted diet template");
  Ok(StatusCode::NO_CONTENT)
}
