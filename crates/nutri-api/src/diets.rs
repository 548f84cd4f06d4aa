//! Admin handlers for Regular diets and common (batch) diets.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/clients/:client_id/diets` | Body: [`AssignBody`]; returns 201 |
//! | `GET`  | `/admin/clients/:client_id/diets` | History, oldest week first |
//! | `GET`  | `/admin/clients/:client_id/diets/latest` | 404 if none |
//! | `PUT`  | `/admin/clients/:client_id/diets/:id` | Body: [`EditBody`]; latest row only |
//! | `DELETE` | `/admin/clients/:client_id/diets/:id` | Soft delete; latest row only |
//! | `GET`  | `/admin/clients/:client_id/weights` | Weight history |
//! | `GET`  | `/admin/assignments/:id` | Any row, including withdrawn ones |
//! | `POST` | `/admin/common-diets` | Body: [`CommonDietBody`]; all-or-nothing |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use nutri_core::{
  diet::{DietAssignment, DietType, NewAssignment, WeightEntry},
  directory::Directory,
  store::DietLedger,
  subject::{ClientId, Subject},
};
use serde::Deserialize;

use crate::{
  AppState,
  directory::require_client,
  error::ApiError,
  views::{DietView, history_view},
};

// ─── Request bodies ──────────────────────────────────────────────────────────

/// The diet half of an assignment request.
///
/// `content` may be omitted when `template_id` is given, in which case the
/// template's content is used. Supplied content is stored as-is and the
/// template is kept as a reference.
#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub content:     Option<String>,
  pub template_id: Option<i64>,
  /// Defaults to today, or to the latest row's day if that is later. Must
  /// not be after today.
  pub assigned_on: Option<NaiveDate>,
}

impl AssignBody {
  async fn into_parts<S: Directory>(
    self,
    store: &S,
  ) -> Result<(String, Option<i64>, Option<NaiveDate>), ApiError> {
    let content = match (self.content, self.template_id) {
      (Some(content), _) => content,
      (None, Some(id)) => {
        store
          .template(id)
          .await
          .map_err(ApiError::from_store)?
          .ok_or(nutri_core::Error::TemplateNotFound(id))?
          .content
      }
      (None, None) => {
        return Err(ApiError::BadRequest(
          "either content or template_id is required".into(),
        ));
      }
    };
    Ok((content, self.template_id, self.assigned_on))
  }
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CommonDietBody {
  pub diet_type: DietType,
  /// e.g. `[{"kind":"group","id":7},{"kind":"group","id":9}]`
  pub subjects:  Vec<Subject>,
  #[serde(flatten)]
  pub diet:      AssignBody,
}

// ─── Assign ──────────────────────────────────────────────────────────────────

/// `POST /admin/clients/:client_id/diets`
pub async fn assign<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
  Json(body): Json<AssignBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DietLedger + Directory,
{
  let (content, template_id, assigned_on) = body.into_parts(&*state.store).await?;
  let input = NewAssignment {
    subject: Subject::client(client_id),
    diet_type: DietType::Regular,
    content,
    template_id,
    assigned_on,
  };
  let row = state
    .store
    .assign_diet(input, state.now())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(row)))
}

/// `POST /admin/common-diets`
pub async fn assign_common<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CommonDietBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DietLedger + Directory,
{
  let (content, template_id, assigned_on) =
    body.diet.into_parts(&*state.store).await?;
  let inputs = body
    .subjects
    .into_iter()
    .map(|subject| NewAssignment {
      subject,
      diet_type: body.diet_type,
      content: content.clone(),
      template_id,
      assigned_on,
    })
    .collect();

  let rows = state
    .store
    .assign_batch(inputs, state.now())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(rows)))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /admin/clients/:client_id/diets`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
) -> Result<Json<Vec<DietView>>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = require_client(&*state.store, ClientId(client_id)).await?;
  let rows = state
    .store
    .history(Subject::Client(client.id), DietType::Regular)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(history_view(rows)))
}

/// `GET /admin/clients/:client_id/diets/latest`
pub async fn latest<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = require_client(&*state.store, ClientId(client_id)).await?;
  let row = state
    .store
    .latest_for(Subject::Client(client.id), DietType::Regular)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(nutri_core::Error::NoAssignment(client.id))?;
  Ok(Json(row))
}

/// `GET /admin/assignments/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let row = state
    .store
    .get_assignment(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(nutri_core::Error::AssignmentNotFound(id))?;
  Ok(Json(row))
}

/// `GET /admin/clients/:client_id/weights`
pub async fn weights<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
) -> Result<Json<Vec<WeightEntry>>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = require_client(&*state.store, ClientId(client_id)).await?;
  let entries = state
    .store
    .weight_history(client.id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(entries))
}

// ─── Latest-only mutations ───────────────────────────────────────────────────

/// `PUT /admin/clients/:client_id/diets/:id`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  Path((client_id, id)): Path<(i64, i64)>,
  Json(body): Json<EditBody>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let row = state
    .store
    .edit_diet(id, DietType::Regular, Subject::client(client_id), body.content)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(row))
}

/// `DELETE /admin/clients/:client_id/diets/:id`: returns the withdrawn row.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path((client_id, id)): Path<(i64, i64)>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let row = state
    .store
    .delete_latest(id, Subject::client(client_id), state.now())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(id, client_id, week_number = row.week_number, "withdrew diet");
  Ok(Json(row))
}
