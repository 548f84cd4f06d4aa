//! Admin handlers for group (detox) diets.
//!
//! Groups receive new diets through `POST /admin/common-diets`; these routes
//! read and adjust what a group already has.

use axum::{
  Json,
  extract::{Path, State},
};
use nutri_core::{
  diet::{DietAssignment, DietType},
  directory::Directory,
  store::DietLedger,
  subject::{GroupId, Subject},
};

use crate::{
  AppState,
  diets::EditBody,
  directory::require_group,
  error::ApiError,
  views::{DietView, history_view},
};

/// Resolve and check a `(group_id, diet_type)` path pair.
async fn group_subject<S: Directory>(
  store: &S,
  group_id: i64,
  diet_type: DietType,
) -> Result<Subject, ApiError> {
  let subject = Subject::group(group_id);
  subject.validate_id()?;
  subject.check_binding(diet_type)?;
  require_group(store, GroupId(group_id)).await?;
  Ok(subject)
}

/// `GET /admin/groups/:group_id/diets/:diet_type`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Path((group_id, diet_type)): Path<(i64, DietType)>,
) -> Result<Json<Vec<DietView>>, ApiError>
where
  S: DietLedger + Directory,
{
  let subject = group_subject(&*state.store, group_id, diet_type).await?;
  let rows = state
    .store
    .history(subject, diet_type)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(history_view(rows)))
}

/// `GET /admin/groups/:group_id/diets/:diet_type/latest`
pub async fn latest<S>(
  State(state): State<AppState<S>>,
  Path((group_id, diet_type)): Path<(i64, DietType)>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let subject = group_subject(&*state.store, group_id, diet_type).await?;
  let row = state
    .store
    .latest_for(subject, diet_type)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("group {group_id} has no {diet_type} diet"))
    })?;
  Ok(Json(row))
}

/// `PUT /admin/groups/:group_id/diets/:diet_type/:id`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  Path((group_id, diet_type, id)): Path<(i64, DietType, i64)>,
  Json(body): Json<EditBody>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let row = state
    .store
    .edit_diet(id, diet_type, Subject::group(group_id), body.content)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(row))
}

/// `DELETE /admin/groups/:group_id/diets/:diet_type/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path((group_id, diet_type, id)): Path<(i64, DietType, i64)>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  // Rows never change type.
  let matches = state
    .store
    .get_assignment(id)
    .await
    .map_err(ApiError::from_store)?
    .is_some_and(|row| row.diet_type == diet_type);
  if !matches {
    return Err(nutri_core::Error::AssignmentNotFound(id).into());
  }

  let row = state
    .store
    .delete_latest(id, Subject::group(group_id), state.now())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(id, group_id, %diet_type, week_number = row.week_number, "withdrew diet");
  Ok(Json(row))
}
