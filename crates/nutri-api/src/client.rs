//! Handlers for the client-facing `/clients/{client_id}` tree.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clients/:client_id/diets` | Current Regular plus the group's detox diets |
//! | `GET`  | `/clients/:client_id/diets/history` | Regular history |
//! | `GET`  | `/clients/:client_id/weight` | Gate status for today |
//! | `POST` | `/clients/:client_id/weight` | Body: [`WeightReport`]; 406 while the gate is closed |
//! | `GET`  | `/clients/:client_id/weights` | Weight history |

use axum::{
  Json,
  extract::{Path, State},
};
use nutri_core::{
  diet::{DietAssignment, DietType, WeightEntry, WeightReport},
  directory::Directory,
  gate::GateDecision,
  store::DietLedger,
  subject::{ClientId, GroupId, Subject},
};

use crate::{
  AppState,
  directory::require_client,
  error::ApiError,
  views::{CurrentDiets, DietView, MyDiets, history_view},
};

async fn latest_in_group<S: DietLedger>(
  store: &S,
  group: Option<GroupId>,
  diet_type: DietType,
) -> Result<Option<DietAssignment>, S::Error> {
  match group {
    Some(id) => store.latest_for(Subject::Group(id), diet_type).await,
    None => Ok(None),
  }
}

/// `GET /clients/:client_id/diets`
pub async fn my_diets<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
) -> Result<Json<MyDiets>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = require_client(&*state.store, ClientId(client_id)).await?;
  if !client.is_active {
    return Ok(Json(MyDiets { is_active: false, diets: None }));
  }

  let store = &*state.store;
  let (regular, detox_diet, detox_water) = tokio::try_join!(
    store.latest_for(Subject::Client(client.id), DietType::Regular),
    latest_in_group(store, client.group_id, DietType::DetoxDiet),
    latest_in_group(store, client.group_id, DietType::DetoxWater),
  )
  .map_err(ApiError::from_store)?;

  Ok(Json(MyDiets {
    is_active: true,
    diets:     Some(CurrentDiets {
      regular:     regular.map(DietView::from),
      detox_diet:  detox_diet.map(DietView::from),
      detox_water: detox_water.map(DietView::from),
    }),
  }))
}

/// `GET /clients/:client_id/diets/history`
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

/// `GET /clients/:client_id/weight`
pub async fn gate<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
) -> Result<Json<GateDecision>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = require_client(&*state.store, ClientId(client_id)).await?;
  let decision = state
    .store
    .weight_gate(client.id, state.today())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(decision))
}

/// `POST /clients/:client_id/weight`
pub async fn submit_weight<S>(
  State(state): State<AppState<S>>,
  Path(client_id): Path<i64>,
  Json(report): Json<WeightReport>,
) -> Result<Json<DietAssignment>, ApiError>
where
  S: DietLedger + Directory,
{
  let client = require_client(&*state.store, ClientId(client_id)).await?;
  let row = state
    .store
    .submit_weight(client.id, report, state.today())
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(client_id, week_number = row.week_number, "weight reported");
  Ok(Json(row))
}

/// `GET /clients/:client_id/weights`
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
