//! JSON REST API for the diet ledger.
//!
//! Exposes an axum [`Router`] backed by any backend implementing both
//! [`DietLedger`] and [`Directory`]. Routes are split into an `/admin` tree and
//! a per-client `/clients/{client_id}` tree; authentication, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", nutri_api::api_router(AppState::new(store, SystemClock)))
//! ```

pub mod client;
pub mod diets;
pub mod directory;
pub mod error;
pub mod groups;
pub mod views;


use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use chrono::{DateTime, NaiveDate, Utc};
use nutri_core::{clock::Clock, directory::Directory, store::DietLedger};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  /// Supplies "today" for the weight gate and the write time of ledger rows.
  pub clock: Arc<dyn Clock>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, clock: impl Clock + 'static) -> Self {
    Self { store, clock: Arc::new(clock) }
  }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), clock: Arc::clone(&self.clock) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: DietLedger + Directory + 'static,
{
  Router::new()
    // Directory
    .route("/admin/groups", post(directory::create_group::<S>))
    .route(
      "/admin/clients",
      get(directory::list_clients::<S>).post(directory::create_client::<S>),
    )
    .route(
      "/admin/clients/{client_id}/active",
      put(directory::set_client_active::<S>),
    )
    .route(
      "/admin/templates",
      get(directory::list_templates::<S>).post(directory::create_template::<S>),
    )
    .route(
      "/admin/templates/{id}",
      get(directory::get_template::<S>)
        .put(directory::update_template::<S>)
        .delete(directory::delete_template::<S>),
    )
    // Regular diets
    .route(
      "/admin/clients/{client_id}/diets",
      get(diets::history::<S>).post(diets::assign::<S>),
    )
    .route("/admin/clients/{client_id}/diets/latest", get(diets::latest::<S>))
    .route(
      "/admin/clients/{client_id}/diets/{id}",
      put(diets::edit::<S>).delete(diets::delete::<S>),
    )
    .route("/admin/clients/{client_id}/weights", get(diets::weights::<S>))
    .route("/admin/assignments/{id}", get(diets::get_one::<S>))
    .route("/admin/common-diets", post(diets::assign_common::<S>))
    // Group diets
    .route(
      "/admin/groups/{group_id}/diets/{diet_type}",
      get(groups::history::<S>),
    )
    .route(
      "/admin/groups/{group_id}/diets/{diet_type}/latest",
      get(groups::latest::<S>),
    )
    .route(
      "/admin/groups/{group_id}/diets/{diet_type}/{id}",
      put(groups::edit::<S>).delete(groups::delete::<S>),
    )
    // Client surface
    .route("/clients/{client_id}/diets", get(client::my_diets::<S>))
    .route("/clients/{client_id}/diets/history", get(client::history::<S>))
    .route(
      "/clients/{client_id}/weight",
      get(client::gate::<S>).post(client::submit_weight::<S>),
    )
    .route("/clients/{client_id}/weights", get(client::weights::<S>))
    .with_state(state)
}
