//! HTTP server assembly for the diet ledger.
//!
//! Wraps the [`nutri_api`] router with request tracing and owns the runtime
//! configuration read by the `nutri-server` binary.

use std::path::{Path, PathBuf};

use axum::Router;
use nutri_api::{AppState, api_router};
use nutri_core::{directory::Directory, store::DietLedger};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `NUTRI_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("nutri.db"),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the served application: the API routes plus a request trace layer.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: DietLedger + Directory + 'static,
{
  api_router(state).layer(TraceLayer::new_for_http())
}
