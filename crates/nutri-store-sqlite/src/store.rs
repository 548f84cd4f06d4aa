//! [`SqliteStore`], the SQLite implementation of [`DietLedger`].

use std::{future::Future, path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use nutri_core::{
  diet::{DietAssignment, DietType, NewAssignment, WeightEntry, WeightReport},
  gate::GateDecision,
  store::DietLedger,
  subject::{ClientId, Subject},
};
use rusqlite::TransactionBehavior;

use crate::{Error, Result, ledger, schema::SCHEMA};

/// How long a writer waits for another process's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A diet ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All access
/// is serialised onto the connection's dedicated thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside an immediate transaction, committing only if it succeeds.
  ///
  /// `BEGIN IMMEDIATE` takes the write lock before the first read, so the
  /// "find latest" query and the write that depends on it cannot interleave
  /// with another writer.
  pub(crate) async fn write_tx<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = f(&tx);
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?
  }

  /// Run a read-only query on the connection thread.
  pub(crate) async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Append `inputs` in one transaction, retrying once if another writer
  /// claimed a week number first.
  async fn append(
    &self,
    inputs: Vec<NewAssignment>,
    now: DateTime<Utc>,
  ) -> Result<Vec<DietAssignment>> {
    for input in &inputs {
      input.validate()?;
    }

    let store = self;
    retry_on_conflict(move || {
      let inputs = inputs.clone();
      store.write_tx(move |conn| ledger::append_all(conn, &inputs, now))
    })
    .await
  }
}

/// Run `attempt`, and run it once more if it lost a write race. A second
/// lost race becomes [`nutri_core::Error::Conflict`].
pub(crate) async fn retry_on_conflict<T, F, Fut>(mut attempt: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  match attempt().await {
    Err(e) if e.is_conflict() => {
      tracing::warn!(error = %e, "week number conflict, retrying append");
      attempt().await.map_err(|e| {
        if e.is_conflict() {
          Error::Ledger(nutri_core::Error::Conflict)
        } else {
          e
        }
      })
    }
    other => other,
  }
}

// ─── DietLedger impl ─────────────────────────────────────────────────────────

impl DietLedger for SqliteStore {
  type Error = Error;

  // ── Appends ───────────────────────────────────────────────────────────────

  async fn assign_diet(
    &self,
    input: NewAssignment,
    now: DateTime<Utc>,
  ) -> Result<DietAssignment> {
    let mut rows = self.append(vec![input], now).await?;
    rows
      .pop()
      .ok_or_else(|| Error::Corrupt("append returned no row".into()))
  }

  async fn assign_batch(
    &self,
    inputs: Vec<NewAssignment>,
    now: DateTime<Utc>,
  ) -> Result<Vec<DietAssignment>> {
    if inputs.is_empty() {
      return Err(
        nutri_core::Error::Validation("batch must name at least one subject".into())
          .into(),
      );
    }
    let rows = self.append(inputs, now).await?;
    tracing::info!(count = rows.len(), "assigned common diet batch");
    Ok(rows)
  }

  // ── Latest-only mutations ─────────────────────────────────────────────────

  async fn edit_diet(
    &self,
    id:        i64,
    diet_type: DietType,
    subject:   Subject,
    content:   String,
  ) -> Result<DietAssignment> {
    self
      .write_tx(move |conn| ledger::edit(conn, id, diet_type, subject, &content))
      .await
  }

  async fn delete_latest(
    &self,
    id: i64,
    subject: Subject,
    now: DateTime<Utc>,
  ) -> Result<DietAssignment> {
    self
      .write_tx(move |conn| ledger::soft_delete(conn, id, subject, now))
      .await
  }

  async fn weight_gate(&self, client: ClientId, today: NaiveDate) -> Result<GateDecision> {
    self.read(move |conn| ledger::gate(conn, client, today)).await
  }

  async fn submit_weight(
    &self,
    client: ClientId,
    report: WeightReport,
    today:  NaiveDate,
  ) -> Result<DietAssignment> {
    self
      .write_tx(move |conn| ledger::attach_weight(conn, client, &report, today))
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn next_week_number(&self, subject: Subject, diet_type: DietType) -> Result<u32> {
    self
      .read(move |conn| ledger::next_week_number(conn, subject, diet_type))
      .await
  }

  async fn latest_for(
    &self,
    subject:   Subject,
    diet_type: DietType,
  ) -> Result<Option<DietAssignment>> {
    self
      .read(move |conn| ledger::latest(conn, subject, diet_type, false))
      .await
  }

  async fn get_assignment(&self, id: i64) -> Result<Option<DietAssignment>> {
    self.read(move |conn| ledger::assignment_by_id(conn, id)).await
  }

  async fn history(
    &self,
    subject:   Subject,
    diet_type: DietType,
  ) -> Result<Vec<DietAssignment>> {
    self
      .read(move |conn| ledger::history(conn, subject, diet_type))
      .await
  }

  async fn weight_history(&self, client: ClientId) -> Result<Vec<WeightEntry>> {
    self.read(move |conn| ledger::weight_history(conn, client)).await
  }

  async fn last_assignment_dates(&self) -> Result<Vec<(ClientId, NaiveDate)>> {
    self.read(ledger::last_assignment_dates).await
  }
}
