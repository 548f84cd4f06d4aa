//! The `DietLedger` trait.
//!
//! Implemented by storage backends (e.g. `nutri-store-sqlite`). The HTTP layer
//! depends on this abstraction and receives a backend explicitly; there is no
//! process-wide handle.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  LedgerFailure,
  diet::{DietAssignment, DietType, NewAssignment, WeightEntry, WeightReport},
  gate::GateDecision,
  subject::{ClientId, Subject},
};

/// Abstraction over an append-only diet ledger.
///
/// Rows are only ever appended. The single in-place mutations are the content
/// edit, the weight report and the soft-delete marker, and each of them is
/// restricted to the latest row of its (subject, diet type) sequence.
///
/// Every mutation must run atomically with the "find latest" read it depends
/// on, so concurrent writers on the same key cannot both win.
pub trait DietLedger: Send + Sync {
  type Error: std::error::Error + LedgerFailure + Send + Sync + 'static;

  // ── Appends ───────────────────────────────────────────────────────────

  /// Append a new row numbered after the current latest one.
  ///
  /// `now` stamps the row and bounds `assigned_on`: the day may not lie in
  /// the future, and defaults to `now`'s UTC day or the latest row's day,
  /// whichever is later.
  fn assign_diet(
    &self,
    input: NewAssignment,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<DietAssignment, Self::Error>> + Send + '_;

  /// Append one row per input, each independently sequenced. Either every
  /// row is written or none is.
  fn assign_batch(
    &self,
    inputs: Vec<NewAssignment>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DietAssignment>, Self::Error>> + Send + '_;

  // ── Latest-only mutations ─────────────────────────────────────────────

  /// Replace the content of row `id`, which must be the latest row for
  /// (`subject`, `diet_type`).
  fn edit_diet(
    &self,
    id: i64,
    diet_type: DietType,
    subject: Subject,
    content: String,
  ) -> impl Future<Output = Result<DietAssignment, Self::Error>> + Send + '_;

  /// Soft-delete row `id`, which must belong to `subject` and be the latest
  /// row of its sequence. Returns the tombstoned row.
  fn delete_latest(
    &self,
    id: i64,
    subject: Subject,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<DietAssignment, Self::Error>> + Send + '_;

  /// Evaluate the weight cooldown for `client` on `today`.
  fn weight_gate(
    &self,
    client: ClientId,
    today: NaiveDate,
  ) -> impl Future<Output = Result<GateDecision, Self::Error>> + Send + '_;

  /// Re-check the cooldown and attach `report` to the client's latest Regular
  /// row. A row takes one report; a second is rejected.
  fn submit_weight(
    &self,
    client: ClientId,
    report: WeightReport,
    today: NaiveDate,
  ) -> impl Future<Output = Result<DietAssignment, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn next_week_number(
    &self,
    subject: Subject,
    diet_type: DietType,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// The most recent non-deleted row, if any.
  fn latest_for(
    &self,
    subject: Subject,
    diet_type: DietType,
  ) -> impl Future<Output = Result<Option<DietAssignment>, Self::Error>> + Send + '_;

  /// Row by id, including soft-deleted rows.
  fn get_assignment(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<DietAssignment>, Self::Error>> + Send + '_;

  /// Non-deleted, non-placeholder rows in ascending week order.
  fn history(
    &self,
    subject: Subject,
    diet_type: DietType,
  ) -> impl Future<Output = Result<Vec<DietAssignment>, Self::Error>> + Send + '_;

  /// Reported weights on the client's Regular rows, oldest first.
  fn weight_history(
    &self,
    client: ClientId,
  ) -> impl Future<Output = Result<Vec<WeightEntry>, Self::Error>> + Send + '_;

  /// Day of the latest Regular assignment for every client that has one.
  fn last_assignment_dates(
    &self,
  ) -> impl Future<Output = Result<Vec<(ClientId, NaiveDate)>, Self::Error>> + Send + '_;
}
