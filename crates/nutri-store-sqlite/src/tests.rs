//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
use nutri_core::{
  Error as CoreError,
  diet::{DietType, NewAssignment, WeightReport},
  directory::{Directory, NewClient},
  store::DietLedger,
  subject::{ClientId, GroupId, Subject},
};
use rusqlite::params;

use crate::{Error, SqliteStore, store::retry_on_conflict};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn group(s: &SqliteStore, name: &str) -> GroupId {
  s.add_group(name.into()).await.unwrap().id
}

async fn client_in(s: &SqliteStore, group_id: Option<GroupId>) -> ClientId {
  s.add_client(NewClient {
    name: "Asha".into(),
    group_id,
    is_active: true,
  })
  .await
  .unwrap()
  .id
}

async fn client(s: &SqliteStore) -> ClientId { client_in(s, None).await }

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Wall-clock instant every write in this suite happens at.
fn now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn regular(c: ClientId, content: &str) -> NewAssignment {
  NewAssignment::new(Subject::Client(c), DietType::Regular, content)
}

fn ledger_err<T: std::fmt::Debug>(r: Result<T, Error>) -> CoreError {
  match r {
    Err(Error::Ledger(e)) => e,
    other => panic!("expected ledger error, got {other:?}"),
  }
}

// ─── Sequencing ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_assignments_number_weeks_from_one() {
  let s = store().await;
  let c = client(&s).await;

  let a = s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();
  assert_eq!(a.week_number, 1);
  assert!(a.weight.is_none() && a.feedback.is_none());

  let b = s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();
  assert_eq!(b.week_number, 2);

  let latest = s
    .latest_for(Subject::Client(c), DietType::Regular)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(latest.id, b.id);
  assert_eq!(latest.content, "Plan B");
  assert_eq!(
    s.next_week_number(Subject::Client(c), DietType::Regular).await.unwrap(),
    3
  );
}

#[tokio::test]
async fn diet_types_have_independent_sequences() {
  let s = store().await;
  let g = group(&s, "Morning batch").await;

  s.assign_diet(NewAssignment::new(Subject::Group(g), DietType::DetoxDiet, "Juice"), now())
    .await
    .unwrap();
  s.assign_diet(NewAssignment::new(Subject::Group(g), DietType::DetoxDiet, "Soup"), now())
    .await
    .unwrap();
  let water = s
    .assign_diet(NewAssignment::new(Subject::Group(g), DietType::DetoxWater, "Lemon"), now())
    .await
    .unwrap();

  assert_eq!(water.week_number, 1);
  assert_eq!(
    s.next_week_number(Subject::Group(g), DietType::DetoxDiet).await.unwrap(),
    3
  );
}

#[tokio::test]
async fn concurrent_assignments_never_share_a_week() {
  let s = store().await;
  let c = client(&s).await;

  let mut handles = Vec::new();
  for i in 0..16 {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      s.assign_diet(regular(c, &format!("Plan {i}")), now()).await
    }));
  }
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let weeks: Vec<u32> = s
    .history(Subject::Client(c), DietType::Regular)
    .await
    .unwrap()
    .iter()
    .map(|a| a.week_number)
    .collect();
  assert_eq!(weeks, (1..=16).collect::<Vec<_>>());
}

#[tokio::test]
async fn unique_index_rejects_duplicate_live_week() {
  let s = store().await;
  let c = client(&s).await;
  s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();

  let err = s
    .conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO diet_assignments
           (client_id, diet_type, week_number, assigned_on, content, created_at)
         VALUES (?1, 1, 1, '2024-01-01', 'dup', '2024-01-01T00:00:00.000000000Z')",
        params![c.0],
      )?;
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(Error::from(err).is_conflict());
}

#[tokio::test]
async fn placeholder_rows_are_skipped_for_numbering_and_history() {
  let s = store().await;
  let c = client(&s).await;
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO diet_assignments
           (client_id, diet_type, week_number, assigned_on, content, created_at)
         VALUES (?1, 1, 0, '2023-12-01', 'placeholder', '2023-12-01T00:00:00.000000000Z')",
        params![c.0],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let first = s
    .assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();
  assert_eq!(first.week_number, 1);

  let history = s.history(Subject::Client(c), DietType::Regular).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].id, first.id);
}

#[tokio::test]
async fn backdated_assignment_is_rejected() {
  let s = store().await;
  let c = client(&s).await;
  s.assign_diet(regular(c, "Plan A").on(day(2024, 1, 10)), now())
    .await
    .unwrap();

  let err = ledger_err(
    s.assign_diet(regular(c, "Plan B").on(day(2024, 1, 5)), now()).await,
  );
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn placeholder_day_bounds_later_assignments() {
  let s = store().await;
  let c = client(&s).await;
  let a = s
    .assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO diet_assignments
           (client_id, diet_type, week_number, assigned_on, content, created_at)
         VALUES (?1, 1, 0, '2024-03-01', 'placeholder', '2024-03-01T00:00:00.000000000Z')",
        params![c.0],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  // Later than week 1 but earlier than the placeholder.
  let err = ledger_err(
    s.assign_diet(regular(c, "Plan B").on(day(2024, 2, 1)), now()).await,
  );
  assert!(matches!(err, CoreError::Validation(_)));

  let b = s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();
  assert_eq!(b.week_number, a.week_number + 1);
  assert_eq!(b.assigned_on, day(2024, 6, 1));

  let latest = s
    .latest_for(Subject::Client(c), DietType::Regular)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(latest.id, b.id);
  s.delete_latest(b.id, Subject::Client(c), now()).await.unwrap();
}

#[tokio::test]
async fn future_assignment_date_is_rejected() {
  let s = store().await;
  let c = client(&s).await;

  let err = ledger_err(
    s.assign_diet(regular(c, "Plan A").on(day(2024, 6, 2)), now()).await,
  );
  assert!(matches!(err, CoreError::Validation(_)));
  assert!(
    s.latest_for(Subject::Client(c), DietType::Regular)
      .await
      .unwrap()
      .is_none()
  );

  let a = s
    .assign_diet(regular(c, "Plan A").on(day(2024, 6, 1)), now())
    .await
    .unwrap();
  assert_eq!(a.assigned_on, day(2024, 6, 1));

  let b = s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();
  assert_eq!(b.assigned_on, day(2024, 6, 1));
  assert_eq!(b.created_at, now());
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn subject_kind_must_match_diet_type() {
  let s = store().await;
  let g = group(&s, "Evening batch").await;
  let c = client_in(&s, Some(g)).await;

  let err = ledger_err(
    s.assign_diet(NewAssignment::new(Subject::Group(g), DietType::Regular, "x"), now())
      .await,
  );
  assert!(matches!(err, CoreError::Validation(_)));

  let err = ledger_err(
    s.assign_diet(NewAssignment::new(Subject::Client(c), DietType::DetoxWater, "x"), now())
      .await,
  );
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn empty_content_is_rejected() {
  let s = store().await;
  let c = client(&s).await;
  let err = ledger_err(s.assign_diet(regular(c, "   "), now()).await);
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn unknown_subject_is_not_found() {
  let s = store().await;
  let err = ledger_err(s.assign_diet(regular(ClientId(999), "Plan"), now()).await);
  assert!(matches!(err, CoreError::ClientNotFound(ClientId(999))));

  let err = ledger_err(
    s.assign_diet(NewAssignment::new(Subject::group(55), DietType::DetoxDiet, "x"), now())
      .await,
  );
  assert!(matches!(err, CoreError::GroupNotFound(GroupId(55))));
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn template_name_is_joined_on_read() {
  let s = store().await;
  let c = client(&s).await;
  let t = s
    .add_template("Low carb".into(), "Eggs, greens".into())
    .await
    .unwrap();

  let a = s
    .assign_diet(regular(c, &t.content).from_template(t.id), now())
    .await
    .unwrap();
  assert_eq!(a.template_id, Some(t.id));
  assert_eq!(a.template_name.as_deref(), Some("Low carb"));

  let err = ledger_err(s.assign_diet(regular(c, "x").from_template(404), now()).await);
  assert!(matches!(err, CoreError::TemplateNotFound(404)));
}

// ─── Batch ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_sequences_each_group_independently() {
  let s = store().await;
  let g7 = group(&s, "Seven").await;
  let g9 = group(&s, "Nine").await;

  let rows = s
    .assign_batch(vec![
      NewAssignment::new(Subject::Group(g7), DietType::DetoxDiet, "Detox Plan"),
      NewAssignment::new(Subject::Group(g9), DietType::DetoxDiet, "Detox Plan"),
    ], now())
    .await
    .unwrap();

  assert_eq!(rows.len(), 2);
  assert!(rows.iter().all(|r| r.week_number == 1));
  assert_eq!(rows[0].subject, Subject::Group(g7));
  assert_eq!(rows[1].subject, Subject::Group(g9));

  let again = s
    .assign_diet(NewAssignment::new(Subject::Group(g7), DietType::DetoxDiet, "Next"), now())
    .await
    .unwrap();
  assert_eq!(again.week_number, 2);
  assert_eq!(
    s.next_week_number(Subject::Group(g9), DietType::DetoxDiet).await.unwrap(),
    2
  );
}

#[tokio::test]
async fn failing_batch_writes_nothing() {
  let s = store().await;
  let g = group(&s, "Only").await;

  let err = ledger_err(
    s.assign_batch(vec![
      NewAssignment::new(Subject::Group(g), DietType::DetoxDiet, "Detox Plan"),
      NewAssignment::new(Subject::group(404), DietType::DetoxDiet, "Detox Plan"),
    ], now())
    .await,
  );
  assert!(matches!(err, CoreError::GroupNotFound(GroupId(404))));

  let latest = s.latest_for(Subject::Group(g), DietType::DetoxDiet).await.unwrap();
  assert!(latest.is_none());
}

#[tokio::test]
async fn empty_batch_is_rejected() {
  let s = store().await;
  let err = ledger_err(s.assign_batch(Vec::new(), now()).await);
  assert!(matches!(err, CoreError::Validation(_)));
}

// ─── Edit ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn edit_latest_changes_only_content() {
  let s = store().await;
  let c = client(&s).await;
  let a = s
    .assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();

  let edited = s
    .edit_diet(a.id, DietType::Regular, Subject::Client(c), "Plan A+".into())
    .await
    .unwrap();

  assert_eq!(edited.content, "Plan A+");
  assert_eq!(edited.week_number, a.week_number);
  assert_eq!(edited.assigned_on, a.assigned_on);
  assert_eq!(edited.created_at, a.created_at);
}

#[tokio::test]
async fn edit_of_older_row_is_not_latest() {
  let s = store().await;
  let c = client(&s).await;
  let a = s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();
  let b = s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();

  let err = ledger_err(
    s.edit_diet(a.id, DietType::Regular, Subject::Client(c), "rewrite".into())
      .await,
  );
  assert!(matches!(
    err,
    CoreError::NotLatest { id, latest: Some(l) } if id == a.id && l == b.id
  ));

  let unchanged = s.get_assignment(a.id).await.unwrap().unwrap();
  assert_eq!(unchanged.content, "Plan A");
}

#[tokio::test]
async fn edit_with_mismatched_keys_is_not_found() {
  let s = store().await;
  let c = client(&s).await;
  let other = client(&s).await;
  let a = s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();

  let err = ledger_err(
    s.edit_diet(a.id, DietType::Regular, Subject::Client(other), "x".into())
      .await,
  );
  assert!(matches!(err, CoreError::AssignmentNotFound(_)));

  let err = ledger_err(
    s.edit_diet(a.id, DietType::DetoxDiet, Subject::Client(c), "x".into())
      .await,
  );
  assert!(matches!(err, CoreError::AssignmentNotFound(_)));
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_of_older_row_is_not_latest() {
  let s = store().await;
  let c = client(&s).await;
  let first = s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();
  s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();

  let err = ledger_err(s.delete_latest(first.id, Subject::Client(c), now()).await);
  assert!(matches!(err, CoreError::NotLatest { .. }));
  assert!(!s.get_assignment(first.id).await.unwrap().unwrap().is_deleted());
}

#[tokio::test]
async fn delete_latest_exposes_previous_row() {
  let s = store().await;
  let c = client(&s).await;
  let a = s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();
  let b = s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();

  let tombstone = s.delete_latest(b.id, Subject::Client(c), now()).await.unwrap();
  assert!(tombstone.is_deleted());
  assert_eq!(tombstone.week_number, 2);

  let latest = s
    .latest_for(Subject::Client(c), DietType::Regular)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(latest.id, a.id);

  // The audit row survives.
  assert!(s.get_assignment(b.id).await.unwrap().unwrap().is_deleted());

  // Deleting it again finds nothing live.
  let err = ledger_err(s.delete_latest(b.id, Subject::Client(c), now()).await);
  assert!(matches!(err, CoreError::AssignmentNotFound(_)));

  s.delete_latest(a.id, Subject::Client(c), now()).await.unwrap();
  assert!(
    s.latest_for(Subject::Client(c), DietType::Regular)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn numbering_stays_contiguous_after_delete() {
  let s = store().await;
  let c = client(&s).await;
  s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();
  let b = s.assign_diet(regular(c, "Plan B"), now()).await.unwrap();
  s.delete_latest(b.id, Subject::Client(c), now()).await.unwrap();

  let c2 = s.assign_diet(regular(c, "Plan B, take two"), now()).await.unwrap();
  assert_eq!(c2.week_number, 2);

  let weeks: Vec<u32> = s
    .history(Subject::Client(c), DietType::Regular)
    .await
    .unwrap()
    .iter()
    .map(|a| a.week_number)
    .collect();
  assert_eq!(weeks, vec![1, 2]);

  // The tombstone keeps its number for audit.
  let tombstone = s.get_assignment(b.id).await.unwrap().unwrap();
  assert!(tombstone.is_deleted());
  assert_eq!(tombstone.week_number, 2);
  assert_eq!(tombstone.content, "Plan B");
}

#[tokio::test]
async fn delete_for_wrong_subject_is_not_found() {
  let s = store().await;
  let c = client(&s).await;
  let other = client(&s).await;
  let a = s.assign_diet(regular(c, "Plan A"), now()).await.unwrap();

  let err = ledger_err(s.delete_latest(a.id, Subject::Client(other), now()).await);
  assert!(matches!(err, CoreError::AssignmentNotFound(_)));
}

// ─── Weight gate ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn gate_opens_four_days_after_assignment() {
  let s = store().await;
  let c = client(&s).await;
  s.assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();

  assert!(!s.weight_gate(c, day(2024, 1, 1)).await.unwrap().allowed);
  assert!(!s.weight_gate(c, day(2024, 1, 3)).await.unwrap().allowed);
  assert!(s.weight_gate(c, day(2024, 1, 5)).await.unwrap().allowed);
  assert!(s.weight_gate(c, day(2024, 2, 1)).await.unwrap().allowed);
}

#[tokio::test]
async fn gate_without_assignment_is_distinct() {
  let s = store().await;
  let c = client(&s).await;
  let err = ledger_err(s.weight_gate(c, day(2024, 1, 1)).await);
  assert!(matches!(err, CoreError::NoAssignment(id) if id == c));

  let report = WeightReport { weight: 70.0, feedback: None };
  let err = ledger_err(s.submit_weight(c, report, day(2024, 1, 1)).await);
  assert!(matches!(err, CoreError::NoAssignment(_)));
}

#[tokio::test]
async fn submit_before_cooldown_is_not_allowed() {
  let s = store().await;
  let c = client(&s).await;
  let a = s
    .assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();

  let report = WeightReport { weight: 70.0, feedback: None };
  let err = ledger_err(s.submit_weight(c, report, day(2024, 1, 3)).await);
  assert!(matches!(
    err,
    CoreError::NotAllowed { days_remaining: 2, allowed_from, .. }
      if allowed_from == day(2024, 1, 5)
  ));
  assert!(s.get_assignment(a.id).await.unwrap().unwrap().weight.is_none());
}

#[tokio::test]
async fn weight_attaches_to_latest_row() {
  let s = store().await;
  let c = client(&s).await;
  s.assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();
  let b = s
    .assign_diet(regular(c, "Plan B").on(day(2024, 1, 8)), now())
    .await
    .unwrap();

  let report = WeightReport { weight: 68.5, feedback: Some("felt great".into()) };
  let updated = s.submit_weight(c, report, day(2024, 1, 12)).await.unwrap();

  assert_eq!(updated.id, b.id);
  assert_eq!(updated.week_number, b.week_number);
  assert_eq!(updated.weight, Some(68.5));
  assert_eq!(updated.feedback.as_deref(), Some("felt great"));

  let history = s.history(Subject::Client(c), DietType::Regular).await.unwrap();
  assert_eq!(history.len(), 2);
  assert!(history[0].weight.is_none());
}

#[tokio::test]
async fn second_weight_report_is_rejected() {
  let s = store().await;
  let c = client(&s).await;
  let a = s
    .assign_diet(regular(c, "Plan A").on(day(2024, 1, 1)), now())
    .await
    .unwrap();

  let first = WeightReport { weight: 70.0, feedback: Some("ok".into()) };
  s.submit_weight(c, first, day(2024, 1, 5)).await.unwrap();

  let second = WeightReport { weight: 65.0, feedback: None };
  let err = ledger_err(s.submit_weight(c, second, day(2024, 1, 6)).await);
  assert!(matches!(err, CoreError::WeightAlreadyReported(id) if id == a.id));

  let kept = s.get_assignment(a.id).await.unwrap().unwrap();
  assert_eq!(kept.weight, Some(70.0));
  assert_eq!(kept.feedback.as_deref(), Some("ok"));
}

#[tokio::test]
async fn weight_history_is_oldest_first_and_skips_unset() {
  let s = store().await;
  let c = client(&s).await;

  s.assign_diet(regular(c, "W1").on(day(2024, 1, 1)), now()).await.unwrap();
  s.submit_weight(c, WeightReport { weight: 80.0, feedback: None }, day(2024, 1, 6))
    .await
    .unwrap();
  s.assign_diet(regular(c, "W2").on(day(2024, 1, 8)), now()).await.unwrap();
  s.assign_diet(regular(c, "W3").on(day(2024, 1, 15)), now()).await.unwrap();
  s.submit_weight(c, WeightReport { weight: 78.0, feedback: None }, day(2024, 1, 20))
    .await
    .unwrap();

  let entries = s.weight_history(c).await.unwrap();
  let points: Vec<(NaiveDate, f32)> =
    entries.iter().map(|e| (e.date, e.weight)).collect();
  assert_eq!(points, vec![(day(2024, 1, 1), 80.0), (day(2024, 1, 15), 78.0)]);
}

// ─── Summaries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn last_assignment_dates_per_client() {
  let s = store().await;
  let a = client(&s).await;
  let b = client(&s).await;
  let _idle = client(&s).await;

  s.assign_diet(regular(a, "A1").on(day(2024, 1, 1)), now()).await.unwrap();
  s.assign_diet(regular(a, "A2").on(day(2024, 1, 8)), now()).await.unwrap();
  s.assign_diet(regular(b, "B1").on(day(2024, 2, 3)), now()).await.unwrap();

  let dates = s.last_assignment_dates().await.unwrap();
  assert_eq!(dates, vec![(a, day(2024, 1, 8)), (b, day(2024, 2, 3))]);
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn client_group_membership_roundtrip() {
  let s = store().await;
  let g = group(&s, "Seven").await;
  let c = client_in(&s, Some(g)).await;

  let fetched = s.client(c).await.unwrap().unwrap();
  assert_eq!(fetched.group_id, Some(g));
  assert!(fetched.is_active);
  assert!(s.client(ClientId(404)).await.unwrap().is_none());
  assert_eq!(s.group(g).await.unwrap().unwrap().name, "Seven");
  assert_eq!(s.list_clients().await.unwrap().len(), 1);
}

#[tokio::test]
async fn client_in_missing_group_is_rejected() {
  let s = store().await;
  let err = ledger_err(
    s.add_client(NewClient {
      name: "Ravi".into(),
      group_id: Some(GroupId(12)),
      is_active: true,
    })
    .await,
  );
  assert!(matches!(err, CoreError::GroupNotFound(GroupId(12))));
}

#[tokio::test]
async fn client_activation_toggles() {
  let s = store().await;
  let c = client(&s).await;

  let off = s.set_client_active(c, false).await.unwrap();
  assert!(!off.is_active);
  assert!(!s.client(c).await.unwrap().unwrap().is_active);

  let on = s.set_client_active(c, true).await.unwrap();
  assert!(on.is_active);

  let err = ledger_err(s.set_client_active(ClientId(404), false).await);
  assert!(matches!(err, CoreError::ClientNotFound(ClientId(404))));
}

#[tokio::test]
async fn template_update_and_delete() {
  let s = store().await;
  let c = client(&s).await;
  let t = s
    .add_template("Low carb".into(), "Eggs".into())
    .await
    .unwrap();

  let updated = s
    .update_template(t.id, "Lower carb".into(), "Eggs, greens".into())
    .await
    .unwrap();
  assert_eq!(updated.name, "Lower carb");
  assert_eq!(updated.content, "Eggs, greens");
  assert_eq!(updated.created_at, t.created_at);

  let err = ledger_err(s.update_template(t.id, "x".into(), "  ".into()).await);
  assert!(matches!(err, CoreError::Validation(_)));

  let a = s
    .assign_diet(regular(c, &updated.content).from_template(t.id), now())
    .await
    .unwrap();

  s.delete_template(t.id).await.unwrap();
  assert!(s.template(t.id).await.unwrap().is_none());
  assert!(s.list_templates().await.unwrap().is_empty());

  // Rows assigned from it keep the reference.
  let kept = s.get_assignment(a.id).await.unwrap().unwrap();
  assert_eq!(kept.template_name.as_deref(), Some("Lower carb"));

  let err = ledger_err(s.assign_diet(regular(c, "x").from_template(t.id), now()).await);
  assert!(matches!(err, CoreError::TemplateNotFound(id) if id == t.id));
  let err = ledger_err(s.delete_template(t.id).await);
  assert!(matches!(err, CoreError::TemplateNotFound(_)));
  let err = ledger_err(s.update_template(t.id, "y".into(), "z".into()).await);
  assert!(matches!(err, CoreError::TemplateNotFound(_)));
}

#[test]
fn busy_and_unique_failures_are_conflicts() {
  let unique = rusqlite::Error::SqliteFailure(
    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
    None,
  );
  assert!(Error::Sqlite(unique).is_conflict());

  let busy = rusqlite::Error::SqliteFailure(
    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
    None,
  );
  assert!(Error::Sqlite(busy).is_conflict());

  let check = rusqlite::Error::SqliteFailure(
    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK),
    None,
  );
  assert!(!Error::Sqlite(check).is_conflict());
  assert!(!Error::Ledger(CoreError::Conflict).is_conflict());
}

// ─── Write retries ───────────────────────────────────────────────────────────

fn unique_violation() -> Error {
  Error::Sqlite(rusqlite::Error::SqliteFailure(
    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
    None,
  ))
}

#[tokio::test]
async fn lost_race_is_retried_once() {
  let calls = AtomicUsize::new(0);
  let out = retry_on_conflict(|| {
    let n = calls.fetch_add(1, Ordering::SeqCst);
    async move { if n == 0 { Err(unique_violation()) } else { Ok(n) } }
  })
  .await
  .unwrap();
  assert_eq!(out, 1);
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn second_lost_race_is_a_conflict() {
  let calls = AtomicUsize::new(0);
  let result: Result<(), Error> = retry_on_conflict(|| {
    calls.fetch_add(1, Ordering::SeqCst);
    async { Err(unique_violation()) }
  })
  .await;
  assert!(matches!(result, Err(Error::Ledger(CoreError::Conflict))));
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn other_failures_are_not_retried() {
  let calls = AtomicUsize::new(0);
  let result: Result<(), Error> = retry_on_conflict(|| {
    calls.fetch_add(1, Ordering::SeqCst);
    async { Err(Error::Ledger(CoreError::Validation("bad".into()))) }
  })
  .await;
  assert!(matches!(result, Err(Error::Ledger(CoreError::Validation(_)))));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}
