//! Synchronous ledger operations, run on the `tokio-rusqlite` connection
//! thread.
//!
//! Every mutating function here expects to be called inside an immediate
//! transaction opened by [`crate::SqliteStore`], so its "find latest" read and
//! its write see the same state.

use chrono::{DateTime, NaiveDate, Utc};
use nutri_core::{
  diet::{
    DietAssignment, DietType, NewAssignment, WeightEntry, WeightReport,
    next_week_after, validate_content,
  },
  gate::GateDecision,
  subject::{ClientId, Subject},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Error, Result,
  encode::{
    ASSIGNMENT_SELECT, RawAssignment, decode_day, encode_day, encode_dt,
    encode_subject, subject_filter,
  },
};

type CoreError = nutri_core::Error;

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn assignment_by_id(conn: &Connection, id: i64) -> Result<Option<DietAssignment>> {
  let sql = format!("{ASSIGNMENT_SELECT} WHERE a.id = ?1");
  conn
    .query_row(&sql, params![id], RawAssignment::from_row)
    .optional()?
    .map(RawAssignment::into_assignment)
    .transpose()
}

/// The latest non-deleted row of a sequence. With `numbered_only`, placeholder
/// rows (week 0) are ignored.
pub fn latest(
  conn: &Connection,
  subject: Subject,
  diet_type: DietType,
  numbered_only: bool,
) -> Result<Option<DietAssignment>> {
  let (filter, subject_id) = subject_filter(subject);
  let numbered = if numbered_only { "AND a.week_number > 0" } else { "" };
  let sql = format!(
    "{ASSIGNMENT_SELECT}
     WHERE {filter} AND a.diet_type = ?2 AND a.deleted_at IS NULL {numbered}
     ORDER BY a.assigned_on DESC, a.created_at DESC, a.id DESC
     LIMIT 1"
  );
  conn
    .query_row(&sql, params![subject_id, diet_type.code()], RawAssignment::from_row)
    .optional()?
    .map(RawAssignment::into_assignment)
    .transpose()
}

pub fn next_week_number(
  conn: &Connection,
  subject: Subject,
  diet_type: DietType,
) -> Result<u32> {
  let latest = latest(conn, subject, diet_type, true)?;
  Ok(next_week_after(latest.map(|a| a.week_number)))
}

pub fn history(
  conn: &Connection,
  subject: Subject,
  diet_type: DietType,
) -> Result<Vec<DietAssignment>> {
  let (filter, subject_id) = subject_filter(subject);
  let sql = format!(
    "{ASSIGNMENT_SELECT}
     WHERE {filter} AND a.diet_type = ?2
       AND a.deleted_at IS NULL AND a.week_number > 0
     ORDER BY a.week_number ASC, a.id ASC"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![subject_id, diet_type.code()], RawAssignment::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAssignment::into_assignment).collect()
}

pub fn weight_history(conn: &Connection, client: ClientId) -> Result<Vec<WeightEntry>> {
  let mut stmt = conn.prepare(
    "SELECT assigned_on, weight FROM diet_assignments
     WHERE client_id = ?1 AND diet_type = ?2
       AND deleted_at IS NULL AND weight IS NOT NULL
     ORDER BY assigned_on ASC, created_at ASC, id ASC",
  )?;
  let rows = stmt
    .query_map(params![client.0, DietType::Regular.code()], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows
    .into_iter()
    .map(|(day, weight)| {
      Ok(WeightEntry { date: decode_day(&day)?, weight: weight as f32 })
    })
    .collect()
}

pub fn last_assignment_dates(conn: &Connection) -> Result<Vec<(ClientId, NaiveDate)>> {
  let mut stmt = conn.prepare(
    "SELECT client_id, MAX(assigned_on) FROM diet_assignments
     WHERE client_id IS NOT NULL AND diet_type = ?1 AND deleted_at IS NULL
     GROUP BY client_id
     ORDER BY client_id",
  )?;
  let rows = stmt
    .query_map(params![DietType::Regular.code()], |row| {
      Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows
    .into_iter()
    .map(|(id, day)| Ok((ClientId(id), decode_day(&day)?)))
    .collect()
}

// ─── Directory checks ────────────────────────────────────────────────────────

fn exists(conn: &Connection, sql: &str, id: i64) -> Result<bool> {
  Ok(conn.query_row(sql, params![id], |_| Ok(())).optional()?.is_some())
}

fn ensure_subject_exists(conn: &Connection, subject: Subject) -> Result<()> {
  match subject {
    Subject::Client(id) => {
      if !exists(conn, "SELECT 1 FROM clients WHERE id = ?1", id.0)? {
        return Err(CoreError::ClientNotFound(id).into());
      }
    }
    Subject::Group(id) => {
      if !exists(conn, "SELECT 1 FROM groups WHERE id = ?1", id.0)? {
        return Err(CoreError::GroupNotFound(id).into());
      }
    }
  }
  Ok(())
}

fn ensure_template_exists(conn: &Connection, id: i64) -> Result<()> {
  let sql = "SELECT 1 FROM diet_templates WHERE id = ?1 AND deleted_at IS NULL";
  if !exists(conn, sql, id)? {
    return Err(CoreError::TemplateNotFound(id).into());
  }
  Ok(())
}

// ─── Appends ─────────────────────────────────────────────────────────────────

/// Append one row numbered after the current latest of its sequence.
pub fn append(
  conn: &Connection,
  input: &NewAssignment,
  now: DateTime<Utc>,
) -> Result<DietAssignment> {
  input.validate()?;
  ensure_subject_exists(conn, input.subject)?;
  if let Some(template_id) = input.template_id {
    ensure_template_exists(conn, template_id)?;
  }

  // Placeholders count for recency but not for numbering.
  let floor = latest(conn, input.subject, input.diet_type, false)?
    .map(|a| a.assigned_on);
  let numbered = latest(conn, input.subject, input.diet_type, true)?;
  let today = now.date_naive();

  let assigned_on = match (input.assigned_on, floor) {
    (Some(day), _) if day > today => {
      return Err(
        CoreError::Validation(format!(
          "assignment date {day} is in the future (today is {today})"
        ))
        .into(),
      );
    }
    (Some(day), Some(floor)) if day < floor => {
      return Err(
        CoreError::Validation(format!(
          "assignment date {day} precedes the latest {} diet of {} ({floor})",
          input.diet_type, input.subject
        ))
        .into(),
      );
    }
    (Some(day), _) => day,
    (None, floor) => floor.map_or(today, |f| f.max(today)),
  };
  let week_number = next_week_after(numbered.map(|a| a.week_number));

  let (client_id, group_id) = encode_subject(input.subject);
  conn.execute(
    "INSERT INTO diet_assignments (
       client_id, group_id, diet_type, week_number, assigned_on,
       content, template_id, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      client_id,
      group_id,
      input.diet_type.code(),
      week_number,
      encode_day(assigned_on),
      input.content,
      input.template_id,
      encode_dt(now),
    ],
  )?;

  let id = conn.last_insert_rowid();
  tracing::debug!(
    id,
    subject = %input.subject,
    diet_type = %input.diet_type,
    week_number,
    "appended diet assignment"
  );
  fetch_written(conn, id)
}

pub fn append_all(
  conn: &Connection,
  inputs: &[NewAssignment],
  now: DateTime<Utc>,
) -> Result<Vec<DietAssignment>> {
  inputs.iter().map(|input| append(conn, input, now)).collect()
}

// ─── Latest-only mutations ───────────────────────────────────────────────────

/// Load row `id` and confirm it is live and belongs to `subject`.
fn live_row(conn: &Connection, id: i64, subject: Subject) -> Result<DietAssignment> {
  assignment_by_id(conn, id)?
    .filter(|a| !a.is_deleted() && a.subject == subject)
    .ok_or_else(|| CoreError::AssignmentNotFound(id).into())
}

/// Independently re-derive the latest row of `row`'s sequence and require it
/// to be `row`.
fn require_latest(conn: &Connection, row: &DietAssignment) -> Result<()> {
  let latest = latest(conn, row.subject, row.diet_type, false)?;
  match latest {
    Some(l) if l.id == row.id => Ok(()),
    other => Err(
      CoreError::NotLatest { id: row.id, latest: other.map(|l| l.id) }.into(),
    ),
  }
}

pub fn edit(
  conn: &Connection,
  id: i64,
  diet_type: DietType,
  subject: Subject,
  content: &str,
) -> Result<DietAssignment> {
  validate_content(content)?;
  let row = live_row(conn, id, subject)?;
  if row.diet_type != diet_type {
    return Err(CoreError::AssignmentNotFound(id).into());
  }
  require_latest(conn, &row)?;

  conn.execute(
    "UPDATE diet_assignments SET content = ?1 WHERE id = ?2",
    params![content, id],
  )?;
  tracing::debug!(id, subject = %subject, %diet_type, "edited diet content");
  fetch_written(conn, id)
}

pub fn soft_delete(
  conn: &Connection,
  id: i64,
  subject: Subject,
  now: DateTime<Utc>,
) -> Result<DietAssignment> {
  let row = live_row(conn, id, subject)?;
  require_latest(conn, &row)?;

  conn.execute(
    "UPDATE diet_assignments SET deleted_at = ?1 WHERE id = ?2",
    params![encode_dt(now), id],
  )?;
  tracing::debug!(
    id,
    subject = %subject,
    diet_type = %row.diet_type,
    week_number = row.week_number,
    "withdrew latest diet assignment"
  );
  fetch_written(conn, id)
}

// ─── Weight gate ─────────────────────────────────────────────────────────────

fn latest_regular(conn: &Connection, client: ClientId) -> Result<DietAssignment> {
  latest(conn, Subject::Client(client), DietType::Regular, false)?
    .ok_or_else(|| CoreError::NoAssignment(client).into())
}

pub fn gate(conn: &Connection, client: ClientId, today: NaiveDate) -> Result<GateDecision> {
  let row = latest_regular(conn, client)?;
  Ok(GateDecision::evaluate(row.assigned_on, today))
}

pub fn attach_weight(
  conn: &Connection,
  client: ClientId,
  report: &WeightReport,
  today: NaiveDate,
) -> Result<DietAssignment> {
  report.validate()?;
  let row = latest_regular(conn, client)?;
  GateDecision::evaluate(row.assigned_on, today).require_open(client)?;
  if row.weight.is_some() {
    return Err(CoreError::WeightAlreadyReported(row.id).into());
  }

  conn.execute(
    "UPDATE diet_assignments SET weight = ?1, feedback = ?2 WHERE id = ?3",
    params![f64::from(report.weight), report.feedback, row.id],
  )?;
  tracing::debug!(
    id = row.id,
    client = %client,
    week_number = row.week_number,
    "attached weight report"
  );
  fetch_written(conn, row.id)
}

/// Re-read a row this transaction just wrote.
fn fetch_written(conn: &Connection, id: i64) -> Result<DietAssignment> {
  assignment_by_id(conn, id)?
    .ok_or_else(|| Error::Corrupt(format!("assignment {id} vanished after write")))
}
