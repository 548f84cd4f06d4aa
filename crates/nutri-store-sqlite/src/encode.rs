//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that lexical order
//! matches chronological order. Calendar days are stored as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use nutri_core::{
  diet::{DietAssignment, DietType},
  directory::{Client, DietTemplate, Group},
  subject::{ClientId, GroupId, Subject},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_day(day: NaiveDate) -> String { day.format("%Y-%m-%d").to_string() }

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// Split a subject into its `(client_id, group_id)` column pair.
pub fn encode_subject(subject: Subject) -> (Option<i64>, Option<i64>) {
  match subject {
    Subject::Client(ClientId(id)) => (Some(id), None),
    Subject::Group(GroupId(id)) => (None, Some(id)),
  }
}

pub fn decode_subject(
  client_id: Option<i64>,
  group_id: Option<i64>,
) -> Result<Subject> {
  match (client_id, group_id) {
    (Some(c), None) => Ok(Subject::client(c)),
    (None, Some(g)) => Ok(Subject::group(g)),
    other => Err(Error::Corrupt(format!(
      "assignment must target exactly one subject, got {other:?}"
    ))),
  }
}

/// The `WHERE` fragment selecting rows of `subject`, bound to `?1`.
pub fn subject_filter(subject: Subject) -> (&'static str, i64) {
  match subject {
    Subject::Client(ClientId(id)) => ("a.client_id = ?1", id),
    Subject::Group(GroupId(id)) => ("a.group_id = ?1", id),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected for every assignment read; pairs with
/// [`RawAssignment::from_row`].
pub const ASSIGNMENT_SELECT: &str = "
  SELECT a.id, a.client_id, a.group_id, a.diet_type, a.week_number,
         a.assigned_on, a.content, a.template_id, t.name,
         a.weight, a.feedback, a.created_at, a.deleted_at
  FROM diet_assignments a
  LEFT JOIN diet_templates t ON t.id = a.template_id";

/// Raw values read directly from a `diet_assignments` row joined with its
/// template.
pub struct RawAssignment {
  pub id:            i64,
  pub client_id:     Option<i64>,
  pub group_id:      Option<i64>,
  pub diet_type:     i64,
  pub week_number:   i64,
  pub assigned_on:   String,
  pub content:       String,
  pub template_id:   Option<i64>,
  pub template_name: Option<String>,
  pub weight:        Option<f64>,
  pub feedback:      Option<String>,
  pub created_at:    String,
  pub deleted_at:    Option<String>,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      client_id:     row.get(1)?,
      group_id:      row.get(2)?,
      diet_type:     row.get(3)?,
      week_number:   row.get(4)?,
      assigned_on:   row.get(5)?,
      content:       row.get(6)?,
      template_id:   row.get(7)?,
      template_name: row.get(8)?,
      weight:        row.get(9)?,
      feedback:      row.get(10)?,
      created_at:    row.get(11)?,
      deleted_at:    row.get(12)?,
    })
  }

  pub fn into_assignment(self) -> Result<DietAssignment> {
    let week_number = u32::try_from(self.week_number).map_err(|_| {
      Error::Corrupt(format!(
        "assignment {} has week number {}",
        self.id, self.week_number
      ))
    })?;

    Ok(DietAssignment {
      id: self.id,
      subject: decode_subject(self.client_id, self.group_id)?,
      diet_type: DietType::from_code(self.diet_type)?,
      week_number,
      assigned_on: decode_day(&self.assigned_on)?,
      content: self.content,
      template_id: self.template_id,
      template_name: self.template_name,
      weight: self.weight.map(|w| w as f32),
      feedback: self.feedback,
      created_at: decode_dt(&self.created_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read from a `clients` row.
pub struct RawClient {
  pub id:        i64,
  pub name:      String,
  pub group_id:  Option<i64>,
  pub is_active: bool,
}

impl RawClient {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      name:      row.get(1)?,
      group_id:  row.get(2)?,
      is_active: row.get(3)?,
    })
  }

  pub fn into_client(self) -> Client {
    Client {
      id:        ClientId(self.id),
      name:      self.name,
      group_id:  self.group_id.map(GroupId),
      is_active: self.is_active,
    }
  }
}

pub fn group_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
  Ok(Group { id: GroupId(row.get(0)?), name: row.get(1)? })
}

/// Raw values read from a `diet_templates` row.
pub struct RawTemplate {
  pub id:         i64,
  pub name:       String,
  pub content:    String,
  pub created_at: String,
}

impl RawTemplate {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      content:    row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_template(self) -> Result<DietTemplate> {
    Ok(DietTemplate {
      id:         self.id,
      name:       self.name,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
