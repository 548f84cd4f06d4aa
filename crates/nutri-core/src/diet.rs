//! Diet assignments, the rows of the ledger.
//!
//! Every diet handed to a subject is appended as a new [`DietAssignment`].
//! Rows are numbered per (subject, diet type) and only the most recent
//! non-deleted row may be edited, withdrawn, or receive a weight report.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result, subject::Subject};

// ─── DietType ────────────────────────────────────────────────────────────────

/// The closed set of diet kinds. Each kind has its own week-number sequence.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DietType {
  Regular,
  DetoxDiet,
  DetoxWater,
}

impl DietType {
  /// Integer code persisted in the `diet_type` column.
  pub fn code(self) -> i64 {
    match self {
      Self::Regular => 1,
      Self::DetoxDiet => 2,
      Self::DetoxWater => 3,
    }
  }

  pub fn from_code(code: i64) -> Result<Self> {
    match code {
      1 => Ok(Self::Regular),
      2 => Ok(Self::DetoxDiet),
      3 => Ok(Self::DetoxWater),
      other => Err(Error::UnknownDietType(other)),
    }
  }

  /// Whether rows of this type are addressed to a single client (as opposed
  /// to a group).
  pub fn targets_client(self) -> bool { matches!(self, Self::Regular) }
}

// ─── DietAssignment ──────────────────────────────────────────────────────────

/// One ledger entry: a diet handed to a subject on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietAssignment {
  pub id:            i64,
  pub subject:       Subject,
  pub diet_type:     DietType,
  /// Position in the (subject, diet type) sequence; `0` marks a placeholder.
  pub week_number:   u32,
  pub assigned_on:   NaiveDate,
  pub content:       String,
  pub template_id:   Option<i64>,
  /// Name of the referenced template, joined on read.
  pub template_name: Option<String>,
  pub weight:        Option<f32>,
  pub feedback:      Option<String>,
  pub created_at:    DateTime<Utc>,
  pub deleted_at:    Option<DateTime<Utc>>,
}

impl DietAssignment {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  pub fn is_placeholder(&self) -> bool { self.week_number == 0 }

  /// Recency order used to pick the latest row: assignment day, then
  /// creation time, then id.
  pub fn recency_cmp(&self, other: &Self) -> Ordering {
    self
      .assigned_on
      .cmp(&other.assigned_on)
      .then(self.created_at.cmp(&other.created_at))
      .then(self.id.cmp(&other.id))
  }
}

/// Pick the latest non-deleted row out of `rows`.
pub fn latest_of<'a, I>(rows: I) -> Option<&'a DietAssignment>
where
  I: IntoIterator<Item = &'a DietAssignment>,
{
  rows
    .into_iter()
    .filter(|r| !r.is_deleted())
    .max_by(|a, b| a.recency_cmp(b))
}

/// The week number that follows `latest`, skipping placeholder rows.
pub fn next_week_after(latest: Option<u32>) -> u32 {
  latest.map_or(1, |w| w + 1)
}

// ─── NewAssignment ───────────────────────────────────────────────────────────

/// Input to [`crate::store::DietLedger::assign_diet`]. The week number and
/// creation time are always chosen by the store.
#[derive(Debug, Clone)]
pub struct NewAssignment {
  pub subject:     Subject,
  pub diet_type:   DietType,
  pub content:     String,
  pub template_id: Option<i64>,
  /// Defaults to the current UTC day when `None`.
  pub assigned_on: Option<NaiveDate>,
}

impl NewAssignment {
  pub fn new(
    subject: Subject,
    diet_type: DietType,
    content: impl Into<String>,
  ) -> Self {
    Self {
      subject,
      diet_type,
      content: content.into(),
      template_id: None,
      assigned_on: None,
    }
  }

  pub fn on(mut self, day: NaiveDate) -> Self {
    self.assigned_on = Some(day);
    self
  }

  pub fn from_template(mut self, template_id: i64) -> Self {
    self.template_id = Some(template_id);
    self
  }

  /// Business-rule checks that need no storage access.
  pub fn validate(&self) -> Result<()> {
    validate_content(&self.content)?;
    self.subject.validate_id()?;
    self.subject.check_binding(self.diet_type)?;
    Ok(())
  }
}

pub fn validate_content(content: &str) -> Result<()> {
  if content.trim().is_empty() {
    return Err(Error::Validation("diet content must not be empty".into()));
  }
  Ok(())
}

// ─── Weight ──────────────────────────────────────────────────────────────────

/// A client's self-reported measurement, attached to their latest Regular row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightReport {
  pub weight:   f32,
  #[serde(default)]
  pub feedback: Option<String>,
}

impl WeightReport {
  pub fn validate(&self) -> Result<()> {
    if !self.weight.is_finite() || self.weight <= 0.0 {
      return Err(Error::Validation(format!(
        "weight must be a positive number, got {}",
        self.weight
      )));
    }
    Ok(())
  }
}

/// One point of a client's weight history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
  pub date:   NaiveDate,
  pub weight: f32,
}
