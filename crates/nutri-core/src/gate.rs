//! The weight/feedback cooldown.
//!
//! A client may report weight only once their dietitian's next diet is due:
//! from the fourth calendar day after the latest Regular assignment onwards.
//! The comparison is between UTC calendar days, never elapsed hours.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, subject::ClientId};

/// Calendar days between an assignment and the first day a weight may be
/// reported against it.
pub const COOLDOWN_DAYS: u64 = 4;

/// Outcome of evaluating the gate for one assignment on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
  pub assigned_on:    NaiveDate,
  pub allowed_from:   NaiveDate,
  pub today:          NaiveDate,
  pub allowed:        bool,
  /// Whole days left until `allowed_from`; zero once the gate is open.
  pub days_remaining: i64,
}

impl GateDecision {
  pub fn evaluate(assigned_on: NaiveDate, today: NaiveDate) -> Self {
    let allowed_from = assigned_on
      .checked_add_days(Days::new(COOLDOWN_DAYS))
      .unwrap_or(NaiveDate::MAX);
    let allowed = today >= allowed_from;
    let days_remaining = if allowed {
      0
    } else {
      (allowed_from - today).num_days()
    };
    Self { assigned_on, allowed_from, today, allowed, days_remaining }
  }

  /// Turn a closed gate into [`Error::NotAllowed`].
  pub fn require_open(&self, client: ClientId) -> Result<()> {
    if self.allowed {
      Ok(())
    } else {
      Err(Error::NotAllowed {
        client,
        allowed_from: self.allowed_from,
        days_remaining: self.days_remaining,
      })
    }
  }
}
