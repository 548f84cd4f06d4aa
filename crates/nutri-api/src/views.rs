//! Response shapes that differ from the stored domain types.

use chrono::NaiveDate;
use nutri_core::{diet::DietAssignment, directory::Client};
use serde::Serialize;

/// One diet as shown in history listings and the client's current bundle.
#[derive(Debug, Clone, Serialize)]
pub struct DietView {
  pub id:            i64,
  pub week_number:   u32,
  pub assigned_on:   NaiveDate,
  pub content:       String,
  pub template_name: Option<String>,
  pub weight:        Option<f32>,
  pub feedback:      Option<String>,
}

impl From<DietAssignment> for DietView {
  fn from(a: DietAssignment) -> Self {
    Self {
      id:            a.id,
      week_number:   a.week_number,
      assigned_on:   a.assigned_on,
      content:       a.content,
      template_name: a.template_name,
      weight:        a.weight,
      feedback:      a.feedback,
    }
  }
}

pub fn history_view(rows: Vec<DietAssignment>) -> Vec<DietView> {
  rows.into_iter().map(DietView::from).collect()
}

/// A client row in the admin listing, with the day of their latest Regular
/// diet.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
  #[serde(flatten)]
  pub client:         Client,
  pub last_diet_date: Option<NaiveDate>,
}

/// `GET /clients/{client_id}/diets`.
///
/// Inactive clients get `{"is_active": false}` and nothing else. Clients
/// outside any group get `null` detox entries.
#[derive(Debug, Clone, Serialize)]
pub struct MyDiets {
  pub is_active: bool,
  #[serde(flatten)]
  pub diets:     Option<CurrentDiets>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentDiets {
  pub regular:     Option<DietView>,
  pub detox_diet:  Option<DietView>,
  pub detox_water: Option<DietView>,
}
