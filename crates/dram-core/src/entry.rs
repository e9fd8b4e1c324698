//! People and the entries they log.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  approx::{ApproxRange, ApproximateValue},
  drink::DrinkId,
  time::TimePeriod,
  unit::Volume,
};

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Identity only. A person owns their entries; deleting the person deletes
/// them too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:         PersonId,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Entry ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// One logged drinking occasion. Never edited apart from `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub id:          EntryId,
  pub person_id:   PersonId,
  pub drank_on:    NaiveDate,
  pub time_period: TimePeriod,
  pub drink_id:    DrinkId,
  /// How many servings were drunk; `min <= max` always holds.
  pub quantity:    ApproxRange,
  /// Size of one serving, when known.
  pub volume:      Option<Volume>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to entry creation. Ids and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
  pub person_id:   PersonId,
  pub drank_on:    NaiveDate,
  pub time_period: TimePeriod,
  pub drink_id:    DrinkId,
  pub quantity:    ApproxRange,
  pub volume:      Option<Volume>,
}

impl NewEntry {
  /// Re-check the quantity rules; fields are public so the range may have
  /// been assembled by hand.
  pub fn validate(&self) -> Result<()> {
    validate_quantity(&self.quantity)?;
    if let Some(volume) = &self.volume {
      if volume.amount.value() < 0.0 {
        return Err(Error::Value(format!(
          "volume cannot be negative, got {}",
          volume.amount.value()
        )));
      }
    }
    Ok(())
  }
}

/// Quantities must be non-negative and ordered.
pub fn validate_quantity(q: &ApproxRange) -> Result<()> {
  if q.min.value() < 0.0 {
    return Err(Error::Value(format!(
      "quantity cannot be negative, got {}",
      q.min.value()
    )));
  }
  ApproxRange::new("quantity", q.min, q.max)?;
  Ok(())
}

/// Build a quantity range from its two bounds.
pub fn quantity(min: ApproximateValue, max: ApproximateValue) -> Result<ApproxRange> {
  let range = ApproxRange::new("quantity", min, max)?;
  validate_quantity(&range)?;
  Ok(range)
}
