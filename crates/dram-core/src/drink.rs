//! Drinks: shared reference data describing what was drunk.
//!
//! A drink is immutable once stored. Correcting one means registering a new
//! row and pointing future entries at it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  approx::{ApproxRange, ApproximateValue},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DrinkId(pub i64);

impl fmt::Display for DrinkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Drink ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drink {
  pub id:         DrinkId,
  pub name:       String,
  /// Lower ABV bound, in percent.
  pub min_abv:    Option<ApproximateValue>,
  /// Upper ABV bound, in percent.
  pub max_abv:    Option<ApproximateValue>,
  /// Standard servings per logged unit when strength or volume is unknown
  /// (2.0 for a double).
  pub multiplier: f64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Drink {
  pub fn identity(&self) -> DrinkIdentity {
    DrinkIdentity::new(&self.name, self.min_abv, self.max_abv, self.multiplier)
  }

  pub fn has_abv(&self) -> bool { self.min_abv.is_some() || self.max_abv.is_some() }
}

impl fmt::Display for Drink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)?;
    match (self.min_abv, self.max_abv) {
      (Some(lo), Some(hi)) if lo == hi => write!(f, " ({lo}%)")?,
      (Some(lo), Some(hi)) => write!(f, " ({lo}-{hi}%)")?,
      (Some(abv), None) | (None, Some(abv)) => write!(f, " ({abv}%)")?,
      (None, None) => {}
    }
    if self.multiplier != 1.0 {
      write!(f, " x{}", self.multiplier)?;
    }
    Ok(())
  }
}

// ─── NewDrink ────────────────────────────────────────────────────────────────

/// Input to drink registration. Ids and timestamps are assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDrink {
  pub name:       String,
  pub min_abv:    Option<ApproximateValue>,
  pub max_abv:    Option<ApproximateValue>,
  pub multiplier: f64,
}

impl NewDrink {
  /// A drink with no ABV information and a multiplier of 1.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:       name.into().trim().to_owned(),
      min_abv:    None,
      max_abv:    None,
      multiplier: 1.0,
    }
  }

  /// Like [`NewDrink::new`], but a name mentioning a "double" counts as two
  /// servings.
  pub fn named(name: impl Into<String>) -> Self {
    let input = Self::new(name);
    let multiplier = if input.name.to_lowercase().contains("double") { 2.0 } else { 1.0 };
    input.with_multiplier(multiplier)
  }

  pub fn with_abv(
    mut self,
    min: Option<ApproximateValue>,
    max: Option<ApproximateValue>,
  ) -> Self {
    self.min_abv = min;
    self.max_abv = max;
    self
  }

  pub fn with_abv_range(self, range: ApproxRange) -> Self {
    self.with_abv(Some(range.min), Some(range.max))
  }

  pub fn with_multiplier(mut self, multiplier: f64) -> Self {
    self.multiplier = multiplier;
    self
  }

  /// Check the field-level rules a drink must satisfy before it is stored.
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::IncompleteData("drink name"));
    }
    if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
      return Err(Error::Value(format!(
        "multiplier must be positive, got {}",
        self.multiplier
      )));
    }
    for abv in [self.min_abv, self.max_abv].into_iter().flatten() {
      if !(0.0..=100.0).contains(&abv.value()) {
        return Err(Error::Value(format!(
          "ABV must be between 0 and 100 percent, got {}",
          abv.value()
        )));
      }
    }
    if let (Some(min), Some(max)) = (self.min_abv, self.max_abv) {
      ApproxRange::new("ABV", min, max)?;
    }
    Ok(())
  }

  pub fn identity(&self) -> DrinkIdentity {
    DrinkIdentity::new(&self.name, self.min_abv, self.max_abv, self.multiplier)
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The fields that make two catalog rows indistinguishable: name (compared
/// case-insensitively), both ABV bounds including their flags, and the
/// multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrinkIdentity {
  name:       String,
  min_abv:    Option<(u64, bool)>,
  max_abv:    Option<(u64, bool)>,
  multiplier: u64,
}

impl DrinkIdentity {
  pub fn new(
    name: &str,
    min_abv: Option<ApproximateValue>,
    max_abv: Option<ApproximateValue>,
    multiplier: f64,
  ) -> Self {
    let key = |v: ApproximateValue| (float_key(v.value()), v.is_approximate());
    Self {
      name:       name.trim().to_lowercase(),
      min_abv:    min_abv.map(key),
      max_abv:    max_abv.map(key),
      multiplier: float_key(multiplier),
    }
  }

  /// The case-folded name this identity compares on.
  pub fn name(&self) -> &str { &self.name }
}

/// Bit pattern used for equality; folds `-0.0` into `0.0`.
fn float_key(x: f64) -> u64 { (x + 0.0).to_bits() }

#[cfg(test)]
mod tests {
  use super::*;

  fn pct(v: f64) -> Option<ApproximateValue> { Some(ApproximateValue::exact(v).unwrap()) }

  #[test]
  fn identity_ignores_case_and_padding() {
    let a = NewDrink::new("Beer").with_abv(pct(4.5), pct(5.5));
    let b = NewDrink::new("  bEEr ").with_abv(pct(4.5), pct(5.5));
    assert_eq!(a.identity(), b.identity());
  }

  #[test]
  fn identity_distinguishes_abv_flags_and_multiplier() {
    let base = NewDrink::new("Whisky").with_abv(pct(40.0), pct(40.0));
    let approx = NewDrink::new("Whisky").with_abv(
      Some(ApproximateValue::approximate(40.0).unwrap()),
      pct(40.0),
    );
    let double = base.clone().with_multiplier(2.0);
    assert_ne!(base.identity(), approx.identity());
    assert_ne!(base.identity(), double.identity());
  }

  #[test]
  fn doubles_are_named() {
    assert_eq!(NewDrink::named("Double Gin & Tonic").multiplier, 2.0);
    assert_eq!(NewDrink::named("DOUBLE espresso martini").multiplier, 2.0);
    assert_eq!(NewDrink::named("Gin & Tonic").multiplier, 1.0);
    assert_eq!(NewDrink::named("  Gin ").name, "Gin");
  }

  #[test]
  fn validate_rejects_inverted_abv() {
    let err = NewDrink::new("Cider")
      .with_abv(pct(6.0), pct(4.0))
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRange { what: "ABV", .. }));
  }

  #[test]
  fn validate_rejects_bad_multiplier_and_name() {
    assert!(matches!(
      NewDrink::new("Gin").with_multiplier(0.0).validate(),
      Err(Error::Value(_))
    ));
    assert!(matches!(
      NewDrink::new("   ").validate(),
      Err(Error::IncompleteData("drink name"))
    ));
    assert!(matches!(
      NewDrink::new("Spirit").with_abv(pct(120.0), None).validate(),
      Err(Error::Value(_))
    ));
  }

  #[test]
  fn one_sided_abv_is_valid() {
    NewDrink::new("House red").with_abv(None, pct(14.0)).validate().unwrap();
  }
}
