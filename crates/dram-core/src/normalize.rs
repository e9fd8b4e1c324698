//! Standard-drink estimation for logged entries.
//!
//! With strength and serving size known, an entry's alcohol is
//! `volume_ml × ABV/100 × units_per_ml_ethanol × quantity`. Without either,
//! each serving counts as `multiplier` standard units. The result is always a
//! range: the computation runs once for each quantity bound.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  approx::{APPROX_TOLERANCE, ApproxRange, ApproximateValue},
  drink::Drink,
  entry::{Entry, NewEntry},
  unit::{UnitRegistry, Volume},
};

/// Grams per milliliter of pure ethanol at room temperature.
pub const ETHANOL_DENSITY_G_PER_ML: f64 = 0.789;

// ─── Standard unit ───────────────────────────────────────────────────────────

/// How much pure ethanol makes one standard unit. Varies by jurisdiction and
/// has no default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardUnitDefinition {
  units_per_ml_ethanol: f64,
}

impl StandardUnitDefinition {
  /// One unit per `ml` milliliters of ethanol (10 in Australia).
  pub fn per_ml_ethanol(ml: f64) -> Result<Self> {
    if !ml.is_finite() || ml <= 0.0 {
      return Err(Error::Value(format!(
        "mL of ethanol per standard unit must be positive, got {ml}"
      )));
    }
    Ok(Self { units_per_ml_ethanol: 1.0 / ml })
  }

  /// One unit per `grams` of ethanol (14 in the US).
  pub fn per_grams_ethanol(grams: f64) -> Result<Self> {
    if !grams.is_finite() || grams <= 0.0 {
      return Err(Error::Value(format!(
        "grams of ethanol per standard unit must be positive, got {grams}"
      )));
    }
    Self::per_ml_ethanol(grams / ETHANOL_DENSITY_G_PER_ML)
  }

  /// The density constant: standard units in one mL of pure ethanol.
  pub fn units_per_ml_ethanol(&self) -> f64 { self.units_per_ml_ethanol }
}

// ─── Inputs & outputs ────────────────────────────────────────────────────────

/// The measurable part of an entry. Both quantity bounds are optional so that
/// partially filled input (an import line, a form) can be estimated too.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Consumption {
  pub min_quantity: Option<ApproximateValue>,
  pub max_quantity: Option<ApproximateValue>,
  pub volume:       Option<Volume>,
}

impl From<&Entry> for Consumption {
  fn from(e: &Entry) -> Self {
    Self {
      min_quantity: Some(e.quantity.min),
      max_quantity: Some(e.quantity.max),
      volume:       e.volume,
    }
  }
}

impl From<&NewEntry> for Consumption {
  fn from(e: &NewEntry) -> Self {
    Self {
      min_quantity: Some(e.quantity.min),
      max_quantity: Some(e.quantity.max),
      volume:       e.volume,
    }
  }
}

/// Which rule produced an [`Estimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
  /// Computed from ABV and serving volume.
  AlcoholContent,
  /// ABV or volume missing; quantity × multiplier.
  Multiplier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
  /// Standard units, for the low and high quantity.
  pub units:     ApproxRange,
  /// Total liquid drunk in mL, when a serving volume was given.
  pub volume_ml: Option<ApproxRange>,
  pub basis:     Basis,
}

impl Estimate {
  /// The unit range widened by [`APPROX_TOLERANCE`] on each approximate end.
  pub fn plausible_units(&self) -> (f64, f64) { self.units.envelope(APPROX_TOLERANCE) }
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// Turns entries into standard-unit estimates against a given unit registry
/// and standard-unit definition.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
  units:    &'a UnitRegistry,
  standard: StandardUnitDefinition,
}

impl<'a> Normalizer<'a> {
  pub fn new(units: &'a UnitRegistry, standard: StandardUnitDefinition) -> Self {
    Self { units, standard }
  }

  /// The strength used for estimation: the midpoint when both bounds are
  /// present, the single bound when only one is, `None` otherwise.
  pub fn effective_abv(drink: &Drink) -> Result<Option<ApproximateValue>> {
    Ok(match (drink.min_abv, drink.max_abv) {
      (Some(lo), Some(hi)) => Some(lo.midpoint(hi)?),
      (Some(abv), None) | (None, Some(abv)) => Some(abv),
      (None, None) => None,
    })
  }

  pub fn normalize(&self, drink: &Drink, consumption: &Consumption) -> Result<Estimate> {
    let (min_q, max_q) = match (consumption.min_quantity, consumption.max_quantity) {
      (Some(lo), Some(hi)) => (lo, hi),
      (Some(q), None) | (None, Some(q)) => (q, q),
      (None, None) => return Err(Error::IncompleteData("quantity")),
    };

    // Without a strength the volume is informational; an unknown unit there
    // is not an error.
    let abv = Self::effective_abv(drink)?;
    let serving_ml = match (abv, consumption.volume.as_ref()) {
      (Some(_), Some(v)) => Some(self.units.to_base(v)?),
      (None, Some(v)) => self.units.to_base(v).ok(),
      (_, None) => None,
    };

    let (per_serving, basis, volume_scale) = match (abv, serving_ml) {
      (Some(abv), Some(ml)) => {
        let ethanol_ml = ml.multiply(abv.scale_by(0.01)?)?;
        let units = ethanol_ml.scale_by(self.standard.units_per_ml_ethanol())?;
        (units, Basis::AlcoholContent, 1.0)
      }
      _ => {
        let units = ApproximateValue::exact(drink.multiplier)?;
        (units, Basis::Multiplier, drink.multiplier)
      }
    };

    let units = ApproxRange {
      min: min_q.multiply(per_serving)?,
      max: max_q.multiply(per_serving)?,
    };

    let volume_ml = serving_ml
      .map(|ml| -> Result<ApproxRange> {
        let ml = ml.scale_by(volume_scale)?;
        Ok(ApproxRange { min: min_q.multiply(ml)?, max: max_q.multiply(ml)? })
      })
      .transpose()?;

    Ok(Estimate { units, volume_ml, basis })
  }
}

/// Estimate standard units for a stored entry.
pub fn normalize_entry(
  entry: &Entry,
  drink: &Drink,
  units: &UnitRegistry,
  standard: StandardUnitDefinition,
) -> Result<Estimate> {
  Normalizer::new(units, standard).normalize(drink, &Consumption::from(entry))
}
