//! Liquid-volume units and the append-only conversion registry.
//!
//! Every unit carries a multiplicative factor into milliliters, the base
//! unit. Factors are fixed at registration; historical computations stay
//! reproducible because nothing can overwrite them.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{Error, Result, approx::ApproximateValue};

// ─── UnitId ──────────────────────────────────────────────────────────────────

/// Surrogate key of a row in the `volume_unit` lookup table.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub i64);

impl fmt::Display for UnitId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Seeded units ────────────────────────────────────────────────────────────

/// The four units the ledger has always known about. Their ids are the seed
/// rows of the `volume_unit` table and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum VolumeUnit {
  FluidOunce,
  Milliliter,
  Centiliter,
  Liter,
}

impl VolumeUnit {
  pub const BASE: Self = Self::Milliliter;

  pub fn id(self) -> UnitId {
    match self {
      Self::FluidOunce => UnitId(1),
      Self::Milliliter => UnitId(2),
      Self::Centiliter => UnitId(3),
      Self::Liter => UnitId(4),
    }
  }

  pub fn from_id(id: UnitId) -> Option<Self> {
    Self::iter().find(|u| u.id() == id)
  }

  /// Lower-cased abbreviation stored in generation-2 lookup rows.
  pub fn abbr(self) -> &'static str {
    match self {
      Self::FluidOunce => "fl oz",
      Self::Milliliter => "ml",
      Self::Centiliter => "cl",
      Self::Liter => "l",
    }
  }

  /// Label of the generation-1 inline `VOLUMEUNIT` enumeration.
  pub fn legacy_label(self) -> &'static str {
    match self {
      Self::FluidOunce => "fl oz",
      Self::Milliliter => "mL",
      Self::Centiliter => "cL",
      Self::Liter => "L",
    }
  }

  pub fn ml_per_unit(self) -> f64 {
    match self {
      Self::FluidOunce => 29.5735,
      Self::Milliliter => 1.0,
      Self::Centiliter => 10.0,
      Self::Liter => 1000.0,
    }
  }

  /// Match a generation-1 label or a generation-2 abbreviation, ignoring case.
  pub fn from_label(label: &str) -> Option<Self> {
    let abbr = normalize_abbr(label);
    Self::iter().find(|u| u.abbr() == abbr)
  }
}

impl fmt::Display for VolumeUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.legacy_label())
  }
}

/// Canonical form of a unit abbreviation: trimmed, lower-cased, inner
/// whitespace collapsed, common fluid-ounce spellings folded to `fl oz`.
pub fn normalize_abbr(label: &str) -> String {
  let folded = label
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();
  match folded.as_str() {
    "oz" | "floz" | "fl. oz" | "fl.oz" | "fl oz." => "fl oz".to_owned(),
    _ => folded,
  }
}

// ─── Volume ──────────────────────────────────────────────────────────────────

/// An amount of liquid in a registered unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
  pub amount: ApproximateValue,
  pub unit:   UnitId,
}

impl Volume {
  pub fn new(amount: ApproximateValue, unit: impl Into<UnitId>) -> Self {
    Self { amount, unit: unit.into() }
  }
}

impl From<VolumeUnit> for UnitId {
  fn from(u: VolumeUnit) -> Self { u.id() }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// One registered unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
  pub id:          UnitId,
  /// Normalised abbreviation; unique within a registry.
  pub abbr:        String,
  pub ml_per_unit: f64,
}

/// Append-only mapping from unit id / abbreviation to a milliliter factor.
///
/// Passed around explicitly rather than living in a global, so callers (and
/// tests) decide which units exist.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
  units: BTreeMap<UnitId, UnitDefinition>,
}

impl Default for UnitRegistry {
  fn default() -> Self { Self::seeded() }
}

impl UnitRegistry {
  /// A registry holding exactly the four seeded units.
  pub fn seeded() -> Self {
    let units = VolumeUnit::iter()
      .map(|u| {
        (u.id(), UnitDefinition {
          id:          u.id(),
          abbr:        u.abbr().to_owned(),
          ml_per_unit: u.ml_per_unit(),
        })
      })
      .collect();
    Self { units }
  }

  /// Rebuild a registry from persisted definitions (e.g. `volume_unit` rows).
  pub fn from_definitions(
    defs: impl IntoIterator<Item = UnitDefinition>,
  ) -> Result<Self> {
    let mut registry = Self { units: BTreeMap::new() };
    for def in defs {
      registry.insert(def)?;
    }
    Ok(registry)
  }

  /// Register a new unit and return its freshly assigned id.
  ///
  /// Fails with [`Error::DuplicateUnit`] if the abbreviation is taken; an
  /// existing unit's factor can never be replaced.
  pub fn register(&mut self, abbr: &str, ml_per_unit: f64) -> Result<UnitId> {
    let id = UnitId(self.units.keys().next_back().map_or(1, |last| last.0 + 1));
    self.insert(UnitDefinition { id, abbr: abbr.to_owned(), ml_per_unit })?;
    Ok(id)
  }

  fn insert(&mut self, def: UnitDefinition) -> Result<()> {
    let abbr = normalize_abbr(&def.abbr);
    if abbr.is_empty() {
      return Err(Error::IncompleteData("unit abbreviation"));
    }
    if !def.ml_per_unit.is_finite() || def.ml_per_unit <= 0.0 {
      return Err(Error::Value(format!(
        "conversion factor for {abbr:?} must be positive, got {}",
        def.ml_per_unit
      )));
    }
    if self.units.contains_key(&def.id) || self.find(&abbr).is_some() {
      return Err(Error::DuplicateUnit(abbr));
    }
    self.units.insert(def.id, UnitDefinition { abbr, ..def });
    Ok(())
  }

  fn find(&self, abbr: &str) -> Option<&UnitDefinition> {
    self.units.values().find(|d| d.abbr == abbr)
  }

  pub fn get(&self, id: UnitId) -> Result<&UnitDefinition> {
    self
      .units
      .get(&id)
      .ok_or_else(|| Error::UnknownUnit(format!("#{id}")))
  }

  /// Resolve an abbreviation (either generation, any case) to its id.
  pub fn resolve(&self, label: &str) -> Result<UnitId> {
    self
      .find(&normalize_abbr(label))
      .map(|d| d.id)
      .ok_or_else(|| Error::UnknownUnit(label.to_owned()))
  }

  pub fn iter(&self) -> impl Iterator<Item = &UnitDefinition> { self.units.values() }

  /// Convert `value` from one registered unit to another.
  ///
  /// Conversion factors are exact, so the approximation flag of `value` is
  /// passed through untouched.
  pub fn convert(
    &self,
    value: ApproximateValue,
    from: UnitId,
    to: UnitId,
  ) -> Result<ApproximateValue> {
    let from = self.get(from)?;
    let to = self.get(to)?;
    if from.id == to.id {
      return Ok(value);
    }
    value.scale_by(from.ml_per_unit / to.ml_per_unit)
  }

  /// Express `volume` in milliliters.
  pub fn to_base(&self, volume: &Volume) -> Result<ApproximateValue> {
    self.convert(volume.amount, volume.unit, VolumeUnit::BASE.id())
  }
}
