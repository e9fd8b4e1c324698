//! Generation-1 → generation-2 row mapping.
//!
//! Generation 1 kept time periods and volume units as inline enumerations,
//! stored volumes as `(amount, unit label)` composites, and carried a free-text
//! `context` array and a derived `volume_ml` column on every entry.
//! Generation 2 replaces the enumerations with surrogate-keyed lookup tables
//! and drops the two redundant entry columns.
//!
//! Every function here maps exactly one row and looks at nothing else, so a
//! table can be migrated in any order or in parallel batches.

use chrono::{DateTime, NaiveDate, Utc};
use strum::IntoEnumIterator;

use crate::{
  Error, Result,
  approx::{ApproxRange, ApproximateValue},
  drink::{Drink, DrinkId},
  entry::{Entry, EntryId, Person, PersonId},
  time::TimePeriod,
  unit::{UnitId, Volume, VolumeUnit},
};

// ─── Generation 1 ────────────────────────────────────────────────────────────

/// The generation-1 `VOLUME` composite: an amount and a `VOLUMEUNIT` label.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyVolume {
  pub amount: ApproximateValue,
  pub unit:   String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyEntry {
  pub id:           EntryId,
  pub person_id:    PersonId,
  pub drank_on:     NaiveDate,
  /// A `TIMEPERIOD` enumeration label.
  pub time_period:  String,
  pub context:      Vec<String>,
  pub drink_id:     DrinkId,
  pub min_quantity: ApproximateValue,
  pub max_quantity: ApproximateValue,
  pub volume:       Option<LegacyVolume>,
  pub volume_ml:    Option<LegacyVolume>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// Any generation-1 row. Enumeration labels count as rows of their (implicit)
/// type so that the lookup tables can be produced by the same mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum V1Row {
  Person(Person),
  Drink(Drink),
  Entry(LegacyEntry),
  TimePeriod(String),
  VolumeUnit(String),
}

// ─── Generation 2 ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePeriodRow {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeUnitRow {
  pub id:   UnitId,
  /// Lower-cased, unique.
  pub abbr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum V2Row {
  Person(Person),
  Drink(Drink),
  Entry(Entry),
  TimePeriod(TimePeriodRow),
  VolumeUnit(VolumeUnitRow),
}

/// A row of either generation.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRow {
  V1(V1Row),
  V2(V2Row),
}

impl From<V1Row> for SchemaRow {
  fn from(row: V1Row) -> Self { Self::V1(row) }
}

impl From<V2Row> for SchemaRow {
  fn from(row: V2Row) -> Self { Self::V2(row) }
}

// ─── Seed rows ───────────────────────────────────────────────────────────────

/// The fixed `time_period` rows, ids 1..=4.
pub fn time_period_rows() -> Vec<TimePeriodRow> {
  TimePeriod::iter().map(time_period_row).collect()
}

/// The fixed `volume_unit` rows, ids 1..=4.
pub fn volume_unit_rows() -> Vec<VolumeUnitRow> {
  VolumeUnit::iter().map(volume_unit_row).collect()
}

fn time_period_row(t: TimePeriod) -> TimePeriodRow {
  TimePeriodRow { id: t.id(), name: t.name().to_owned() }
}

fn volume_unit_row(u: VolumeUnit) -> VolumeUnitRow {
  VolumeUnitRow { id: u.id(), abbr: u.abbr().to_owned() }
}

// ─── Mapping ─────────────────────────────────────────────────────────────────

/// Bring a row of either generation to generation 2. Generation-2 rows pass
/// through untouched, which makes re-running a migration harmless.
pub fn migrate_row(row: SchemaRow) -> Result<V2Row> {
  match row {
    SchemaRow::V1(row) => migrate_row_v1_to_v2(row),
    SchemaRow::V2(row) => Ok(row),
  }
}

pub fn migrate_row_v1_to_v2(row: V1Row) -> Result<V2Row> {
  Ok(match row {
    V1Row::Person(p) => V2Row::Person(p),
    V1Row::Drink(d) => V2Row::Drink(d),
    V1Row::Entry(e) => V2Row::Entry(migrate_entry(e)?),
    V1Row::TimePeriod(label) => V2Row::TimePeriod(time_period_row(legacy_time(&label)?)),
    V1Row::VolumeUnit(label) => V2Row::VolumeUnit(volume_unit_row(legacy_unit(&label)?)),
  })
}

fn legacy_time(label: &str) -> Result<TimePeriod> {
  TimePeriod::from_name(label).ok_or_else(|| Error::UnmappableValue {
    column: "time_period",
    value:  label.to_owned(),
  })
}

fn legacy_unit(label: &str) -> Result<VolumeUnit> {
  VolumeUnit::from_label(label).ok_or_else(|| Error::UnmappableValue {
    column: "volume_unit",
    value:  label.to_owned(),
  })
}

fn legacy_volume(v: &LegacyVolume) -> Result<Volume> {
  Ok(Volume::new(v.amount, legacy_unit(&v.unit)?))
}

fn migrate_entry(e: LegacyEntry) -> Result<Entry> {
  // `volume_ml` is derived from `volume`; it only matters if the original
  // measurement is missing.
  let volume = e
    .volume
    .as_ref()
    .or(e.volume_ml.as_ref())
    .map(legacy_volume)
    .transpose()?;

  Ok(Entry {
    id: e.id,
    person_id: e.person_id,
    drank_on: e.drank_on,
    time_period: legacy_time(&e.time_period)?,
    drink_id: e.drink_id,
    quantity: ApproxRange::new("quantity", e.min_quantity, e.max_quantity)?,
    volume,
    created_at: e.created_at,
    updated_at: e.updated_at,
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn exact(v: f64) -> ApproximateValue { ApproximateValue::exact(v).unwrap() }

  fn legacy_entry() -> LegacyEntry {
    let ts = Utc.with_ymd_and_hms(2019, 5, 4, 21, 0, 0).unwrap();
    LegacyEntry {
      id:           EntryId(10),
      person_id:    PersonId(1),
      drank_on:     NaiveDate::from_ymd_opt(2019, 5, 4).unwrap(),
      time_period:  "night".into(),
      context:      vec!["pub".into(), "birthday".into()],
      drink_id:     DrinkId(3),
      min_quantity: exact(1.0),
      max_quantity: ApproximateValue::approximate(2.0).unwrap(),
      volume:       Some(LegacyVolume { amount: exact(12.0), unit: "fl oz".into() }),
      volume_ml:    Some(LegacyVolume { amount: exact(354.882), unit: "mL".into() }),
      created_at:   ts,
      updated_at:   ts,
    }
  }

  #[test]
  fn seeded_time_periods_map_to_fixed_ids() {
    let labels = ["morning", "afternoon", "evening", "night"];
    for (expected_id, label) in (1..).zip(labels) {
      let row = migrate_row_v1_to_v2(V1Row::TimePeriod(label.into())).unwrap();
      assert_eq!(
        row,
        V2Row::TimePeriod(TimePeriodRow { id: expected_id, name: label.into() })
      );
    }
  }

  #[test]
  fn seeded_units_map_to_fixed_ids_and_lowercase() {
    let labels = [("fl oz", "fl oz"), ("mL", "ml"), ("cL", "cl"), ("L", "l")];
    for (expected_id, (label, abbr)) in (1..).zip(labels) {
      let row = migrate_row_v1_to_v2(V1Row::VolumeUnit(label.into())).unwrap();
      assert_eq!(
        row,
        V2Row::VolumeUnit(VolumeUnitRow { id: UnitId(expected_id), abbr: abbr.into() })
      );
    }
  }

  #[test]
  fn migration_is_idempotent() {
    let rows = vec![
      V1Row::TimePeriod("evening".into()),
      V1Row::VolumeUnit("cL".into()),
      V1Row::Entry(legacy_entry()),
    ];
    for row in rows {
      let once = migrate_row(row.into()).unwrap();
      let twice = migrate_row(once.clone().into()).unwrap();
      assert_eq!(once, twice);
    }
  }

  #[test]
  fn entry_drops_context_and_keeps_original_unit() {
    let V2Row::Entry(entry) = migrate_row_v1_to_v2(V1Row::Entry(legacy_entry())).unwrap()
    else {
      panic!("expected an entry row");
    };
    assert_eq!(entry.time_period, TimePeriod::Night);
    assert_eq!(entry.quantity.max, ApproximateValue::approximate(2.0).unwrap());
    assert_eq!(
      entry.volume,
      Some(Volume::new(exact(12.0), VolumeUnit::FluidOunce))
    );
  }

  #[test]
  fn derived_volume_fills_a_missing_original() {
    let mut e = legacy_entry();
    e.volume = None;
    let V2Row::Entry(entry) = migrate_row_v1_to_v2(V1Row::Entry(e)).unwrap() else {
      panic!("expected an entry row");
    };
    assert_eq!(entry.volume.unwrap().unit, VolumeUnit::Milliliter.id());
  }

  #[test]
  fn unknown_labels_are_unmappable() {
    assert!(matches!(
      migrate_row_v1_to_v2(V1Row::TimePeriod("midnight snack".into())),
      Err(Error::UnmappableValue { column: "time_period", .. })
    ));

    let mut e = legacy_entry();
    e.volume = Some(LegacyVolume { amount: exact(1.0), unit: "hogshead".into() });
    assert!(matches!(
      migrate_row_v1_to_v2(V1Row::Entry(e)),
      Err(Error::UnmappableValue { column: "volume_unit", .. })
    ));
  }

  #[test]
  fn seed_rows_match_enum_order() {
    let periods: Vec<_> = time_period_rows().into_iter().map(|r| r.id).collect();
    assert_eq!(periods, [1, 2, 3, 4]);
    let abbrs: Vec<_> = volume_unit_rows().into_iter().map(|r| r.abbr).collect();
    assert_eq!(abbrs, ["fl oz", "ml", "cl", "l"]);
  }
}
