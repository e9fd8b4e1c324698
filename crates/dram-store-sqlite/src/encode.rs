//! Encoding and decoding helpers between Rust domain types and the plain
//! column values stored in SQLite.
//!
//! Timestamps are RFC 3339 strings, calendar dates `YYYY-MM-DD`. An approximate
//! value occupies a `(REAL, INTEGER)` column pair.

use chrono::{DateTime, NaiveDate, Utc};
use dram_core::{
  approx::{ApproxRange, ApproximateValue},
  drink::{Drink, DrinkId},
  entry::{Entry, EntryId, Person, PersonId},
  migrate::{LegacyEntry, LegacyVolume},
  time::TimePeriod,
  unit::{UnitId, Volume},
};

use crate::{Error, Result};

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ApproximateValue ────────────────────────────────────────────────────────

pub fn encode_approx(v: Option<ApproximateValue>) -> (Option<f64>, Option<bool>) {
  match v {
    Some(v) => (Some(v.value()), Some(v.is_approximate())),
    None => (None, None),
  }
}

pub fn decode_approx(
  column: &str,
  val: Option<f64>,
  is_approximate: Option<bool>,
) -> Result<Option<ApproximateValue>> {
  match (val, is_approximate) {
    (Some(v), Some(a)) => Ok(Some(ApproximateValue::new(v, a)?)),
    (None, None) => Ok(None),
    _ => Err(Error::Corrupt(format!("{column}: value and flag disagree on NULL"))),
  }
}

fn required_approx(column: &str, val: f64, is_approximate: bool) -> Result<ApproximateValue> {
  ApproximateValue::new(val, is_approximate)
    .map_err(|e| Error::Corrupt(format!("{column}: {e}")))
}

// ─── Context (generation 1) ──────────────────────────────────────────────────

pub fn decode_context(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `person` row.
pub struct RawPerson {
  pub id:         i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawPerson {
  pub const COLUMNS: &'static str = "id, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, created_at: row.get(1)?, updated_at: row.get(2)? })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:         PersonId(self.id),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `drink` row. The layout is the same in both
/// generations.
pub struct RawDrink {
  pub id:                     i64,
  pub name:                   String,
  pub min_abv_val:            Option<f64>,
  pub min_abv_is_approximate: Option<bool>,
  pub max_abv_val:            Option<f64>,
  pub max_abv_is_approximate: Option<bool>,
  pub multiplier:             f64,
  pub created_at:             String,
  pub updated_at:             String,
}

impl RawDrink {
  pub const COLUMNS: &'static str = "id, name, min_abv_val, min_abv_is_approximate, \
                                     max_abv_val, max_abv_is_approximate, multiplier, \
                                     created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                     row.get(0)?,
      name:                   row.get(1)?,
      min_abv_val:            row.get(2)?,
      min_abv_is_approximate: row.get(3)?,
      max_abv_val:            row.get(4)?,
      max_abv_is_approximate: row.get(5)?,
      multiplier:             row.get(6)?,
      created_at:             row.get(7)?,
      updated_at:             row.get(8)?,
    })
  }

  pub fn into_drink(self) -> Result<Drink> {
    Ok(Drink {
      id:         DrinkId(self.id),
      name:       self.name,
      min_abv:    decode_approx("min_abv", self.min_abv_val, self.min_abv_is_approximate)?,
      max_abv:    decode_approx("max_abv", self.max_abv_val, self.max_abv_is_approximate)?,
      multiplier: self.multiplier,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a generation-2 `entry` row.
pub struct RawEntry {
  pub id:                          i64,
  pub person_id:                   i64,
  pub drank_on:                    String,
  pub time_id:                     i64,
  pub drink_id:                    i64,
  pub min_quantity_val:            f64,
  pub min_quantity_is_approximate: bool,
  pub max_quantity_val:            f64,
  pub max_quantity_is_approximate: bool,
  pub volume_val:                  Option<f64>,
  pub volume_is_approximate:       Option<bool>,
  pub volume_unit_id:              Option<i64>,
  pub created_at:                  String,
  pub updated_at:                  String,
}

impl RawEntry {
  pub const COLUMNS: &'static str = "id, person_id, drank_on, time_id, drink_id, \
                                     min_quantity_val, min_quantity_is_approximate, \
                                     max_quantity_val, max_quantity_is_approximate, \
                                     volume_val, volume_is_approximate, volume_unit_id, \
                                     created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                          row.get(0)?,
      person_id:                   row.get(1)?,
      drank_on:                    row.get(2)?,
      time_id:                     row.get(3)?,
      drink_id:                    row.get(4)?,
      min_quantity_val:            row.get(5)?,
      min_quantity_is_approximate: row.get(6)?,
      max_quantity_val:            row.get(7)?,
      max_quantity_is_approximate: row.get(8)?,
      volume_val:                  row.get(9)?,
      volume_is_approximate:       row.get(10)?,
      volume_unit_id:              row.get(11)?,
      created_at:                  row.get(12)?,
      updated_at:                  row.get(13)?,
    })
  }

  pub fn into_entry(self) -> Result<Entry> {
    let time_period = TimePeriod::from_id(self.time_id)
      .ok_or_else(|| Error::Corrupt(format!("unknown time_id {}", self.time_id)))?;

    let quantity = ApproxRange::new(
      "quantity",
      required_approx("min_quantity", self.min_quantity_val, self.min_quantity_is_approximate)?,
      required_approx("max_quantity", self.max_quantity_val, self.max_quantity_is_approximate)?,
    )?;

    let amount = decode_approx("volume", self.volume_val, self.volume_is_approximate)?;
    let volume = match (amount, self.volume_unit_id) {
      (Some(amount), Some(unit)) => Some(Volume { amount, unit: UnitId(unit) }),
      (None, None) => None,
      _ => return Err(Error::Corrupt("volume: amount and unit disagree on NULL".into())),
    };

    Ok(Entry {
      id: EntryId(self.id),
      person_id: PersonId(self.person_id),
      drank_on: decode_date(&self.drank_on)?,
      time_period,
      drink_id: DrinkId(self.drink_id),
      quantity,
      volume,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a generation-1 `entry` row.
pub struct RawLegacyEntry {
  pub id:                          i64,
  pub person_id:                   i64,
  pub drank_on:                    String,
  pub time_period:                 String,
  pub context:                     String,
  pub drink_id:                    i64,
  pub min_quantity_val:            f64,
  pub min_quantity_is_approximate: bool,
  pub max_quantity_val:            f64,
  pub max_quantity_is_approximate: bool,
  pub volume_val:                  Option<f64>,
  pub volume_is_approximate:       Option<bool>,
  pub volume_unit:                 Option<String>,
  pub volume_ml_val:               Option<f64>,
  pub volume_ml_is_approximate:    Option<bool>,
  pub volume_ml_unit:              Option<String>,
  pub created_at:                  String,
  pub updated_at:                  String,
}

impl RawLegacyEntry {
  pub const COLUMNS: &'static str = "id, person_id, drank_on, time_period, context, drink_id, \
                                     min_quantity_val, min_quantity_is_approximate, \
                                     max_quantity_val, max_quantity_is_approximate, \
                                     volume_val, volume_is_approximate, volume_unit, \
                                     volume_ml_val, volume_ml_is_approximate, volume_ml_unit, \
                                     created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                          row.get(0)?,
      person_id:                   row.get(1)?,
      drank_on:                    row.get(2)?,
      time_period:                 row.get(3)?,
      context:                     row.get(4)?,
      drink_id:                    row.get(5)?,
      min_quantity_val:            row.get(6)?,
      min_quantity_is_approximate: row.get(7)?,
      max_quantity_val:            row.get(8)?,
      max_quantity_is_approximate: row.get(9)?,
      volume_val:                  row.get(10)?,
      volume_is_approximate:       row.get(11)?,
      volume_unit:                 row.get(12)?,
      volume_ml_val:               row.get(13)?,
      volume_ml_is_approximate:    row.get(14)?,
      volume_ml_unit:              row.get(15)?,
      created_at:                  row.get(16)?,
      updated_at:                  row.get(17)?,
    })
  }

  pub fn into_legacy(self) -> Result<LegacyEntry> {
    let volume = legacy_volume("volume", self.volume_val, self.volume_is_approximate, self.volume_unit)?;
    let volume_ml = legacy_volume(
      "volume_ml",
      self.volume_ml_val,
      self.volume_ml_is_approximate,
      self.volume_ml_unit,
    )?;

    Ok(LegacyEntry {
      id: EntryId(self.id),
      person_id: PersonId(self.person_id),
      drank_on: decode_date(&self.drank_on)?,
      time_period: self.time_period,
      context: decode_context(&self.context)?,
      drink_id: DrinkId(self.drink_id),
      min_quantity: required_approx(
        "min_quantity",
        self.min_quantity_val,
        self.min_quantity_is_approximate,
      )?,
      max_quantity: required_approx(
        "max_quantity",
        self.max_quantity_val,
        self.max_quantity_is_approximate,
      )?,
      volume,
      volume_ml,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

fn legacy_volume(
  column: &str,
  val: Option<f64>,
  is_approximate: Option<bool>,
  unit: Option<String>,
) -> Result<Option<LegacyVolume>> {
  match (decode_approx(column, val, is_approximate)?, unit) {
    (Some(amount), Some(unit)) => Ok(Some(LegacyVolume { amount, unit })),
    (None, None) => Ok(None),
    _ => Err(Error::Corrupt(format!("{column}: amount and unit disagree on NULL"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn date_round_trip() {
    let d = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
    assert_eq!(encode_date(d), "2019-12-31");
    assert_eq!(decode_date("2019-12-31").unwrap(), d);
    assert!(decode_date("31 dec").is_err());
  }

  #[test]
  fn approx_columns_must_agree_on_null() {
    assert_eq!(decode_approx("abv", None, None).unwrap(), None);
    assert!(matches!(decode_approx("abv", Some(5.0), None), Err(Error::Corrupt(_))));

    let (val, flag) = encode_approx(Some(ApproximateValue::approximate(5.5).unwrap()));
    let back = decode_approx("abv", val, flag).unwrap().unwrap();
    assert_eq!(back.value(), 5.5);
    assert!(back.is_approximate());
  }

  #[test]
  fn legacy_context_is_a_json_array() {
    assert_eq!(decode_context(r#"["pub","birthday"]"#).unwrap(), ["pub", "birthday"]);
    assert!(decode_context("[]").unwrap().is_empty());
    assert!(matches!(decode_context("pub, birthday"), Err(Error::Json(_))));
  }
}
