//! Schema creation and the generation-1 → generation-2 upgrade.
//!
//! The upgrade reads every generation-1 row, maps it through
//! [`dram_core::migrate::migrate_row`], then replaces the old tables with the
//! generation-2 layout and writes the mapped rows back in a single
//! transaction. Ids are preserved, except that drinks generation 1 told apart
//! only by name case are folded onto the lowest id. If any row fails to map,
//! nothing is written and the file stays at generation 1.

use std::collections::HashMap;

use dram_core::{
  drink::{DrinkId, DrinkIdentity},
  migrate::{self, SchemaRow, V1Row, V2Row},
  unit::VolumeUnit,
};

use crate::{
  Error, Result,
  encode::{
    RawDrink, RawLegacyEntry, RawPerson, encode_approx, encode_date, encode_dt,
  },
  schema::{LEGACY_TIME_PERIODS, LEGACY_VOLUME_UNITS, SCHEMA_V2},
};

/// Create the generation-2 tables in an empty file and seed the lookup rows.
pub async fn create(conn: &tokio_rusqlite::Connection) -> Result<()> {
  let seeds: Vec<V2Row> = migrate::time_period_rows()
    .into_iter()
    .map(V2Row::TimePeriod)
    .chain(migrate::volume_unit_rows().into_iter().map(V2Row::VolumeUnit))
    .collect();

  conn
    .call(move |conn| {
      let tx = conn.transaction()?;
      tx.execute_batch(SCHEMA_V2)?;
      for row in &seeds {
        write_row(&tx, row)?;
      }
      tx.commit()?;
      Ok(())
    })
    .await?;

  tracing::info!("created schema version 2");
  Ok(())
}

/// Upgrade a generation-1 file in place.
pub async fn upgrade_v1(conn: &tokio_rusqlite::Connection) -> Result<()> {
  let (persons, drinks, entries) = conn
    .call(|conn| {
      let persons = select_all(conn, "person", RawPerson::COLUMNS, RawPerson::from_row)?;
      let drinks = select_all(conn, "drink", RawDrink::COLUMNS, RawDrink::from_row)?;
      let entries =
        select_all(conn, "entry", RawLegacyEntry::COLUMNS, RawLegacyEntry::from_row)?;
      Ok((persons, drinks, entries))
    })
    .await?;

  let mut v1_rows = Vec::with_capacity(
    LEGACY_TIME_PERIODS.len() + LEGACY_VOLUME_UNITS.len() + persons.len() + drinks.len()
      + entries.len(),
  );
  v1_rows.extend(LEGACY_TIME_PERIODS.iter().map(|l| V1Row::TimePeriod((*l).to_owned())));
  v1_rows.extend(LEGACY_VOLUME_UNITS.iter().map(|l| V1Row::VolumeUnit((*l).to_owned())));
  for raw in persons {
    v1_rows.push(V1Row::Person(raw.into_person()?));
  }
  for raw in drinks {
    v1_rows.push(V1Row::Drink(raw.into_drink()?));
  }
  for raw in entries {
    v1_rows.push(V1Row::Entry(raw.into_legacy()?));
  }

  // Lookup rows come first in `v1_rows`, then people, then drinks, then
  // entries: the order the foreign keys need.
  let v2_rows = v1_rows
    .into_iter()
    .map(|row| migrate::migrate_row(SchemaRow::V1(row)))
    .collect::<Result<Vec<_>, _>>()?;
  let (v2_rows, folded_drinks) = fold_duplicate_drinks(v2_rows);
  let migrated_entries = v2_rows.iter().filter(|r| matches!(r, V2Row::Entry(_))).count();

  conn
    .call(move |conn| {
      let tx = conn.transaction()?;
      tx.execute_batch(
        "DROP TABLE entry;
         DROP TABLE drink;
         DROP TABLE person;",
      )?;
      tx.execute_batch(SCHEMA_V2)?;
      for row in &v2_rows {
        write_row(&tx, row)?;
      }
      tx.commit()?;
      Ok(())
    })
    .await?;

  if folded_drinks > 0 {
    tracing::warn!(drinks = folded_drinks, "merged drinks that differed only in name case");
  }
  tracing::info!(entries = migrated_entries, "upgraded schema from version 1 to 2");
  Ok(())
}

/// Generation 1 compared drink names case-sensitively; generation 2 does not.
/// Keep the lowest id of each identity, drop the rest and re-point their
/// entries. Returns the rows and the number of drinks dropped.
fn fold_duplicate_drinks(rows: Vec<V2Row>) -> (Vec<V2Row>, usize) {
  let mut first_id: HashMap<DrinkIdentity, DrinkId> = HashMap::new();
  let mut remap: HashMap<DrinkId, DrinkId> = HashMap::new();
  let mut kept = Vec::with_capacity(rows.len());

  // Drinks arrive in id order, ahead of every entry.
  for row in rows {
    match row {
      V2Row::Drink(drink) => {
        let identity = drink.identity();
        if let Some(&keep) = first_id.get(&identity) {
          tracing::debug!(drink = drink.id.0, into = keep.0, "folding duplicate drink");
          remap.insert(drink.id, keep);
        } else {
          first_id.insert(identity, drink.id);
          kept.push(V2Row::Drink(drink));
        }
      }
      V2Row::Entry(mut entry) => {
        if let Some(&keep) = remap.get(&entry.drink_id) {
          entry.drink_id = keep;
        }
        kept.push(V2Row::Entry(entry));
      }
      other => kept.push(other),
    }
  }

  (kept, remap.len())
}

fn select_all<T>(
  conn: &rusqlite::Connection,
  table: &str,
  columns: &str,
  from_row: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(&format!("SELECT {columns} FROM {table} ORDER BY id"))?;
  let rows = stmt.query_map([], from_row)?.collect();
  rows
}

/// Insert one generation-2 row, keeping its id.
fn write_row(conn: &rusqlite::Connection, row: &V2Row) -> tokio_rusqlite::Result<()> {
  match row {
    V2Row::TimePeriod(t) => {
      conn.execute(
        "INSERT OR IGNORE INTO time_period (id, name) VALUES (?1, ?2)",
        rusqlite::params![t.id, t.name],
      )?;
    }
    V2Row::VolumeUnit(u) => {
      // Only the seeded units can come out of a migration.
      let ml_per_unit = VolumeUnit::from_id(u.id)
        .map(VolumeUnit::ml_per_unit)
        .ok_or_else(|| {
          let err = Error::Corrupt(format!("unit {:?} is not a seeded unit", u.abbr));
          tokio_rusqlite::Error::Other(Box::new(err))
        })?;
      conn.execute(
        "INSERT OR IGNORE INTO volume_unit (id, abbr, ml_per_unit) VALUES (?1, ?2, ?3)",
        rusqlite::params![u.id.0, u.abbr, ml_per_unit],
      )?;
    }
    V2Row::Person(p) => {
      conn.execute(
        "INSERT INTO person (id, created_at, updated_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![p.id.0, encode_dt(p.created_at), encode_dt(p.updated_at)],
      )?;
    }
    V2Row::Drink(d) => {
      let (min_val, min_approx) = encode_approx(d.min_abv);
      let (max_val, max_approx) = encode_approx(d.max_abv);
      conn.execute(
        "INSERT INTO drink (
           id, name, min_abv_val, min_abv_is_approximate, max_abv_val,
           max_abv_is_approximate, multiplier, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
          d.id.0,
          d.name,
          min_val,
          min_approx,
          max_val,
          max_approx,
          d.multiplier,
          encode_dt(d.created_at),
          encode_dt(d.updated_at),
        ],
      )?;
    }
    V2Row::Entry(e) => {
      let (vol_val, vol_approx) = encode_approx(e.volume.map(|v| v.amount));
      conn.execute(
        "INSERT INTO entry (
           id, person_id, drank_on, time_id, drink_id,
           min_quantity_val, min_quantity_is_approximate,
           max_quantity_val, max_quantity_is_approximate,
           volume_val, volume_is_approximate, volume_unit_id,
           created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
          e.id.0,
          e.person_id.0,
          encode_date(e.drank_on),
          e.time_period.id(),
          e.drink_id.0,
          e.quantity.min.value(),
          e.quantity.min.is_approximate(),
          e.quantity.max.value(),
          e.quantity.max.is_approximate(),
          vol_val,
          vol_approx,
          e.volume.map(|v| v.unit.0),
          encode_dt(e.created_at),
          encode_dt(e.updated_at),
        ],
      )?;
    }
  }
  Ok(())
}
