//! [`SqliteStore`], the SQLite implementation of [`LedgerStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use dram_core::{
  drink::{Drink, DrinkId, NewDrink},
  entry::{Entry, EntryId, NewEntry, Person, PersonId},
  store::{DateRange, LedgerStore},
  unit::{UnitDefinition, UnitId, UnitRegistry},
};

use crate::{
  Error, Result,
  encode::{RawDrink, RawEntry, RawPerson, encode_approx, encode_date, encode_dt},
  schema::{CONNECTION_PRAGMAS, CURRENT_VERSION},
  upgrade,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Dram ledger backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a ledger at `path`, upgrading an older schema in place.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory ledger, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// The file's `PRAGMA user_version`.
  pub async fn schema_version(&self) -> Result<i64> {
    let version: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    Ok(version)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(())
      })
      .await?;

    match self.schema_version().await? {
      0 => upgrade::create(&self.conn).await,
      1 => upgrade::upgrade_v1(&self.conn).await,
      CURRENT_VERSION => Ok(()),
      other => Err(Error::UnsupportedSchemaVersion(other)),
    }
  }

  async fn person_exists(&self, id: PersonId) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row("SELECT 1 FROM person WHERE id = ?1", [id.0], |_| Ok(()))
          .optional()?
          .is_some())
      })
      .await?;
    Ok(exists)
  }

  async fn fetch_entry(&self, id: EntryId) -> Result<Option<Entry>> {
    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM entry WHERE id = ?1", RawEntry::COLUMNS),
            [id.0],
            RawEntry::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEntry::into_entry).transpose()
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn add_person(&self) -> Result<Person> {
    let now = Utc::now();
    let at_str = encode_dt(now);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO person (created_at, updated_at) VALUES (?1, ?1)",
          [at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(person = id, "added person");
    Ok(Person { id: PersonId(id), created_at: now, updated_at: now })
  }

  async fn get_person(&self, id: PersonId) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM person WHERE id = ?1", RawPerson::COLUMNS),
            [id.0],
            RawPerson::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn delete_person(&self, id: PersonId) -> Result<()> {
    let deleted = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM person WHERE id = ?1", [id.0])?))
      .await?;

    if deleted == 0 {
      return Err(Error::PersonNotFound(id));
    }
    tracing::debug!(person = id.0, "deleted person and their entries");
    Ok(())
  }

  // ── Drinks ────────────────────────────────────────────────────────────────

  async fn register_drink(&self, input: NewDrink) -> Result<Drink> {
    input.validate()?;
    if self.find_drink(&input).await?.is_some() {
      return Err(dram_core::Error::DuplicateDrink { name: input.name }.into());
    }

    let now = Utc::now();
    let name = input.name.trim().to_owned();
    let (min_val, min_approx) = encode_approx(input.min_abv);
    let (max_val, max_approx) = encode_approx(input.max_abv);
    let multiplier = input.multiplier;
    let at_str = encode_dt(now);
    let name_param = name.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO drink (
             name, min_abv_val, min_abv_is_approximate, max_abv_val,
             max_abv_is_approximate, multiplier, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            name_param, min_val, min_approx, max_val, max_approx, multiplier, at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await;
    // Another registration may have landed between the lookup and the insert.
    let id = match inserted {
      Ok(id) => id,
      Err(e) if is_identity_conflict(&e) => {
        return Err(dram_core::Error::DuplicateDrink { name }.into());
      }
      Err(e) => return Err(e.into()),
    };

    tracing::debug!(drink = id, %name, "registered drink");
    Ok(Drink {
      id: DrinkId(id),
      name,
      min_abv: input.min_abv,
      max_abv: input.max_abv,
      multiplier,
      created_at: now,
      updated_at: now,
    })
  }

  async fn lookup_drink(&self, id: DrinkId) -> Result<Drink> {
    let raw: Option<RawDrink> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM drink WHERE id = ?1", RawDrink::COLUMNS),
            [id.0],
            RawDrink::from_row,
          )
          .optional()?)
      })
      .await?;

    raw
      .ok_or(dram_core::Error::NotFound { kind: "drink", id: id.0 })?
      .into_drink()
  }

  async fn find_drink<'a>(&'a self, input: &'a NewDrink) -> Result<Option<Drink>> {
    // Narrow on the numeric columns in SQL; names are compared in Rust because
    // SQLite's `lower` only folds ASCII.
    let (min_val, min_approx) = encode_approx(input.min_abv);
    let (max_val, max_approx) = encode_approx(input.max_abv);
    let multiplier = input.multiplier;

    let raws: Vec<RawDrink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM drink
           WHERE min_abv_val IS ?1 AND min_abv_is_approximate IS ?2
             AND max_abv_val IS ?3 AND max_abv_is_approximate IS ?4
             AND multiplier = ?5
           ORDER BY id",
          RawDrink::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![min_val, min_approx, max_val, max_approx, multiplier],
            RawDrink::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let identity = input.identity();
    for raw in raws {
      let drink = raw.into_drink()?;
      if drink.identity() == identity {
        return Ok(Some(drink));
      }
    }
    Ok(None)
  }

  async fn find_or_register_drink(&self, input: NewDrink) -> Result<Drink> {
    match self.find_drink(&input).await? {
      Some(existing) => Ok(existing),
      None => self.register_drink(input).await,
    }
  }

  async fn list_drinks(&self) -> Result<Vec<Drink>> {
    let raws: Vec<RawDrink> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM drink ORDER BY lower(name), id",
          RawDrink::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawDrink::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDrink::into_drink).collect()
  }

  async fn delete_drink(&self, id: DrinkId) -> Result<()> {
    let (exists, entries): (bool, i64) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row("SELECT 1 FROM drink WHERE id = ?1", [id.0], |_| Ok(()))
          .optional()?
          .is_some();
        let entries: i64 =
          tx.query_row("SELECT COUNT(*) FROM entry WHERE drink_id = ?1", [id.0], |r| {
            r.get(0)
          })?;
        if exists && entries == 0 {
          tx.execute("DELETE FROM drink WHERE id = ?1", [id.0])?;
        }
        tx.commit()?;
        Ok((exists, entries))
      })
      .await?;

    if !exists {
      return Err(dram_core::Error::NotFound { kind: "drink", id: id.0 }.into());
    }
    if entries > 0 {
      return Err(Error::DrinkInUse { id, entries });
    }
    tracing::debug!(drink = id.0, "deleted drink");
    Ok(())
  }

  // ── Units ─────────────────────────────────────────────────────────────────

  async fn unit_registry(&self) -> Result<UnitRegistry> {
    let defs: Vec<UnitDefinition> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, abbr, ml_per_unit FROM volume_unit ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(UnitDefinition {
              id:          UnitId(row.get(0)?),
              abbr:        row.get(1)?,
              ml_per_unit: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(UnitRegistry::from_definitions(defs)?)
  }

  async fn register_unit<'a>(&'a self, abbr: &'a str, ml_per_unit: f64) -> Result<UnitId> {
    // Validation and id assignment follow the in-memory registry; the UNIQUE
    // constraint on `abbr` catches a concurrent writer.
    let mut registry = self.unit_registry().await?;
    let id = registry.register(abbr, ml_per_unit)?;
    let def = registry.get(id)?.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO volume_unit (id, abbr, ml_per_unit) VALUES (?1, ?2, ?3)",
          rusqlite::params![def.id.0, def.abbr, def.ml_per_unit],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(unit = id.0, abbr, ml_per_unit, "registered volume unit");
    Ok(id)
  }

  // ── Entries ───────────────────────────────────────────────────────────────

  async fn record_entry(&self, input: NewEntry) -> Result<Entry> {
    input.validate()?;
    if !self.person_exists(input.person_id).await? {
      return Err(Error::PersonNotFound(input.person_id));
    }
    self.lookup_drink(input.drink_id).await?;
    if let Some(volume) = &input.volume {
      self.unit_registry().await?.get(volume.unit)?;
    }

    let now = Utc::now();
    let at_str = encode_dt(now);
    let drank_on_str = encode_date(input.drank_on);
    let (vol_val, vol_approx) = encode_approx(input.volume.map(|v| v.amount));
    let vol_unit = input.volume.map(|v| v.unit.0);
    let person_id = input.person_id.0;
    let time_id = input.time_period.id();
    let drink_id = input.drink_id.0;
    let q = input.quantity;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entry (
             person_id, drank_on, time_id, drink_id,
             min_quantity_val, min_quantity_is_approximate,
             max_quantity_val, max_quantity_is_approximate,
             volume_val, volume_is_approximate, volume_unit_id,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
          rusqlite::params![
            person_id,
            drank_on_str,
            time_id,
            drink_id,
            q.min.value(),
            q.min.is_approximate(),
            q.max.value(),
            q.max.is_approximate(),
            vol_val,
            vol_approx,
            vol_unit,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(entry = id, person = input.person_id.0, "recorded entry");
    Ok(Entry {
      id:          EntryId(id),
      person_id:   input.person_id,
      drank_on:    input.drank_on,
      time_period: input.time_period,
      drink_id:    input.drink_id,
      quantity:    input.quantity,
      volume:      input.volume,
      created_at:  now,
      updated_at:  now,
    })
  }

  async fn get_entry(&self, id: EntryId) -> Result<Option<Entry>> { self.fetch_entry(id).await }

  async fn list_entries(
    &self,
    person_id: PersonId,
    range: Option<DateRange>,
  ) -> Result<Vec<Entry>> {
    let start = range.map(|r| encode_date(r.start));
    let end = range.map(|r| encode_date(r.end));

    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM entry
           WHERE person_id = ?1
             AND (?2 IS NULL OR drank_on >= ?2)
             AND (?3 IS NULL OR drank_on <= ?3)
           ORDER BY drank_on DESC, time_id ASC, id ASC",
          RawEntry::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![person_id.0, start, end], RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn touch_entry(&self, id: EntryId) -> Result<Entry> {
    let at_str = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE entry SET updated_at = ?2 WHERE id = ?1",
          rusqlite::params![id.0, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::EntryNotFound(id));
    }
    self.fetch_entry(id).await?.ok_or(Error::EntryNotFound(id))
  }
}

/// Whether `err` is the drink identity index rejecting an insert.
pub(crate) fn is_identity_conflict(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, Some(msg)))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
        && msg.contains("drink_identity_idx")
  )
}
