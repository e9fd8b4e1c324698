//! Error type for `dram-store-sqlite`.

use dram_core::{
  drink::DrinkId,
  entry::{EntryId, PersonId},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] dram_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row that could not have been written by this crate.
  #[error("corrupt row: {0}")]
  Corrupt(String),

  #[error("person not found: {0}")]
  PersonNotFound(PersonId),

  #[error("entry not found: {0}")]
  EntryNotFound(EntryId),

  #[error("drink {id} is referenced by {entries} entries")]
  DrinkInUse { id: DrinkId, entries: i64 },

  #[error("unsupported schema version {0}")]
  UnsupportedSchemaVersion(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
