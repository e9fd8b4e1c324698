//! Error types for `dram-core`.
//!
//! Every variant describes caller misuse or malformed data. Nothing here is
//! transient, so nothing is worth retrying.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A non-finite or otherwise meaningless numeric input.
  #[error("invalid value: {0}")]
  Value(String),

  #[error("unknown volume unit: {0:?}")]
  UnknownUnit(String),

  #[error("volume unit {0:?} is already registered")]
  DuplicateUnit(String),

  #[error("a drink named {name:?} with the same ABV range and multiplier already exists")]
  DuplicateDrink { name: String },

  #[error("invalid {what} range: {min} > {max}")]
  InvalidRange {
    what: &'static str,
    min:  f64,
    max:  f64,
  },

  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: i64 },

  #[error("missing required field: {0}")]
  IncompleteData(&'static str),

  #[error("{column} value {value:?} has no generation-2 counterpart")]
  UnmappableValue {
    column: &'static str,
    value:  String,
  },

  #[error("cannot parse {kind} from {input:?}")]
  Parse { kind: &'static str, input: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
