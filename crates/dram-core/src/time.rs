//! Time of day at which an entry was drunk.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::Error;

/// A closed, ordered set of day parts. Ids are the seed rows of the
/// `time_period` lookup table.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  EnumIter,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
  Morning,
  Afternoon,
  Evening,
  Night,
}

impl TimePeriod {
  pub fn id(self) -> i64 {
    match self {
      Self::Morning => 1,
      Self::Afternoon => 2,
      Self::Evening => 3,
      Self::Night => 4,
    }
  }

  pub fn from_id(id: i64) -> Option<Self> { Self::iter().find(|t| t.id() == id) }

  pub fn name(self) -> &'static str {
    match self {
      Self::Morning => "morning",
      Self::Afternoon => "afternoon",
      Self::Evening => "evening",
      Self::Night => "night",
    }
  }

  /// Exact lookup by name, case-insensitive. No aliases.
  pub fn from_name(name: &str) -> Option<Self> {
    let name = name.trim();
    Self::iter().find(|t| t.name().eq_ignore_ascii_case(name))
  }
}

impl fmt::Display for TimePeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for TimePeriod {
  type Err = Error;

  /// Like [`TimePeriod::from_name`], but also accepts "brunch" as afternoon.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("brunch") {
      return Ok(Self::Afternoon);
    }
    Self::from_name(s).ok_or_else(|| Error::Parse {
      kind:  "time period",
      input: s.to_owned(),
    })
  }
}
