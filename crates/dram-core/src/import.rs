//! Bulk import of a hand-kept drinking log, one entry per line:
//!
//! ```text
//! (12 oct, evening; pub),2,Pale Ale,4.5-5%,~33cl
//! 1,Pale Ale
//! (13 oct, brunch),~2,Mimosa
//! ```
//!
//! The parenthesised header is optional. A line without one happened on the
//! same day and at the same time as the line before it. A header naming a new
//! day but no time of day means night, and "brunch" means afternoon. Quantity
//! defaults to one serving; ABV and volume may be left out.

use std::collections::HashMap;

use chrono::{Datelike as _, NaiveDate};

use crate::{
  Error, Result,
  approx::{ApproxRange, ApproximateValue},
  drink::{DrinkId, DrinkIdentity, NewDrink},
  entry::{NewEntry, PersonId},
  parse::{parse_abv, parse_quantity, parse_volume},
  time::TimePeriod,
  unit::{UnitRegistry, Volume},
};

// ─── Line fields ─────────────────────────────────────────────────────────────

/// The raw comma-separated fields of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLine<'a> {
  pub header:   Option<&'a str>,
  pub quantity: &'a str,
  pub name:     &'a str,
  pub abv:      Option<&'a str>,
  pub volume:   Option<&'a str>,
}

impl<'a> ImportLine<'a> {
  pub fn parse(line: &'a str) -> Result<Self> {
    let err = || Error::Parse { kind: "import line", input: line.to_owned() };

    let mut rest = line.trim();
    let mut header = None;
    if let Some(after) = rest.strip_prefix('(') {
      let (inside, tail) = after.split_once(')').ok_or_else(err)?;
      header = Some(inside.trim());
      let tail = tail.trim_start();
      rest = tail.strip_prefix(',').unwrap_or(tail);
    }

    let mut fields = rest.splitn(4, ',').map(str::trim);
    let quantity = fields.next().unwrap_or_default();
    let name = fields.next().filter(|n| !n.is_empty()).ok_or_else(err)?;
    let abv = fields.next().filter(|s| !s.is_empty());
    let volume = fields.next().filter(|s| !s.is_empty());

    Ok(Self { header, quantity, name, abv, volume })
  }
}

// ─── Date context ────────────────────────────────────────────────────────────

/// When the current line was drunk, plus any free-form notes from its header
/// ("pub", "birthday").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateContext {
  pub date:    NaiveDate,
  pub time:    TimePeriod,
  pub context: Vec<String>,
}

impl DateContext {
  pub fn new(date: NaiveDate, time: TimePeriod) -> Self {
    Self { date, time, context: Vec::new() }
  }

  /// The context for the next line, given its header (if any).
  pub fn advance(&self, header: Option<&str>) -> Result<Self> {
    let Some(header) = header else {
      return Ok(self.clone());
    };

    let mut parts: Vec<String> = header
      .split([',', ';'])
      .map(|p| p.trim().to_lowercase())
      .filter(|p| !p.is_empty())
      .collect();

    let mut date = self.date;
    let leading_day = parts.first().and_then(|p| split_day(p, self.date));
    if let Some((day, rest)) = leading_day {
      date = day;
      if rest.is_empty() {
        parts.remove(0);
      } else {
        parts[0] = rest;
      }
    }

    let mut times: Vec<TimePeriod> =
      parts.iter().filter_map(|p| TimePeriod::from_name(p)).collect();
    times.dedup();
    let time = match times.as_slice() {
      [t] => *t,
      [] if parts.iter().any(|p| p == "brunch") => TimePeriod::Afternoon,
      [] if date == self.date => self.time,
      [] => TimePeriod::Night,
      _ => {
        return Err(Error::Parse { kind: "time period", input: header.to_owned() });
      }
    };

    let context = parts
      .into_iter()
      .filter(|p| TimePeriod::from_name(p).is_none())
      .collect();
    Ok(Self { date, time, context })
  }
}

/// Split a leading `"1 oct"` / `"oct 1"` off `segment`, returning the day and
/// whatever words follow it.
fn split_day(segment: &str, previous: NaiveDate) -> Option<(NaiveDate, String)> {
  let mut words = segment.split_whitespace();
  let (a, b) = (words.next()?, words.next()?);
  let day = parse_day(&format!("{a} {b}"), previous)?;
  Some((day, words.collect::<Vec<_>>().join(" ")))
}

/// Headers carry no year. The log is chronological, so a day that would fall
/// before `previous` belongs to the following year.
fn parse_day(text: &str, previous: NaiveDate) -> Option<NaiveDate> {
  let in_year = |year: i32| {
    ["%e %b %Y", "%b %e %Y"]
      .iter()
      .find_map(|fmt| NaiveDate::parse_from_str(&format!("{text} {year}"), fmt).ok())
  };
  let day = in_year(previous.year())?;
  if day < previous { in_year(previous.year() + 1) } else { Some(day) }
}

// ─── Importer ────────────────────────────────────────────────────────────────

/// One parsed line, ready to be stored once its drink has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
  pub when:     DateContext,
  pub drink:    NewDrink,
  pub quantity: ApproxRange,
  pub volume:   Option<Volume>,
}

impl ImportRecord {
  pub fn into_entry(self, person_id: PersonId, drink_id: DrinkId) -> NewEntry {
    NewEntry {
      person_id,
      drank_on: self.when.date,
      time_period: self.when.time,
      drink_id,
      quantity: self.quantity,
      volume: self.volume,
    }
  }
}

/// Reads a log line by line, carrying the day and time of day forward.
#[derive(Debug, Clone)]
pub struct Importer<'a> {
  units:   &'a UnitRegistry,
  context: DateContext,
}

impl<'a> Importer<'a> {
  pub fn new(units: &'a UnitRegistry, start: DateContext) -> Self {
    Self { units, context: start }
  }

  pub fn context(&self) -> &DateContext { &self.context }

  /// Parse one line. Blank lines and `#` comments yield `Ok(None)`. A line
  /// that fails leaves the carried context untouched.
  pub fn read_line(&mut self, line: &str) -> Result<Option<ImportRecord>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      return Ok(None);
    }

    let fields = ImportLine::parse(line)?;
    let when = self.context.advance(fields.header)?;

    let quantity = if fields.quantity.is_empty() {
      ApproxRange::point(ApproximateValue::exact(1.0)?)
    } else {
      parse_quantity(fields.quantity)?
    };

    let mut drink = NewDrink::named(fields.name);
    if let Some(abv) = fields.abv {
      drink = drink.with_abv_range(parse_abv(abv)?);
    }
    drink.validate()?;

    let volume = fields.volume.map(|v| parse_volume(v, self.units)).transpose()?;

    self.context = when.clone();
    Ok(Some(ImportRecord { when, drink, quantity, volume }))
  }
}

// ─── Drink set ───────────────────────────────────────────────────────────────

/// Drinks already resolved during one import, keyed by identity, so each
/// distinct drink hits the store once.
#[derive(Debug, Clone, Default)]
pub struct DrinkSet {
  ids: HashMap<DrinkIdentity, DrinkId>,
}

impl DrinkSet {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, drink: &NewDrink) -> Option<DrinkId> {
    self.ids.get(&drink.identity()).copied()
  }

  pub fn insert(&mut self, drink: &NewDrink, id: DrinkId) {
    self.ids.insert(drink.identity(), id);
  }

  pub fn len(&self) -> usize { self.ids.len() }

  pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}
