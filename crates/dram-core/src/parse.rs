//! Free-text forms of quantities, strengths and serving sizes, as typed into
//! the ledger by hand: `"1-2"`, `"~2"`, `"4.5-5.5%"`, `"~33cl"`, `"12 fl oz"`.
//!
//! A leading `~` or trailing `?` on a number marks it approximate.

use crate::{
  Error, Result,
  approx::{ApproxRange, ApproximateValue},
  entry,
  unit::{UnitRegistry, Volume},
};

/// Parse a serving count: a single bound (`"2"`, `"~2"`) or a range
/// (`"1-2"`, `"1-~3"`).
pub fn parse_quantity(input: &str) -> Result<ApproxRange> {
  let (min, max) = parse_range("quantity", input)?;
  entry::quantity(min, max)
}

/// Parse an ABV in percent: `"5%"`, `"4.5-5.5%"`, `"~12"`. Every `%` sign is
/// optional.
pub fn parse_abv(input: &str) -> Result<ApproxRange> {
  let stripped = input.replace('%', "");
  let (min, max) = parse_range("ABV", &stripped).map_err(|_| Error::Parse {
    kind:  "ABV",
    input: input.to_owned(),
  })?;
  ApproxRange::new("ABV", min, max)
}

/// Parse a serving size with its unit, resolving the unit against `units`.
pub fn parse_volume(input: &str, units: &UnitRegistry) -> Result<Volume> {
  let err = || Error::Parse { kind: "volume", input: input.to_owned() };

  let trimmed = input.trim();
  let split = trimmed
    .char_indices()
    .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || c == '?' || (i == 0 && c == '~')))
    .map(|(i, _)| i)
    .ok_or_else(err)?;
  let (number, unit) = trimmed.split_at(split);

  let amount = parse_bound(number).ok_or_else(err)?;
  if unit.trim().is_empty() {
    return Err(err());
  }
  Ok(Volume { amount: amount?, unit: units.resolve(unit)? })
}

fn parse_range(
  kind: &'static str,
  input: &str,
) -> Result<(ApproximateValue, ApproximateValue)> {
  let err = || Error::Parse { kind, input: input.to_owned() };
  let (lo, hi) = match input.trim().split_once('-') {
    Some((lo, hi)) => (lo, hi),
    None => (input, input),
  };
  let lo = parse_bound(lo).ok_or_else(err)??;
  let hi = parse_bound(hi).ok_or_else(err)??;
  Ok((lo, hi))
}

/// `None` when `text` isn't a number at all; `Some(Err)` when it is one but
/// overflows to infinity.
fn parse_bound(text: &str) -> Option<Result<ApproximateValue>> {
  let mut text = text.trim();
  let mut approximate = false;
  if let Some(rest) = text.strip_prefix('~') {
    approximate = true;
    text = rest.trim_start();
  }
  if let Some(rest) = text.strip_suffix('?') {
    approximate = true;
    text = rest.trim_end();
  }
  if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
    return None;
  }
  let value: f64 = text.parse().ok()?;
  Some(ApproximateValue::new(value, approximate))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::unit::VolumeUnit;

  fn exact(v: f64) -> ApproximateValue { ApproximateValue::exact(v).unwrap() }

  fn approx(v: f64) -> ApproximateValue { ApproximateValue::approximate(v).unwrap() }

  #[test]
  fn quantity_forms() {
    assert_eq!(parse_quantity("2").unwrap(), ApproxRange::point(exact(2.0)));
    assert_eq!(parse_quantity("~2").unwrap(), ApproxRange::point(approx(2.0)));

    let range = parse_quantity(" 1 - 2? ").unwrap();
    assert_eq!(range.min, exact(1.0));
    assert_eq!(range.max, approx(2.0));

    let range = parse_quantity("~1-~3").unwrap();
    assert!(range.min.is_approximate() && range.max.is_approximate());
  }

  #[test]
  fn quantity_rejects_garbage_and_inverted_ranges() {
    assert!(matches!(parse_quantity("a few"), Err(Error::Parse { .. })));
    assert!(matches!(parse_quantity(""), Err(Error::Parse { .. })));
    assert!(matches!(parse_quantity("3-1"), Err(Error::InvalidRange { .. })));
  }

  #[test]
  fn abv_forms() {
    assert_eq!(parse_abv("5%").unwrap(), ApproxRange::point(exact(5.0)));
    let range = parse_abv("4.5-5.5%").unwrap();
    assert_eq!((range.min, range.max), (exact(4.5), exact(5.5)));
    let range = parse_abv("~12%").unwrap();
    assert!(range.min.is_approximate());
    assert!(matches!(parse_abv("strong"), Err(Error::Parse { kind: "ABV", .. })));
  }

  #[test]
  fn volume_forms() {
    let reg = UnitRegistry::seeded();

    let v = parse_volume("355 mL", &reg).unwrap();
    assert_eq!(v, Volume::new(exact(355.0), VolumeUnit::Milliliter));

    let v = parse_volume("~33cl", &reg).unwrap();
    assert_eq!(v, Volume::new(approx(33.0), VolumeUnit::Centiliter));

    let v = parse_volume("12 fl oz", &reg).unwrap();
    assert_eq!(v.unit, VolumeUnit::FluidOunce.id());
  }

  #[test]
  fn volume_requires_known_unit() {
    let reg = UnitRegistry::seeded();
    assert!(matches!(parse_volume("355", &reg), Err(Error::Parse { .. })));
    assert!(matches!(parse_volume("2 pints", &reg), Err(Error::UnknownUnit(_))));
    assert!(matches!(parse_volume("mL", &reg), Err(Error::Parse { .. })));
  }
}
