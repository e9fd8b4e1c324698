//! Subcommand implementations. Each one is a thin layer over the store and
//! the core parsers.

use std::{collections::HashMap, path::Path};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use dram_core::{
  APPROX_TOLERANCE, ApproxRange, UnitRegistry,
  drink::{Drink, DrinkId, NewDrink},
  entry::{Entry, NewEntry, PersonId},
  import::{DateContext, DrinkSet, Importer},
  normalize::{Basis, Estimate},
  normalize_entry, parse,
  store::{DateRange, LedgerStore},
  time::TimePeriod,
};
use dram_store_sqlite::{SqliteStore, schema::CURRENT_VERSION};

use crate::config::LedgerConfig;

// ─── People ──────────────────────────────────────────────────────────────────

pub async fn person_add(store: &SqliteStore) -> anyhow::Result<()> {
  let person = store.add_person().await.context("failed to add person")?;
  println!("added person {}", person.id);
  Ok(())
}

pub async fn person_remove(store: &SqliteStore, id: i64) -> anyhow::Result<()> {
  store
    .delete_person(PersonId(id))
    .await
    .with_context(|| format!("failed to remove person {id}"))?;
  println!("removed person {id}");
  Ok(())
}

// ─── Drinks ──────────────────────────────────────────────────────────────────

pub async fn drink_add(
  store: &SqliteStore,
  name: String,
  abv: Option<&str>,
  multiplier: f64,
) -> anyhow::Result<()> {
  let mut input = NewDrink::new(name).with_multiplier(multiplier);
  if let Some(abv) = abv {
    input = input.with_abv_range(parse::parse_abv(abv)?);
  }

  let drink = store.register_drink(input).await.context("failed to add drink")?;
  println!("added drink {}: {drink}", drink.id);
  Ok(())
}

pub async fn drink_show(store: &SqliteStore, id: i64) -> anyhow::Result<()> {
  let drink = store.lookup_drink(DrinkId(id)).await?;
  println!("{}: {drink}", drink.id);
  println!("  created {}", drink.created_at.format("%Y-%m-%d %H:%M"));
  Ok(())
}

pub async fn drink_list(store: &SqliteStore) -> anyhow::Result<()> {
  for drink in store.list_drinks().await? {
    println!("{:>4}  {drink}", drink.id);
  }
  Ok(())
}

pub async fn drink_remove(store: &SqliteStore, id: i64) -> anyhow::Result<()> {
  store
    .delete_drink(DrinkId(id))
    .await
    .with_context(|| format!("failed to remove drink {id}"))?;
  println!("removed drink {id}");
  Ok(())
}

// ─── Units ───────────────────────────────────────────────────────────────────

pub async fn unit_add(store: &SqliteStore, abbr: &str, ml_per_unit: f64) -> anyhow::Result<()> {
  let id = store
    .register_unit(abbr, ml_per_unit)
    .await
    .with_context(|| format!("failed to register unit {abbr:?}"))?;
  println!("registered unit {id}");
  Ok(())
}

pub async fn unit_list(store: &SqliteStore) -> anyhow::Result<()> {
  for def in store.unit_registry().await?.iter() {
    println!("{:>4}  {:<8} {} ml", def.id, def.abbr, def.ml_per_unit);
  }
  Ok(())
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Which drink an entry is for: a catalog id, or a name (and optional
/// strength) looked up in the catalog and added when missing.
pub enum DrinkChoice<'a> {
  Id(i64),
  Named { name: &'a str, abv: Option<&'a str> },
}

pub struct LogInput<'a> {
  pub person:   i64,
  pub drink:    DrinkChoice<'a>,
  pub on:       NaiveDate,
  pub time:     &'a str,
  pub quantity: &'a str,
  pub volume:   Option<&'a str>,
}

pub async fn log(store: &SqliteStore, input: LogInput<'_>) -> anyhow::Result<()> {
  let drink_id = match input.drink {
    DrinkChoice::Id(id) => DrinkId(id),
    DrinkChoice::Named { name, abv } => {
      let drink = store
        .find_or_register_drink(named_drink(name, abv)?)
        .await
        .with_context(|| format!("failed to resolve drink {name:?}"))?;
      tracing::debug!(drink = drink.id.0, "resolved drink by name");
      drink.id
    }
  };

  let units = store.unit_registry().await?;
  let new_entry = NewEntry {
    person_id:   PersonId(input.person),
    drank_on:    input.on,
    time_period: input.time.parse::<TimePeriod>()?,
    drink_id,
    quantity:    parse::parse_quantity(input.quantity)?,
    volume:      input.volume.map(|v| parse::parse_volume(v, &units)).transpose()?,
  };

  let entry = store.record_entry(new_entry).await.context("failed to log entry")?;
  println!("logged entry {} (drink {drink_id})", entry.id);
  Ok(())
}

fn named_drink(name: &str, abv: Option<&str>) -> anyhow::Result<NewDrink> {
  let mut drink = NewDrink::named(name);
  if let Some(abv) = abv {
    drink = drink.with_abv_range(parse::parse_abv(abv)?);
  }
  drink.validate()?;
  Ok(drink)
}

pub async fn entries(
  store: &SqliteStore,
  cfg: &LedgerConfig,
  person: i64,
  from: Option<NaiveDate>,
  to: Option<NaiveDate>,
) -> anyhow::Result<()> {
  // Dates are compared as `YYYY-MM-DD` text, so open ends stay within four
  // digit years.
  let range = match (from, to) {
    (None, None) => None,
    (start, end) => Some(DateRange {
      start: match start {
        Some(d) => d,
        None => NaiveDate::from_ymd_opt(1, 1, 1).context("invalid start date")?,
      },
      end:   match end {
        Some(d) => d,
        None => NaiveDate::from_ymd_opt(9999, 12, 31).context("invalid end date")?,
      },
    }),
  };
  if let Some(r) = range
    && r.start > r.end
  {
    bail!("--from {} is after --to {}", r.start, r.end);
  }

  let standard = cfg.standard_unit()?;
  let units = store.unit_registry().await?;
  let entries = store.list_entries(PersonId(person), range).await?;

  let mut drinks: HashMap<DrinkId, Drink> = HashMap::new();
  let mut estimates = Vec::with_capacity(entries.len());
  for entry in &entries {
    if !drinks.contains_key(&entry.drink_id) {
      let drink = store.lookup_drink(entry.drink_id).await?;
      drinks.insert(entry.drink_id, drink);
    }
    let drink = &drinks[&entry.drink_id];
    let estimate = normalize_entry(entry, drink, &units, standard)
      .with_context(|| format!("failed to estimate entry {}", entry.id))?;

    println!("{}", entry_line(entry, drink, &estimate, &units));
    estimates.push(estimate);
  }

  if let Some(total) = total_units(&estimates)? {
    println!("total: {}", fmt_total(&total));
  }
  Ok(())
}

/// Sum of every estimate's unit range; `None` when there are none.
fn total_units(estimates: &[Estimate]) -> dram_core::Result<Option<ApproxRange>> {
  let mut total: Option<ApproxRange> = None;
  for estimate in estimates {
    total = Some(match total {
      Some(sum) => sum.add(estimate.units)?,
      None => estimate.units,
    });
  }
  Ok(total)
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
  pub entries: usize,
  pub drinks:  usize,
  pub skipped: usize,
}

pub async fn import(
  store: &SqliteStore,
  path: &Path,
  person: i64,
  start: NaiveDate,
) -> anyhow::Result<()> {
  let text =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
  let summary = import_text(store, PersonId(person), start, &text).await?;

  tracing::info!(
    entries = summary.entries,
    drinks = summary.drinks,
    skipped = summary.skipped,
    "import finished"
  );
  println!(
    "imported {} entries using {} drinks, skipped {} lines",
    summary.entries, summary.drinks, summary.skipped
  );
  Ok(())
}

/// Store every readable line of `text` as an entry for `person`. Lines that
/// don't parse are logged and skipped; storage failures abort the import.
async fn import_text(
  store: &SqliteStore,
  person: PersonId,
  start: NaiveDate,
  text: &str,
) -> anyhow::Result<ImportSummary> {
  store
    .get_person(person)
    .await?
    .with_context(|| format!("person {person} not found"))?;

  let units = store.unit_registry().await?;
  let mut importer = Importer::new(&units, DateContext::new(start, TimePeriod::Evening));
  let mut drinks = DrinkSet::new();
  let mut summary = ImportSummary::default();

  for (idx, line) in text.lines().enumerate() {
    let line_no = idx + 1;
    let record = match importer.read_line(line) {
      Ok(Some(record)) => record,
      Ok(None) => continue,
      Err(e) => {
        tracing::warn!(line = line_no, error = %e, "skipping line");
        summary.skipped += 1;
        continue;
      }
    };

    let drink_id = match drinks.get(&record.drink) {
      Some(id) => id,
      None => {
        let drink = store
          .find_or_register_drink(record.drink.clone())
          .await
          .with_context(|| format!("line {line_no}: failed to store drink"))?;
        drinks.insert(&record.drink, drink.id);
        drink.id
      }
    };

    let name = record.drink.name.clone();
    let context = record.when.context.join(", ");
    let entry = store
      .record_entry(record.into_entry(person, drink_id))
      .await
      .with_context(|| format!("line {line_no}: failed to store entry"))?;
    println!(
      "{}  {:<9}  {:<16}  {:>6}  ({drink_id}) {name}",
      entry.drank_on,
      entry.time_period.name(),
      context,
      entry.quantity.to_string(),
    );
    summary.entries += 1;
  }

  summary.drinks = drinks.len();
  Ok(summary)
}

// ─── Conversion & schema ─────────────────────────────────────────────────────

pub async fn convert(
  store: &SqliteStore,
  amount: &str,
  from: &str,
  to: &str,
) -> anyhow::Result<()> {
  let units = store.unit_registry().await?;
  let volume = parse::parse_volume(&format!("{amount} {from}"), &units)?;
  let target = units.resolve(to)?;
  let converted = units.convert(volume.amount, volume.unit, target)?;

  let prefix = if converted.is_approximate() { "~" } else { "" };
  println!("{prefix}{:.3} {}", converted.value(), units.get(target)?.abbr);
  Ok(())
}

pub async fn schema(store: &SqliteStore) -> anyhow::Result<()> {
  let version = store.schema_version().await?;
  println!("schema version {version} (current is {CURRENT_VERSION})");
  Ok(())
}

// ─── Formatting ──────────────────────────────────────────────────────────────

fn entry_line(entry: &Entry, drink: &Drink, estimate: &Estimate, units: &UnitRegistry) -> String {
  let serving = match &entry.volume {
    Some(v) => {
      let abbr = units.get(v.unit).map(|d| d.abbr.as_str()).unwrap_or("?");
      format!(" x {} {abbr}", v.amount)
    }
    None => String::new(),
  };
  let basis = match estimate.basis {
    Basis::AlcoholContent => "",
    Basis::Multiplier => " (by multiplier)",
  };
  format!(
    "{}  {:<9}  {}  {}{serving}  = {} units{basis}",
    entry.drank_on,
    entry.time_period.name(),
    drink.name,
    entry.quantity,
    fmt_range(&estimate.units),
  )
}

fn fmt_range(r: &ApproxRange) -> String {
  let bound = |v: dram_core::ApproximateValue| {
    let prefix = if v.is_approximate() { "~" } else { "" };
    format!("{prefix}{:.2}", v.value())
  };
  if r.min == r.max {
    bound(r.min)
  } else {
    format!("{}-{}", bound(r.min), bound(r.max))
  }
}

/// A total, plus the band it may cover once approximate ends are allowed
/// their usual error.
fn fmt_total(total: &ApproxRange) -> String {
  if !total.is_approximate() {
    return format!("{} units", fmt_range(total));
  }
  let (lo, hi) = total.envelope(APPROX_TOLERANCE);
  format!("{} units (plausibly {lo:.2}-{hi:.2})", fmt_range(total))
}

#[cfg(test)]
mod tests {
  use dram_core::ApproximateValue;

  use super::*;

  fn exact(v: f64) -> ApproximateValue { ApproximateValue::exact(v).unwrap() }

  fn approx(v: f64) -> ApproximateValue { ApproximateValue::approximate(v).unwrap() }

  fn estimate(min: ApproximateValue, max: ApproximateValue) -> Estimate {
    Estimate {
      units:     ApproxRange::new("units", min, max).unwrap(),
      volume_ml: None,
      basis:     Basis::Multiplier,
    }
  }

  async fn store_with_person() -> (SqliteStore, PersonId) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let person = store.add_person().await.unwrap();
    (store, person.id)
  }

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn ranges_print_with_two_decimals_and_flags() {
    let lo = exact(1.5);
    let hi = approx(3.25);
    assert_eq!(fmt_range(&ApproxRange::point(lo)), "1.50");
    assert_eq!(fmt_range(&ApproxRange::new("units", lo, hi).unwrap()), "1.50-~3.25");
  }

  #[test]
  fn exact_totals_stay_exact() {
    let total = total_units(&[estimate(exact(1.0), exact(2.0)), estimate(exact(1.0), exact(2.0))])
      .unwrap()
      .unwrap();
    assert_eq!(fmt_total(&total), "2.00-4.00 units");
    assert_eq!(total_units(&[]).unwrap(), None);
  }

  #[test]
  fn one_approximate_estimate_taints_the_total() {
    let total =
      total_units(&[estimate(exact(1.0), exact(1.0)), estimate(exact(1.0), approx(2.0))])
        .unwrap()
        .unwrap();
    assert_eq!(total.min, exact(2.0));
    assert_eq!(total.max, approx(3.0));
    assert_eq!(fmt_total(&total), "2.00-~3.00 units (plausibly 2.00-3.30)");
  }

  #[test]
  fn named_drinks_pick_up_doubles_and_strength() {
    let drink = named_drink("Double Rum", Some("~40%")).unwrap();
    assert_eq!(drink.multiplier, 2.0);
    assert_eq!(drink.min_abv, Some(approx(40.0)));
    assert!(named_drink("  ", None).is_err());
    assert!(named_drink("Rum", Some("strong")).is_err());
  }

  #[tokio::test]
  async fn logging_by_name_reuses_the_catalog() {
    let (store, person) = store_with_person().await;
    for name in ["Double Gin", "double gin"] {
      let input = LogInput {
        person:   person.0,
        drink:    DrinkChoice::Named { name, abv: Some("40%") },
        on:       ymd(2024, 3, 1),
        time:     "evening",
        quantity: "1",
        volume:   Some("25 ml"),
      };
      log(&store, input).await.unwrap();
    }

    let drinks = store.list_drinks().await.unwrap();
    assert_eq!(drinks.len(), 1);
    assert_eq!(drinks[0].multiplier, 2.0);
    let entries = store.list_entries(person, None).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.drink_id == drinks[0].id));
  }

  #[tokio::test]
  async fn import_carries_context_and_deduplicates_drinks() {
    let (store, person) = store_with_person().await;
    let text = "\
(12 oct, evening; pub),2,Pale Ale,5%,~33cl
1,pale ale,5%
(13 oct),1,Pale Ale,5%
(14 oct, brunch),~2,Mimosa
(15 oct, morning, night),1,Pale Ale
1
";
    let summary = import_text(&store, person, ymd(2024, 1, 1), text).await.unwrap();
    assert_eq!(summary, ImportSummary { entries: 4, drinks: 2, skipped: 2 });

    let entries = store.list_entries(person, None).await.unwrap();
    let when: Vec<_> = entries.iter().map(|e| (e.drank_on, e.time_period)).collect();
    assert_eq!(when, [
      (ymd(2024, 10, 14), TimePeriod::Afternoon),
      (ymd(2024, 10, 13), TimePeriod::Night),
      (ymd(2024, 10, 12), TimePeriod::Evening),
      (ymd(2024, 10, 12), TimePeriod::Evening),
    ]);
    assert_eq!(store.list_drinks().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn import_requires_an_existing_person() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let result = import_text(&store, PersonId(9), ymd(2024, 1, 1), "1,Ale").await;
    assert!(result.is_err());
    assert!(store.list_drinks().await.unwrap().is_empty());
  }
}
