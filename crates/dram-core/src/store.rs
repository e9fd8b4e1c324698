//! The `LedgerStore` trait.
//!
//! Implemented by storage backends (e.g. `dram-store-sqlite`). Hosts depend on
//! this abstraction rather than on a concrete database.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  drink::{Drink, DrinkId, NewDrink},
  entry::{Entry, EntryId, NewEntry, Person, PersonId},
  unit::{UnitId, UnitRegistry},
};

/// Inclusive `drank_on` bounds for [`LedgerStore::list_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

/// Persistent home of people, drinks, entries and volume units.
///
/// Drinks and units are append-only reference data. Entries are owned by a
/// person and go away with them.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded runtimes.
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  fn add_person(&self) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Returns `None` if the person does not exist.
  fn get_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Delete a person together with every entry they own.
  fn delete_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Drinks ────────────────────────────────────────────────────────────

  /// Validate and store a new drink. Fails if an indistinguishable drink
  /// (same case-folded name, ABV bounds and multiplier) already exists.
  fn register_drink(
    &self,
    input: NewDrink,
  ) -> impl Future<Output = Result<Drink, Self::Error>> + Send + '_;

  /// Fetch a drink by id; a missing drink is an error.
  fn lookup_drink(
    &self,
    id: DrinkId,
  ) -> impl Future<Output = Result<Drink, Self::Error>> + Send + '_;

  /// The stored drink indistinguishable from `input`, if any.
  fn find_drink<'a>(
    &'a self,
    input: &'a NewDrink,
  ) -> impl Future<Output = Result<Option<Drink>, Self::Error>> + Send + 'a;

  /// Return the matching drink, registering `input` first if there is none.
  fn find_or_register_drink(
    &self,
    input: NewDrink,
  ) -> impl Future<Output = Result<Drink, Self::Error>> + Send + '_;

  fn list_drinks(&self) -> impl Future<Output = Result<Vec<Drink>, Self::Error>> + Send + '_;

  /// Delete a drink no entry refers to. Referenced drinks are refused.
  fn delete_drink(
    &self,
    id: DrinkId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Units ─────────────────────────────────────────────────────────────

  /// Every unit currently registered, ready for conversion.
  fn unit_registry(&self)
  -> impl Future<Output = Result<UnitRegistry, Self::Error>> + Send + '_;

  /// Append a unit. Existing units can never be redefined.
  fn register_unit<'a>(
    &'a self,
    abbr: &'a str,
    ml_per_unit: f64,
  ) -> impl Future<Output = Result<UnitId, Self::Error>> + Send + 'a;

  // ── Entries ───────────────────────────────────────────────────────────

  /// Validate and store an entry. The person, drink and volume unit must
  /// exist.
  fn record_entry(
    &self,
    input: NewEntry,
  ) -> impl Future<Output = Result<Entry, Self::Error>> + Send + '_;

  fn get_entry(
    &self,
    id: EntryId,
  ) -> impl Future<Output = Result<Option<Entry>, Self::Error>> + Send + '_;

  /// A person's entries, newest day first and in time-of-day order within a
  /// day.
  fn list_entries(
    &self,
    person_id: PersonId,
    range: Option<DateRange>,
  ) -> impl Future<Output = Result<Vec<Entry>, Self::Error>> + Send + '_;

  /// Refresh an entry's `updated_at`. The only change an entry ever sees.
  fn touch_entry(
    &self,
    id: EntryId,
  ) -> impl Future<Output = Result<Entry, Self::Error>> + Send + '_;
}
