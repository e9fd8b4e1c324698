//! In-memory drink catalog.
//!
//! Registration is the only mutation. The persistent equivalent lives behind
//! [`crate::store::LedgerStore`]; both enforce the same identity rules.

use std::collections::HashMap;

use chrono::Utc;

use crate::{
  Error, Result,
  drink::{Drink, DrinkId, DrinkIdentity, NewDrink},
};

#[derive(Debug, Clone, Default)]
pub struct DrinkCatalog {
  drinks:      Vec<Drink>,
  by_identity: HashMap<DrinkIdentity, DrinkId>,
}

impl DrinkCatalog {
  pub fn new() -> Self { Self::default() }

  /// Validate and append a drink, returning its new id.
  ///
  /// Fails with [`Error::DuplicateDrink`] if a drink with the same identity is
  /// already registered.
  pub fn register(&mut self, input: NewDrink) -> Result<DrinkId> {
    input.validate()?;
    let identity = input.identity();
    if self.by_identity.contains_key(&identity) {
      return Err(Error::DuplicateDrink { name: input.name });
    }

    let id = DrinkId(self.drinks.len() as i64 + 1);
    let now = Utc::now();
    self.drinks.push(Drink {
      id,
      name: input.name,
      min_abv: input.min_abv,
      max_abv: input.max_abv,
      multiplier: input.multiplier,
      created_at: now,
      updated_at: now,
    });
    self.by_identity.insert(identity, id);
    Ok(id)
  }

  pub fn lookup(&self, id: DrinkId) -> Result<&Drink> {
    id.0
      .checked_sub(1)
      .and_then(|idx| usize::try_from(idx).ok())
      .and_then(|idx| self.drinks.get(idx))
      .ok_or(Error::NotFound { kind: "drink", id: id.0 })
  }

  /// The registered drink indistinguishable from `input`, if any.
  pub fn find(&self, input: &NewDrink) -> Option<&Drink> {
    let id = self.by_identity.get(&input.identity())?;
    self.lookup(*id).ok()
  }

  /// Return the id of the matching drink, registering `input` if none exists.
  pub fn find_or_register(&mut self, input: NewDrink) -> Result<DrinkId> {
    match self.find(&input) {
      Some(existing) => Ok(existing.id),
      None => self.register(input),
    }
  }

  pub fn len(&self) -> usize { self.drinks.len() }

  pub fn is_empty(&self) -> bool { self.drinks.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &Drink> { self.drinks.iter() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::approx::ApproximateValue;

  fn pct(v: f64) -> Option<ApproximateValue> { Some(ApproximateValue::exact(v).unwrap()) }

  fn beer() -> NewDrink { NewDrink::new("Beer").with_abv(pct(4.5), pct(5.5)) }

  #[test]
  fn register_then_lookup() {
    let mut catalog = DrinkCatalog::new();
    let id = catalog.register(beer()).unwrap();

    let drink = catalog.lookup(id).unwrap();
    assert_eq!(drink.name, "Beer");
    assert_eq!(drink.multiplier, 1.0);
    assert_eq!(drink.min_abv, pct(4.5));
  }

  #[test]
  fn duplicate_registration_fails() {
    let mut catalog = DrinkCatalog::new();
    catalog.register(beer()).unwrap();

    let err = catalog.register(beer()).unwrap_err();
    assert!(matches!(err, Error::DuplicateDrink { ref name } if name == "Beer"));

    let err = catalog
      .register(NewDrink::new("BEER").with_abv(pct(4.5), pct(5.5)))
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateDrink { .. }));
    assert_eq!(catalog.len(), 1);
  }

  #[test]
  fn same_name_different_strength_is_distinct() {
    let mut catalog = DrinkCatalog::new();
    let a = catalog.register(beer()).unwrap();
    let b = catalog
      .register(NewDrink::new("Beer").with_abv(pct(8.0), pct(9.0)))
      .unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn invalid_range_is_not_registered() {
    let mut catalog = DrinkCatalog::new();
    let err = catalog
      .register(NewDrink::new("Stout").with_abv(pct(7.0), pct(5.0)))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRange { .. }));
    assert!(catalog.is_empty());
  }

  #[test]
  fn lookup_missing_is_not_found() {
    let catalog = DrinkCatalog::new();
    assert!(matches!(
      catalog.lookup(DrinkId(7)),
      Err(Error::NotFound { kind: "drink", id: 7 })
    ));
    assert!(catalog.lookup(DrinkId(0)).is_err());
    assert!(matches!(
      catalog.lookup(DrinkId(i64::MIN)),
      Err(Error::NotFound { kind: "drink", id: i64::MIN })
    ));
  }

  #[test]
  fn find_or_register_reuses_existing() {
    let mut catalog = DrinkCatalog::new();
    let first = catalog.find_or_register(beer()).unwrap();
    let second = catalog.find_or_register(beer()).unwrap();
    assert_eq!(first, second);
    assert_eq!(catalog.len(), 1);
  }
}
