//! Core types for the Dram drinking ledger: approximate measurements, volume
//! units, the drink catalog, standard-drink estimation, bulk-import parsing,
//! and the mapping from the first-generation schema to the second.
//!
//! This crate does no I/O and never logs. Storage backends implement
//! [`store::LedgerStore`]; everything else is plain synchronous code.

// Native `async fn` in traits; the `Send` bounds are spelled out on
// `LedgerStore` itself.
#![allow(async_fn_in_trait)]

pub mod approx;
pub mod catalog;
pub mod drink;
pub mod entry;
pub mod error;
pub mod import;
pub mod migrate;
pub mod normalize;
pub mod parse;
pub mod store;
pub mod time;
pub mod unit;

pub use approx::{APPROX_TOLERANCE, ApproxRange, ApproximateValue};
pub use error::{Error, Result};
pub use migrate::migrate_row_v1_to_v2;
pub use normalize::{Estimate, StandardUnitDefinition, normalize_entry};
pub use unit::{UnitId, UnitRegistry, Volume, VolumeUnit};
