//! SQLite backend for the Dram drinking ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Opening a generation-1 file upgrades it
//! to the current schema in place.

mod encode;
mod store;
mod upgrade;

pub mod error;
pub mod schema;

pub use error::{Error, Result};
pub use store::SqliteStore;
