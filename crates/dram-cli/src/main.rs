//! `dram`: command-line front end for the Dram drinking ledger.
//!
//! # Usage
//!
//! ```
//! dram person add
//! dram drink add "Pale Ale" --abv 4.5-5%
//! dram log --person 1 --drink 1 --on 2024-03-01 --time evening --quantity 1-2 --volume "~33cl"
//! dram log --person 1 --name "Double Gin" --abv 40% --on 2024-03-01 --time night
//! dram import drinks.csv --person 1 --start 2024-01-01
//! dram entries --person 1 --from 2024-03-01
//! dram convert 12 "fl oz" ml
//! ```
//!
//! Reads `dram.toml` (or the path given with `--config` / `DRAM_CONFIG`) and
//! `DRAM_*` environment variables. Opening a generation-1 ledger upgrades it in place.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dram_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::LedgerConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "dram", author, version, about = "Keep a ledger of what you drink")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, env = "DRAM_CONFIG", default_value = "dram.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Manage people.
  #[command(subcommand)]
  Person(PersonCommand),

  /// Manage the drink catalog.
  #[command(subcommand)]
  Drink(DrinkCommand),

  /// Manage volume units.
  #[command(subcommand)]
  Unit(UnitCommand),

  /// Log an entry.
  Log {
    #[arg(long)]
    person:   i64,
    /// Catalog id of the drink.
    #[arg(long, required_unless_present = "name", conflicts_with = "name")]
    drink:    Option<i64>,
    /// Drink name, added to the catalog if missing. A "double" counts as two
    /// servings.
    #[arg(long)]
    name:     Option<String>,
    /// Strength of the named drink: `5%`, `4.5-5.5%`, `~12%`.
    #[arg(long, requires = "name")]
    abv:      Option<String>,
    /// Day of drinking (YYYY-MM-DD).
    #[arg(long)]
    on:       NaiveDate,
    /// morning, afternoon, evening or night.
    #[arg(long)]
    time:     String,
    /// Servings: `2`, `1-2`, `~3`.
    #[arg(long, default_value = "1")]
    quantity: String,
    /// Size of one serving: `355 ml`, `~33cl`, `12 fl oz`.
    #[arg(long)]
    volume:   Option<String>,
  },

  /// List a person's entries with standard-unit estimates.
  Entries {
    #[arg(long)]
    person: i64,
    /// First day to include.
    #[arg(long)]
    from:   Option<NaiveDate>,
    /// Last day to include.
    #[arg(long)]
    to:     Option<NaiveDate>,
  },

  /// Import a hand-kept log, one entry per line:
  /// `(12 oct, evening; pub),2,Pale Ale,5%,~33cl`.
  Import {
    file:   PathBuf,
    #[arg(long)]
    person: i64,
    /// Day assumed until a line names one; defaults to today.
    #[arg(long)]
    start:  Option<NaiveDate>,
  },

  /// Convert an amount between two units.
  Convert {
    /// `12`, `~33`.
    amount: String,
    from:   String,
    to:     String,
  },

  /// Show the ledger's schema version.
  Schema,
}

#[derive(Subcommand)]
enum PersonCommand {
  Add,
  /// Remove a person and every entry they logged.
  Remove { id: i64 },
}

#[derive(Subcommand)]
enum DrinkCommand {
  Add {
    name:       String,
    /// Strength in percent: `5%`, `4.5-5.5%`, `~12%`.
    #[arg(long)]
    abv:        Option<String>,
    /// Standard units per serving when strength or volume is unknown.
    #[arg(long, default_value_t = 1.0)]
    multiplier: f64,
  },
  Show { id: i64 },
  List,
  /// Delete a drink no entry refers to.
  Remove { id: i64 },
}

#[derive(Subcommand)]
enum UnitCommand {
  /// Register a unit, e.g. `dram unit add pint 568.261`.
  Add { abbr: String, ml_per_unit: f64 },
  List,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = LedgerConfig::load(&cli.config)?;

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open ledger at {:?}", cfg.store_path))?;
  tracing::debug!(path = ?cfg.store_path, "opened ledger");

  match cli.command {
    Command::Person(PersonCommand::Add) => commands::person_add(&store).await,
    Command::Person(PersonCommand::Remove { id }) => commands::person_remove(&store, id).await,
    Command::Drink(DrinkCommand::Add { name, abv, multiplier }) => {
      commands::drink_add(&store, name, abv.as_deref(), multiplier).await
    }
    Command::Drink(DrinkCommand::Show { id }) => commands::drink_show(&store, id).await,
    Command::Drink(DrinkCommand::List) => commands::drink_list(&store).await,
    Command::Drink(DrinkCommand::Remove { id }) => commands::drink_remove(&store, id).await,
    Command::Unit(UnitCommand::Add { abbr, ml_per_unit }) => {
      commands::unit_add(&store, &abbr, ml_per_unit).await
    }
    Command::Unit(UnitCommand::List) => commands::unit_list(&store).await,
    Command::Log { person, drink, name, abv, on, time, quantity, volume } => {
      let drink = match (drink, name.as_deref()) {
        (Some(id), _) => commands::DrinkChoice::Id(id),
        (None, Some(name)) => commands::DrinkChoice::Named { name, abv: abv.as_deref() },
        (None, None) => anyhow::bail!("either --drink or --name is required"),
      };
      let input = commands::LogInput {
        person,
        drink,
        on,
        time: &time,
        quantity: &quantity,
        volume: volume.as_deref(),
      };
      commands::log(&store, input).await
    }
    Command::Entries { person, from, to } => {
      commands::entries(&store, &cfg, person, from, to).await
    }
    Command::Import { file, person, start } => {
      let start = start.unwrap_or_else(|| chrono::Local::now().date_naive());
      commands::import(&store, &file, person, start).await
    }
    Command::Convert { amount, from, to } => {
      commands::convert(&store, &amount, &from, &to).await
    }
    Command::Schema => commands::schema(&store).await,
  }
}
