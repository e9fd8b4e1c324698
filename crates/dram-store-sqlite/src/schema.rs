//! SQL schema for the Dram SQLite store.
//!
//! The schema generation is tracked in `PRAGMA user_version`:
//!
//! | `user_version` | Layout |
//! |----------------|--------|
//! | 0 | empty file |
//! | 1 | generation 1: inline enumerations, `context` and `volume_ml` on entries |
//! | 2 | generation 2: `time_period` / `volume_unit` lookup tables |
//!
//! SQLite has no composite types, so every approximate value is stored as a
//! `<col>_val REAL` / `<col>_is_approximate INTEGER` column pair, both NULL or
//! both set.

pub const CURRENT_VERSION: i64 = 2;

/// Per-connection settings. Must run outside a transaction.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// `TIMEPERIOD` labels accepted by generation 1.
pub const LEGACY_TIME_PERIODS: [&str; 4] = ["morning", "afternoon", "evening", "night"];

/// `VOLUMEUNIT` labels accepted by generation 1.
pub const LEGACY_VOLUME_UNITS: [&str; 4] = ["fl oz", "mL", "cL", "L"];

/// Generation-1 DDL. Kept so that old files can be recognised and read, and
/// so tests can build them.
pub const SCHEMA_V1: &str = "
CREATE TABLE person (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE drink (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    name                    TEXT NOT NULL,
    min_abv_val             REAL,
    min_abv_is_approximate  INTEGER,
    max_abv_val             REAL,
    max_abv_is_approximate  INTEGER,
    multiplier              REAL NOT NULL DEFAULT 1.0,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    UNIQUE (name, min_abv_val, min_abv_is_approximate, max_abv_val, max_abv_is_approximate)
);

CREATE TABLE entry (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id                   INTEGER NOT NULL REFERENCES person(id) ON DELETE CASCADE,
    drank_on                    TEXT NOT NULL,
    time_period                 TEXT NOT NULL
        CHECK (time_period IN ('morning', 'afternoon', 'evening', 'night')),
    context                     TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    drink_id                    INTEGER NOT NULL REFERENCES drink(id),
    min_quantity_val            REAL NOT NULL,
    min_quantity_is_approximate INTEGER NOT NULL,
    max_quantity_val            REAL NOT NULL,
    max_quantity_is_approximate INTEGER NOT NULL,
    volume_val                  REAL,
    volume_is_approximate       INTEGER,
    volume_unit                 TEXT CHECK (volume_unit IN ('fl oz', 'mL', 'cL', 'L')),
    volume_ml_val               REAL,
    volume_ml_is_approximate    INTEGER,
    volume_ml_unit              TEXT CHECK (volume_ml_unit IN ('fl oz', 'mL', 'cL', 'L')),
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL
);

PRAGMA user_version = 1;
";

/// Generation-2 DDL; idempotent thanks to `IF NOT EXISTS`. Lookup rows are
/// seeded separately from the core crate's definitions.
pub const SCHEMA_V2: &str = "
CREATE TABLE IF NOT EXISTS person (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Drinks are append-only reference data.
CREATE TABLE IF NOT EXISTS drink (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    name                    TEXT NOT NULL,
    min_abv_val             REAL,
    min_abv_is_approximate  INTEGER,
    max_abv_val             REAL,
    max_abv_is_approximate  INTEGER,
    multiplier              REAL NOT NULL DEFAULT 1.0 CHECK (multiplier > 0),
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    CHECK ((min_abv_val IS NULL) = (min_abv_is_approximate IS NULL)),
    CHECK ((max_abv_val IS NULL) = (max_abv_is_approximate IS NULL))
);

-- NULLs never collide in a plain UNIQUE constraint, hence the IFNULLs.
CREATE UNIQUE INDEX IF NOT EXISTS drink_identity_idx ON drink (
    lower(name),
    IFNULL(min_abv_val, -1), IFNULL(min_abv_is_approximate, -1),
    IFNULL(max_abv_val, -1), IFNULL(max_abv_is_approximate, -1),
    multiplier
);

CREATE TABLE IF NOT EXISTS time_period (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS volume_unit (
    id           INTEGER PRIMARY KEY,
    abbr         TEXT NOT NULL UNIQUE,
    ml_per_unit  REAL NOT NULL CHECK (ml_per_unit > 0)
);

CREATE TABLE IF NOT EXISTS entry (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id                   INTEGER NOT NULL REFERENCES person(id) ON DELETE CASCADE,
    drank_on                    TEXT NOT NULL,   -- YYYY-MM-DD
    time_id                     INTEGER NOT NULL REFERENCES time_period(id),
    drink_id                    INTEGER NOT NULL REFERENCES drink(id) ON DELETE NO ACTION,
    min_quantity_val            REAL NOT NULL,
    min_quantity_is_approximate INTEGER NOT NULL,
    max_quantity_val            REAL NOT NULL,
    max_quantity_is_approximate INTEGER NOT NULL,
    volume_val                  REAL,
    volume_is_approximate       INTEGER,
    volume_unit_id              INTEGER REFERENCES volume_unit(id),
    created_at                  TEXT NOT NULL,
    updated_at                  TEXT NOT NULL,
    CHECK (min_quantity_val <= max_quantity_val),
    CHECK ((volume_val IS NULL) = (volume_unit_id IS NULL))
);

CREATE INDEX IF NOT EXISTS entry_person_day_idx ON entry(person_id, drank_on);
CREATE INDEX IF NOT EXISTS entry_drink_idx      ON entry(drink_id);

PRAGMA user_version = 2;
";
