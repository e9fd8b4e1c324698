//! Runtime configuration: an optional TOML file layered under `DRAM_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use dram_core::StandardUnitDefinition;
use serde::Deserialize;

/// Australian standard drink; used when nothing else is configured.
pub const DEFAULT_ML_ETHANOL_PER_UNIT: f64 = 10.0;

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Milliliters of pure ethanol in one standard unit.
  #[serde(default = "default_ml_ethanol_per_unit")]
  pub ml_ethanol_per_unit: f64,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/dram/ledger.db") }

fn default_ml_ethanol_per_unit() -> f64 { DEFAULT_ML_ETHANOL_PER_UNIT }

impl LedgerConfig {
  /// Read `path` if it exists, then apply `DRAM_STORE_PATH` and
  /// `DRAM_ML_ETHANOL_PER_UNIT` on top.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = ::config::Config::builder()
      .add_source(::config::File::from(path).required(false))
      .add_source(::config::Environment::with_prefix("DRAM").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise LedgerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn standard_unit(&self) -> anyhow::Result<StandardUnitDefinition> {
    StandardUnitDefinition::per_ml_ethanol(self.ml_ethanol_per_unit)
      .context("invalid ml_ethanol_per_unit")
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "store_path = \"/tmp/ledger.db\"\nml_ethanol_per_unit = 17.7").unwrap();

    let cfg = LedgerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/ledger.db"));
    assert_eq!(cfg.ml_ethanol_per_unit, 17.7);
  }

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = LedgerConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.ml_ethanol_per_unit, DEFAULT_ML_ETHANOL_PER_UNIT);
    assert!(cfg.store_path.ends_with("ledger.db"));
  }

  #[test]
  fn non_positive_standard_unit_is_rejected() {
    let cfg = LedgerConfig { store_path: PathBuf::from("x.db"), ml_ethanol_per_unit: 0.0 };
    assert!(cfg.standard_unit().is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/a.db")), PathBuf::from(home).join("a.db"));
    assert_eq!(expand_tilde(Path::new("/abs/a.db")), PathBuf::from("/abs/a.db"));
  }
}
