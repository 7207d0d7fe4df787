//! Configuration management
//!
//! Settings live in settings.json inside the ledger directory:
//! ```json
//! {
//!   "ledger": { "defaultMinimumBalance": "1000", "startingAccountNumber": 1001 },
//!   "security": { "argon2": { "timeCost": 3, "memoryCost": 65536, "parallelism": 4 } }
//! }
//! ```
//! Keys the ledger does not know about are kept when the file is saved.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountNumber, Argon2Params};

pub const SETTINGS_FILE: &str = "settings.json";

/// Minimum balance given to savings accounts opened without one
pub const DEFAULT_MINIMUM_BALANCE: i64 = 1000;

/// First number handed out when the ledger is empty
pub const DEFAULT_STARTING_ACCOUNT_NUMBER: i64 = 1001;

fn default_minimum_balance() -> Decimal {
    Decimal::new(DEFAULT_MINIMUM_BALANCE, 0)
}

fn default_starting_account_number() -> i64 {
    DEFAULT_STARTING_ACCOUNT_NUMBER
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSection,
    #[serde(default)]
    security: SecuritySection,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSection {
    #[serde(default = "default_minimum_balance")]
    default_minimum_balance: Decimal,
    #[serde(default = "default_starting_account_number")]
    starting_account_number: i64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            default_minimum_balance: default_minimum_balance(),
            starting_account_number: default_starting_account_number(),
            other: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecuritySection {
    #[serde(default)]
    argon2: Argon2Params,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Ledger rules that come from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    pub default_minimum_balance: Decimal,
    pub starting_account_number: AccountNumber,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_minimum_balance: default_minimum_balance(),
            starting_account_number: AccountNumber::new(DEFAULT_STARTING_ACCOUNT_NUMBER),
        }
    }
}

/// Ledger configuration (typed view of settings.json)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub ledger: LedgerSettings,
    pub argon2: Argon2Params,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the ledger directory. A missing file yields defaults;
    /// a malformed one is an error.
    pub fn load(ledger_dir: &Path) -> Result<Self> {
        let raw = read_settings(ledger_dir)?;

        Ok(Self {
            ledger: LedgerSettings {
                default_minimum_balance: raw.ledger.default_minimum_balance,
                starting_account_number: AccountNumber::new(raw.ledger.starting_account_number),
            },
            argon2: raw.security.argon2.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the ledger directory, keeping fields the ledger does
    /// not manage
    pub fn save(&self, ledger_dir: &Path) -> Result<()> {
        let settings_path = ledger_dir.join(SETTINGS_FILE);
        let mut settings = read_settings(ledger_dir)?;

        settings.ledger.default_minimum_balance = self.ledger.default_minimum_balance;
        settings.ledger.starting_account_number = self.ledger.starting_account_number.value();
        settings.security.argon2 = self.argon2.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    /// Cheap hashing parameters; for tests only
    pub fn with_insecure_hashing(mut self) -> Self {
        self.argon2 = Argon2Params::insecure_fast();
        self
    }
}

fn read_settings(ledger_dir: &Path) -> Result<SettingsFile> {
    let settings_path = ledger_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    let settings = serde_json::from_str(&content)
        .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.ledger.default_minimum_balance, Decimal::new(1000, 0));
        assert_eq!(config.ledger.starting_account_number, AccountNumber::new(1001));
        assert_eq!(config.argon2, Argon2Params::default());
    }

    #[test]
    fn test_partial_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "ledger": { "defaultMinimumBalance": 250 }, "security": { "argon2": { "timeCost": 1 } } }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.ledger.default_minimum_balance, Decimal::new(250, 0));
        assert_eq!(config.ledger.starting_account_number, AccountNumber::new(1001));
        assert_eq!(config.argon2.time_cost, 1);
        assert_eq!(config.argon2.memory_cost, 65536);
    }

    #[test]
    fn test_malformed_settings_is_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "ledger": { "branch": "north" } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.ledger.starting_account_number = AccountNumber::new(5000);
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["ledger"]["branch"], "north");
        assert_eq!(value["ledger"]["startingAccountNumber"], 5000);

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.ledger.starting_account_number, AccountNumber::new(5000));
    }
}
