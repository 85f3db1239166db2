// Reconciliation settings
// Loaded from ~/.config/invoice-recon/settings.json

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use invoice_recon::{ReconError, ReconciliationConfig, Source, SourcePriority};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "INVOICE_RECON_";

const ENV_AMOUNT_TOLERANCE: &str = "INVOICE_RECON_AMOUNT_TOLERANCE";
const ENV_PRIORITY_AMOUNTS: &str = "INVOICE_RECON_PRIORITY_AMOUNTS";
const ENV_PRIORITY_IDENTIFIERS: &str = "INVOICE_RECON_PRIORITY_IDENTIFIERS";
const ENV_PRIORITY_FREE_TEXT: &str = "INVOICE_RECON_PRIORITY_FREE_TEXT";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file `{}`: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse settings file `{}`: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("could not write settings file `{}`: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid override for `{key}`: `{value}`")]
    InvalidOverride { key: String, value: String },
    #[error(transparent)]
    Invalid(#[from] ReconError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Comparison
    #[serde(rename = "comparison.amountTolerance")]
    pub amount_tolerance: Decimal,

    // Source priority
    #[serde(rename = "priority.amounts")]
    pub priority_amounts: Source,

    #[serde(rename = "priority.identifiers")]
    pub priority_identifiers: Source,

    #[serde(rename = "priority.freeText")]
    pub priority_free_text: Source,

    /// Keys owned by other tools sharing the file; kept as-is on save.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let priority = SourcePriority::default();
        Self {
            amount_tolerance: Decimal::ZERO,
            priority_amounts: priority.amounts,
            priority_identifiers: priority.identifiers,
            priority_free_text: priority.free_text,
            other: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("invoice-recon")
            .join("settings.json")
    }

    /// Load from the default path, writing a commented default file on first use.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::config_path();
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return Ok(settings);
        }
        Self::load_from(&path)
    }

    /// Load settings from `path`. A missing file yields the defaults; a file
    /// that exists but cannot be read or parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            log::info!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let settings: Self = serde_json::from_str(&cleaned).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;

        fs::write(path, json).map_err(write_err)
    }

    /// Apply `INVOICE_RECON_*` overrides from `pairs`. Unrecognized keys are
    /// ignored; recognized keys with bad values are rejected.
    pub fn apply_overrides<I, K, V>(&mut self, pairs: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let invalid = || SettingsError::InvalidOverride {
                key: key.to_string(),
                value: value.to_string(),
            };

            match key {
                ENV_AMOUNT_TOLERANCE => {
                    self.amount_tolerance = Decimal::from_str(value.trim()).map_err(|_| invalid())?;
                }
                ENV_PRIORITY_AMOUNTS => {
                    self.priority_amounts = value.parse().map_err(|_| invalid())?;
                }
                ENV_PRIORITY_IDENTIFIERS => {
                    self.priority_identifiers = value.parse().map_err(|_| invalid())?;
                }
                ENV_PRIORITY_FREE_TEXT => {
                    self.priority_free_text = value.parse().map_err(|_| invalid())?;
                }
                other => {
                    if other.starts_with(ENV_PREFIX) {
                        log::warn!("ignoring unrecognized override {other}");
                    }
                    continue;
                }
            }
            log::info!("override {key}={value}");
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        self.apply_overrides(std::env::vars().filter(|(k, _)| k.starts_with(ENV_PREFIX)))
    }

    /// Validate into the engine's read-only configuration.
    pub fn to_config(&self) -> Result<ReconciliationConfig, SettingsError> {
        let priority = SourcePriority {
            amounts: self.priority_amounts,
            identifiers: self.priority_identifiers,
            free_text: self.priority_free_text,
        };
        Ok(ReconciliationConfig::new(priority, self.amount_tolerance)?)
    }

    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("could not create config directory: {e}");
                return;
            }
        }

        let default_config = r#"{
    // Largest absolute amount difference treated as equal
    "comparison.amountTolerance": 0,

    // Source that wins a disagreement: "structured" or "unstructured"
    "priority.amounts": "structured",
    "priority.identifiers": "structured",
    "priority.freeText": "unstructured"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("could not write default settings file: {e}");
        }
    }
}

/// Defaults, then the settings file (`path` or the default location), then
/// environment overrides, validated once.
pub fn load_config(path: Option<&Path>) -> Result<ReconciliationConfig, SettingsError> {
    let mut settings = match path {
        Some(p) => Settings::load_from(p)?,
        None => Settings::load()?,
    };
    settings.apply_env_overrides()?;
    settings.to_config()
}
