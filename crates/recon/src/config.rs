use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One of the two extractors describing the same invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Machine-generated invoice markup.
    Structured,
    /// Text layer of the rendered document.
    Unstructured,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Unstructured => "unstructured",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ReconError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "unstructured" => Ok(Self::Unstructured),
            _ => Err(ReconError::UnknownSource(value.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Which source wins a disagreement, per priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcePriority {
    pub amounts: Source,
    pub identifiers: Source,
    pub free_text: Source,
}

impl Default for SourcePriority {
    fn default() -> Self {
        Self {
            amounts: Source::Structured,
            identifiers: Source::Structured,
            free_text: Source::Unstructured,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Read-only settings shared by every invoice in a run.
///
/// Only constructible validated: through [`ReconciliationConfig::new`], the
/// parsers, or `Deserialize` (which runs the same validation). Missing keys
/// in a parsed document take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigDocument")]
pub struct ReconciliationConfig {
    source_priority: SourcePriority,
    amount_tolerance: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigDocument {
    source_priority: SourcePriority,
    amount_tolerance: Decimal,
}

impl TryFrom<ConfigDocument> for ReconciliationConfig {
    type Error = ReconError;

    fn try_from(doc: ConfigDocument) -> Result<Self, Self::Error> {
        Self::new(doc.source_priority, doc.amount_tolerance)
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            source_priority: SourcePriority::default(),
            amount_tolerance: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconciliationConfig {
    pub fn new(source_priority: SourcePriority, amount_tolerance: Decimal) -> Result<Self, ReconError> {
        let config = Self {
            source_priority,
            amount_tolerance,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.amount_tolerance < Decimal::ZERO {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance must be non-negative, got {}",
                self.amount_tolerance
            )));
        }
        Ok(())
    }

    pub fn source_priority(&self) -> &SourcePriority {
        &self.source_priority
    }

    pub fn amount_tolerance(&self) -> Decimal {
        self.amount_tolerance
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
