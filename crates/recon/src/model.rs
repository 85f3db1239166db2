use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Source;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Field vocabulary
// ---------------------------------------------------------------------------

/// Invoice header fields, declared in reconciliation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    DocumentKey,
    InvoiceNumber,
    TaxId,
    IssueDate,
    DueDate,
    Subtotal,
    TaxAmount,
    Total,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::DocumentKey,
        Field::InvoiceNumber,
        Field::TaxId,
        Field::IssueDate,
        Field::DueDate,
        Field::Subtotal,
        Field::TaxAmount,
        Field::Total,
    ];

    /// Wire name used as the key in raw field maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentKey => "document-key",
            Self::InvoiceNumber => "invoice-number",
            Self::TaxId => "tax-id",
            Self::IssueDate => "issue-date",
            Self::DueDate => "due-date",
            Self::Subtotal => "subtotal",
            Self::TaxAmount => "tax-amount",
            Self::Total => "total",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ReconError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == value.trim())
            .ok_or_else(|| ReconError::UnknownField(value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// An untyped value as produced by one extractor.
///
/// Deserializes from any JSON value: `null` becomes `Missing`, strings and
/// numbers keep their shape, and anything else (bool, list, object) is kept
/// as `Unsupported` so it can be reported but never normalized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum RawValue {
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Unsupported(Value),
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::String(s) => Self::Text(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Unsupported(Value::Number(n))
                }
            }
            other => Self::Unsupported(other),
        }
    }
}

impl From<RawValue> for Value {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Missing => Value::Null,
            RawValue::Text(s) => Value::String(s),
            RawValue::Integer(i) => Value::from(i),
            RawValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            RawValue::Decimal(d) => Value::String(d.to_string()),
            RawValue::Unsupported(v) => v,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for RawValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Missing)
    }
}

static MISSING: RawValue = RawValue::Missing;

/// Field name → raw value for one invoice, as produced by one source.
///
/// An omitted key and an explicit `null` read back identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFieldMap {
    values: BTreeMap<String, RawValue>,
}

impl RawFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn get(&self, key: &str) -> &RawValue {
        self.values.get(key).unwrap_or(&MISSING)
    }

    pub fn field(&self, field: Field) -> &RawValue {
        self.get(field.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Option<RawValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn set(&mut self, field: Field, value: impl Into<RawValue>) -> Option<RawValue> {
        self.insert(field.as_str(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawFieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized values
// ---------------------------------------------------------------------------

/// Canonical, comparable form of a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    /// Digits only.
    Identifier(String),
    Amount(Decimal),
    Date(NaiveDate),
    /// Trimmed, never empty.
    Text(String),
}

impl NormalizedValue {
    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Self::Amount(d) => Some(*d),
            _ => None,
        }
    }

    /// A raw value that normalizes back to `self` under the same field kind.
    pub fn to_raw(&self) -> RawValue {
        match self {
            Self::Amount(d) => RawValue::Decimal(*d),
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) | Self::Text(s) => f.write_str(s),
            Self::Amount(d) => write!(f, "{d}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Provenance tag on a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChosenSource {
    Agreed,
    Structured,
    Unstructured,
    Undefined,
}

impl From<Source> for ChosenSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Structured => Self::Structured,
            Source::Unstructured => Self::Unstructured,
        }
    }
}

impl fmt::Display for ChosenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agreed => write!(f, "agreed"),
            Self::Structured => write!(f, "structured"),
            Self::Unstructured => write!(f, "unstructured"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

/// Which decision rule produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Agreed,
    BothAbsentCritical,
    BothAbsentNoncritical,
    ToleranceOk,
    PriorityAmountReview,
    PriorityNonamount,
    DueDateExempt,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agreed => write!(f, "AGREED"),
            Self::BothAbsentCritical => write!(f, "BOTH_ABSENT_CRITICAL"),
            Self::BothAbsentNoncritical => write!(f, "BOTH_ABSENT_NONCRITICAL"),
            Self::ToleranceOk => write!(f, "TOLERANCE_OK"),
            Self::PriorityAmountReview => write!(f, "PRIORITY_AMOUNT_REVIEW"),
            Self::PriorityNonamount => write!(f, "PRIORITY_NONAMOUNT"),
            Self::DueDateExempt => write!(f, "DUE_DATE_EXEMPT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldVerdict {
    pub field: Field,
    pub structured: Option<NormalizedValue>,
    pub unstructured: Option<NormalizedValue>,
    pub resolved: Option<NormalizedValue>,
    pub chosen_source: ChosenSource,
    pub requires_review: bool,
    pub reason: ReasonCode,
    /// Audit-trail explanation of `reason`.
    pub rationale: String,
    /// Absolute difference, set only for amount fields with both sides present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_delta: Option<Decimal>,
}

/// Every header field's verdict for one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceReconciliation {
    fields: BTreeMap<Field, FieldVerdict>,
    requires_review: bool,
}

impl InvoiceReconciliation {
    pub(crate) fn from_verdicts(verdicts: impl IntoIterator<Item = FieldVerdict>) -> Self {
        let fields: BTreeMap<Field, FieldVerdict> =
            verdicts.into_iter().map(|v| (v.field, v)).collect();
        let requires_review = fields.values().any(|v| v.requires_review);
        Self {
            fields,
            requires_review,
        }
    }

    /// True iff any field requires review.
    pub fn requires_review(&self) -> bool {
        self.requires_review
    }

    pub fn get(&self, field: Field) -> Option<&FieldVerdict> {
        self.fields.get(&field)
    }

    /// Verdicts in header-field order.
    pub fn verdicts(&self) -> impl Iterator<Item = &FieldVerdict> {
        self.fields.values()
    }

    pub fn fields_to_review(&self) -> Vec<Field> {
        self.fields
            .values()
            .filter(|v| v.requires_review)
            .map(|v| v.field)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
