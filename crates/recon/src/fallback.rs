//! Merge of a fallback extraction into a primary raw field map.
//!
//! The fallback extractor runs upstream of reconciliation, only when key
//! fields are missing. Its confidence and observations are carried for the
//! caller and never take part in a reconciliation decision.

use serde::{Deserialize, Serialize};

use crate::model::{Field, RawFieldMap, RawValue};

/// Fields whose absence justifies asking the fallback extractor.
pub const KEY_FIELDS: [Field; 4] = [
    Field::DocumentKey,
    Field::InvoiceNumber,
    Field::TaxId,
    Field::Total,
];

const PLACEHOLDER: &str = "N/A";

/// Missing, blank, or the `N/A` placeholder.
pub fn is_blank(value: &RawValue) -> bool {
    match value {
        RawValue::Missing => true,
        RawValue::Text(s) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case(PLACEHOLDER)
        }
        _ => false,
    }
}

pub fn missing_key_fields(map: &RawFieldMap) -> Vec<Field> {
    KEY_FIELDS
        .iter()
        .copied()
        .filter(|f| is_blank(map.field(*f)))
        .collect()
}

/// Output of the fallback extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackExtraction {
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(flatten)]
    pub fields: RawFieldMap,
}

impl FallbackExtraction {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// Copy fallback values into blank entries of `primary`.
///
/// Never overwrites a value already present. Returns the keys filled.
pub fn fill_missing(primary: &mut RawFieldMap, fallback: &FallbackExtraction) -> Vec<String> {
    let mut filled = Vec::new();
    for (key, value) in fallback.fields.iter() {
        if is_blank(primary.get(key)) && !is_blank(value) {
            primary.insert(key, value.clone());
            filled.push(key.to_string());
        }
    }
    log::debug!(
        "fallback filled {filled:?} (confidence {:?})",
        fallback.confidence
    );
    filled
}
