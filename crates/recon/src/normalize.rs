//! Per-kind canonicalization of raw extractor values.
//!
//! Every function here is total: malformed or oddly-shaped input normalizes
//! to `None` and is never reported as an error.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::{NormalizedValue, RawValue};

/// Accepted input date layouts, tried in order.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Identifier,
    Amount,
    Date,
    FreeText,
}

/// Normalize `raw` according to `kind`.
pub fn normalize(kind: FieldKind, raw: &RawValue) -> Option<NormalizedValue> {
    let value = match kind {
        FieldKind::Identifier => normalize_identifier(raw).map(NormalizedValue::Identifier),
        FieldKind::Amount => normalize_amount(raw).map(NormalizedValue::Amount),
        FieldKind::Date => normalize_date(raw).map(NormalizedValue::Date),
        FieldKind::FreeText => normalize_text(raw).map(NormalizedValue::Text),
    };
    if value.is_none() && !raw.is_missing() {
        log::trace!("could not normalize {kind:?} value {raw:?}");
    }
    value
}

/// Digits only. Anything without a digit is absent.
pub fn normalize_identifier(raw: &RawValue) -> Option<String> {
    let digits: String = match raw {
        RawValue::Text(s) => s.chars().filter(char::is_ascii_digit).collect(),
        RawValue::Integer(i) => i.unsigned_abs().to_string(),
        _ => return None,
    };
    (!digits.is_empty()).then_some(digits)
}

/// Parse a monetary amount.
///
/// Text with at most one `.`/`,` followed by one or two digits is read as a
/// decimal (`8092000,00` → `8092000.00`). Any other text is read as an integer
/// with `.` and `,` as thousands separators (`8.092.000` → `8092000`).
pub fn normalize_amount(raw: &RawValue) -> Option<Decimal> {
    match raw {
        RawValue::Decimal(d) => Some(*d),
        RawValue::Integer(i) => Some(Decimal::from(*i)),
        // Through the shortest text form, so 0.1 stays 0.1 rather than its
        // binary expansion.
        RawValue::Float(f) => Decimal::from_str(&f.to_string()).ok(),
        RawValue::Text(s) => parse_amount_text(s),
        RawValue::Missing | RawValue::Unsupported(_) => None,
    }
}

fn parse_amount_text(text: &str) -> Option<Decimal> {
    let compact = text.trim().replace(' ', "");
    if compact.is_empty() {
        return None;
    }

    if is_plain_decimal(&compact) {
        return Decimal::from_str(&compact.replace(',', ".")).ok();
    }

    let digits: String = compact.chars().filter(|c| *c != '.' && *c != ',').collect();
    parse_signed_integer(&digits)
}

/// `^\d+([.,]\d{1,2})?$`
fn is_plain_decimal(s: &str) -> bool {
    let (int_part, frac_part) = match s.find(['.', ',']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());

    !int_part.is_empty()
        && all_digits(int_part)
        && frac_part.is_none_or(|f| (1..=2).contains(&f.len()) && all_digits(f))
}

fn parse_signed_integer(s: &str) -> Option<Decimal> {
    let (negative, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = Decimal::from_str(unsigned).ok()?;
    Some(if negative { -value } else { value })
}

/// First layout in [`DATE_FORMATS`] that parses the trimmed text.
pub fn normalize_date(raw: &RawValue) -> Option<NaiveDate> {
    let RawValue::Text(s) = raw else {
        return None;
    };
    let text = s.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Trimmed text; numbers are rendered as text. Blank is absent.
pub fn normalize_text(raw: &RawValue) -> Option<String> {
    let text = match raw {
        RawValue::Text(s) => s.trim().to_string(),
        RawValue::Integer(i) => i.to_string(),
        RawValue::Float(f) => f.to_string(),
        RawValue::Decimal(d) => d.to_string(),
        RawValue::Missing | RawValue::Unsupported(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
