use rust_decimal::Decimal;

use crate::config::{ReconciliationConfig, Source};
use crate::model::{ChosenSource, Field, FieldVerdict, NormalizedValue, RawValue, ReasonCode};
use crate::normalize::{normalize, FieldKind};

// ---------------------------------------------------------------------------
// Field table
// ---------------------------------------------------------------------------

/// Which priority setting settles a disagreement on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityClass {
    Amount,
    Identifier,
    FreeText,
    /// Never escalated; resolution is structured-first.
    Exempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub kind: FieldKind,
    pub priority: PriorityClass,
}

/// Indexed by `Field as usize`.
static FIELD_TABLE: [FieldSpec; 8] = [
    FieldSpec { field: Field::DocumentKey, kind: FieldKind::FreeText, priority: PriorityClass::Identifier },
    FieldSpec { field: Field::InvoiceNumber, kind: FieldKind::FreeText, priority: PriorityClass::Identifier },
    FieldSpec { field: Field::TaxId, kind: FieldKind::Identifier, priority: PriorityClass::Identifier },
    FieldSpec { field: Field::IssueDate, kind: FieldKind::Date, priority: PriorityClass::FreeText },
    FieldSpec { field: Field::DueDate, kind: FieldKind::Date, priority: PriorityClass::Exempt },
    FieldSpec { field: Field::Subtotal, kind: FieldKind::Amount, priority: PriorityClass::Amount },
    FieldSpec { field: Field::TaxAmount, kind: FieldKind::Amount, priority: PriorityClass::Amount },
    FieldSpec { field: Field::Total, kind: FieldKind::Amount, priority: PriorityClass::Amount },
];

pub fn spec_for(field: Field) -> &'static FieldSpec {
    &FIELD_TABLE[field as usize]
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

struct Decision {
    resolved: Option<NormalizedValue>,
    chosen_source: ChosenSource,
    requires_review: bool,
    reason: ReasonCode,
    rationale: String,
}

/// Normalize both sides of one field and decide its verdict.
///
/// Rules, first match wins:
/// 1. due date: structured-first, never reviewed
/// 2. both absent: reviewed unless the field is an amount
/// 3. equal after normalization: agreed
/// 4. amounts within tolerance: structured value, not reviewed
/// 5. amounts otherwise: amount priority, reviewed
/// 6. everything else: identifier or free-text priority, not reviewed
pub fn reconcile_field(
    field: Field,
    structured: &RawValue,
    unstructured: &RawValue,
    config: &ReconciliationConfig,
) -> FieldVerdict {
    let spec = spec_for(field);
    let s = normalize(spec.kind, structured);
    let u = normalize(spec.kind, unstructured);

    let amount_delta = match (
        s.as_ref().and_then(NormalizedValue::as_amount),
        u.as_ref().and_then(NormalizedValue::as_amount),
    ) {
        (Some(a), Some(b)) => a.checked_sub(b).map(|d| d.abs()),
        _ => None,
    };

    let decision = decide(spec, &s, &u, amount_delta, config);

    log::debug!(
        "{field}: {} -> {} from {} (review={})",
        decision.reason,
        display_opt(&decision.resolved),
        decision.chosen_source,
        decision.requires_review
    );

    FieldVerdict {
        field,
        structured: s,
        unstructured: u,
        resolved: decision.resolved,
        chosen_source: decision.chosen_source,
        requires_review: decision.requires_review,
        reason: decision.reason,
        rationale: decision.rationale,
        amount_delta,
    }
}

fn decide(
    spec: &FieldSpec,
    s: &Option<NormalizedValue>,
    u: &Option<NormalizedValue>,
    amount_delta: Option<Decimal>,
    config: &ReconciliationConfig,
) -> Decision {
    let field = spec.field;

    if spec.priority == PriorityClass::Exempt {
        let (resolved, chosen_source) = match (s, u) {
            (Some(v), _) => (Some(v.clone()), ChosenSource::Structured),
            (None, Some(v)) => (Some(v.clone()), ChosenSource::Unstructured),
            (None, None) => (None, ChosenSource::Undefined),
        };
        return Decision {
            resolved,
            chosen_source,
            requires_review: false,
            reason: ReasonCode::DueDateExempt,
            rationale: format!("{field} is informational only and never flagged for review"),
        };
    }

    if s.is_none() && u.is_none() {
        return if spec.priority == PriorityClass::Amount {
            Decision {
                resolved: None,
                chosen_source: ChosenSource::Undefined,
                requires_review: false,
                reason: ReasonCode::BothAbsentNoncritical,
                rationale: format!(
                    "neither source has a value for {field}; amount taken as zero or not applicable"
                ),
            }
        } else {
            Decision {
                resolved: None,
                chosen_source: ChosenSource::Undefined,
                requires_review: true,
                reason: ReasonCode::BothAbsentCritical,
                rationale: format!("neither source has a value for {field}"),
            }
        };
    }

    if s == u {
        return Decision {
            resolved: s.clone(),
            chosen_source: ChosenSource::Agreed,
            requires_review: false,
            reason: ReasonCode::Agreed,
            rationale: "both sources agree after normalization".to_string(),
        };
    }

    let priority = config.source_priority();

    // A one-sided amount has nothing to compare against and falls through to
    // the free-text priority below.
    if spec.priority == PriorityClass::Amount && s.is_some() && u.is_some() {
        let tolerance = config.amount_tolerance();
        if let Some(delta) = amount_delta {
            if delta <= tolerance {
                return Decision {
                    resolved: s.clone(),
                    chosen_source: ChosenSource::Structured,
                    requires_review: false,
                    reason: ReasonCode::ToleranceOk,
                    rationale: format!(
                        "difference {delta} is within tolerance {tolerance}; structured value kept"
                    ),
                };
            }
        }

        let winner = priority.amounts;
        let gap = match amount_delta {
            Some(delta) => format!("difference {delta} exceeds tolerance {tolerance}"),
            None => format!("difference exceeds tolerance {tolerance}"),
        };
        return Decision {
            resolved: pick(winner, s, u),
            chosen_source: winner.into(),
            requires_review: true,
            reason: ReasonCode::PriorityAmountReview,
            rationale: format!("{gap}; {winner} value taken by priority, review required"),
        };
    }

    let winner = match spec.priority {
        PriorityClass::Identifier => priority.identifiers,
        _ => priority.free_text,
    };
    let rationale = if s.is_none() || u.is_none() {
        format!("{field} is present in only one source; {winner} value taken by priority")
    } else {
        format!("sources disagree on {field}; {winner} value taken by priority")
    };
    Decision {
        resolved: pick(winner, s, u),
        chosen_source: winner.into(),
        requires_review: false,
        reason: ReasonCode::PriorityNonamount,
        rationale,
    }
}

fn pick(source: Source, s: &Option<NormalizedValue>, u: &Option<NormalizedValue>) -> Option<NormalizedValue> {
    match source {
        Source::Structured => s.clone(),
        Source::Unstructured => u.clone(),
    }
}

fn display_opt(value: &Option<NormalizedValue>) -> String {
    value.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
