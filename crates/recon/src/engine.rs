use serde::Deserialize;

use crate::config::ReconciliationConfig;
use crate::evidence::{compute_summary, RunSummary};
use crate::field::reconcile_field;
use crate::model::{Field, InvoiceReconciliation, RawFieldMap};

static EMPTY: RawFieldMap = RawFieldMap::empty();

/// Reconcile every header field of one invoice.
///
/// A missing map is read as an empty one. Pure: no IO and no shared state,
/// so invoices may be reconciled concurrently against the same config.
pub fn reconcile_invoice(
    structured: Option<&RawFieldMap>,
    unstructured: Option<&RawFieldMap>,
    config: &ReconciliationConfig,
) -> InvoiceReconciliation {
    let structured = structured.unwrap_or(&EMPTY);
    let unstructured = unstructured.unwrap_or(&EMPTY);

    let result = InvoiceReconciliation::from_verdicts(Field::ALL.iter().map(|&field| {
        reconcile_field(
            field,
            structured.field(field),
            unstructured.field(field),
            config,
        )
    }));

    log::debug!(
        "invoice reconciled: review={} fields={:?}",
        result.requires_review(),
        result.fields_to_review()
    );
    result
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Both extractions of one invoice, keyed by the caller's invoice id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvoiceSources {
    pub id: String,
    #[serde(default)]
    pub structured: Option<RawFieldMap>,
    #[serde(default)]
    pub unstructured: Option<RawFieldMap>,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub invoices: Vec<(String, InvoiceReconciliation)>,
    pub summary: RunSummary,
}

/// Reconcile a sequence of invoices in order and tally the run.
pub fn reconcile_batch<I>(invoices: I, config: &ReconciliationConfig) -> BatchResult
where
    I: IntoIterator<Item = InvoiceSources>,
{
    let invoices: Vec<(String, InvoiceReconciliation)> = invoices
        .into_iter()
        .map(|inv| {
            let result = reconcile_invoice(inv.structured.as_ref(), inv.unstructured.as_ref(), config);
            (inv.id, result)
        })
        .collect();

    let summary = compute_summary(&invoices);
    log::info!(
        "reconciled {} invoice(s): {} accepted, {} need review",
        summary.total,
        summary.accepted,
        summary.needs_review
    );

    BatchResult { invoices, summary }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
