use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Field, InvoiceReconciliation};

/// Tally of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub accepted: usize,
    pub needs_review: usize,
    pub failed: usize,
    pub accepted_ids: Vec<String>,
    pub review_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    /// Invoice id → fields that need review.
    pub review_detail: BTreeMap<String, Vec<Field>>,
    /// Invoice id → failure message reported by the caller.
    pub failure_detail: BTreeMap<String, String>,
    /// Field → number of invoices where it needs review.
    pub field_review_counts: BTreeMap<Field, usize>,
}

impl RunSummary {
    pub fn record(&mut self, id: &str, result: &InvoiceReconciliation) {
        self.total += 1;
        if !result.requires_review() {
            self.accepted += 1;
            self.accepted_ids.push(id.to_string());
            return;
        }

        let fields = result.fields_to_review();
        for field in &fields {
            *self.field_review_counts.entry(*field).or_insert(0) += 1;
        }
        self.needs_review += 1;
        self.review_ids.push(id.to_string());
        self.review_detail.insert(id.to_string(), fields);
    }

    /// Record an invoice that never reached reconciliation (e.g. extraction failed).
    pub fn record_failure(&mut self, id: &str, message: impl Into<String>) {
        self.total += 1;
        self.failed += 1;
        self.failed_ids.push(id.to_string());
        self.failure_detail.insert(id.to_string(), message.into());
    }
}

/// Compute summary statistics from reconciled invoices.
pub fn compute_summary(results: &[(String, InvoiceReconciliation)]) -> RunSummary {
    let mut summary = RunSummary::default();
    for (id, result) in results {
        summary.record(id, result);
    }
    summary
}
