use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use invoice_recon::engine::{reconcile_batch, reconcile_invoice, InvoiceSources};
use invoice_recon::fallback::{fill_missing, missing_key_fields, FallbackExtraction};
use invoice_recon::{
    ChosenSource, Field, NormalizedValue, RawFieldMap, ReasonCode, ReconciliationConfig, Source,
    SourcePriority,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_invoices() -> Vec<InvoiceSources> {
    let path = fixtures_dir().join("invoices.json");
    let data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&data).unwrap()
}

fn tolerant_config() -> ReconciliationConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("tolerant.recon.toml")).unwrap();
    ReconciliationConfig::from_toml(&toml).unwrap()
}

fn config_with(tolerance: &str, amounts: Source) -> ReconciliationConfig {
    let priority = SourcePriority {
        amounts,
        ..SourcePriority::default()
    };
    ReconciliationConfig::new(priority, Decimal::from_str(tolerance).unwrap()).unwrap()
}

fn single(field: Field, structured: &str, unstructured: &str) -> (RawFieldMap, RawFieldMap) {
    let mut s = RawFieldMap::new();
    let mut u = RawFieldMap::new();
    s.set(field, structured);
    u.set(field, unstructured);
    (s, u)
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn total_agreement() {
    let (s, u) = single(Field::Total, "1000000.00", "1000000.00");
    let result = reconcile_invoice(Some(&s), Some(&u), &config_with("1.0", Source::Structured));
    let v = result.get(Field::Total).unwrap();
    assert_eq!(v.resolved.as_ref().unwrap().to_string(), "1000000.00");
    assert_eq!(v.chosen_source, ChosenSource::Agreed);
    assert!(!v.requires_review);
}

#[test]
fn total_within_tolerance() {
    let (s, u) = single(Field::Total, "1000000.00", "1000000.50");
    let result = reconcile_invoice(Some(&s), Some(&u), &config_with("1.0", Source::Structured));
    let v = result.get(Field::Total).unwrap();
    assert_eq!(v.resolved.as_ref().unwrap().to_string(), "1000000.00");
    assert_eq!(v.chosen_source, ChosenSource::Structured);
    assert_eq!(v.reason, ReasonCode::ToleranceOk);
    assert!(!v.requires_review);
}

#[test]
fn total_beyond_tolerance() {
    let (s, u) = single(Field::Total, "1000000.00", "1050000.00");
    let result = reconcile_invoice(Some(&s), Some(&u), &config_with("1.0", Source::Structured));
    let v = result.get(Field::Total).unwrap();
    assert_eq!(v.resolved.as_ref().unwrap().to_string(), "1000000.00");
    assert_eq!(v.chosen_source, ChosenSource::Structured);
    assert_eq!(v.reason, ReasonCode::PriorityAmountReview);
    assert_eq!(v.amount_delta, Some(Decimal::from(50000)));
    assert!(v.requires_review);
    assert!(result.requires_review());
}

#[test]
fn tax_id_disagreement_follows_identifier_priority() {
    let (s, u) = single(Field::TaxId, "900.123.456-7", "900123456");
    let result = reconcile_invoice(Some(&s), Some(&u), &ReconciliationConfig::default());
    let v = result.get(Field::TaxId).unwrap();
    assert_eq!(v.resolved, Some(NormalizedValue::Identifier("9001234567".into())));
    assert_eq!(v.chosen_source, ChosenSource::Structured);
    assert!(!v.requires_review);
}

#[test]
fn due_date_from_unstructured_only() {
    let mut u = RawFieldMap::new();
    u.set(Field::DueDate, "17/11/2024");
    let result = reconcile_invoice(None, Some(&u), &ReconciliationConfig::default());
    let v = result.get(Field::DueDate).unwrap();
    assert_eq!(v.resolved.as_ref().unwrap().to_string(), "2024-11-17");
    assert_eq!(v.chosen_source, ChosenSource::Unstructured);
    assert!(!v.requires_review);
}

#[test]
fn both_absent_invoice_number_vs_subtotal() {
    let result = reconcile_invoice(None, None, &ReconciliationConfig::default());

    let number = result.get(Field::InvoiceNumber).unwrap();
    assert_eq!(number.resolved, None);
    assert_eq!(number.chosen_source, ChosenSource::Undefined);
    assert!(number.requires_review);

    let subtotal = result.get(Field::Subtotal).unwrap();
    assert_eq!(subtotal.resolved, None);
    assert_eq!(subtotal.chosen_source, ChosenSource::Undefined);
    assert!(!subtotal.requires_review);
}

// -------------------------------------------------------------------------
// Fixture batch
// -------------------------------------------------------------------------

#[test]
fn fixture_batch_with_tolerance() {
    let batch = reconcile_batch(load_invoices(), &tolerant_config());
    let summary = &batch.summary;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.accepted_ids, vec!["FE-277", "FE-280"]);
    assert_eq!(summary.review_ids, vec!["FE-278", "FE-279"]);
    assert_eq!(summary.review_detail["FE-278"], vec![Field::Total]);
    assert_eq!(
        summary.review_detail["FE-279"],
        vec![Field::DocumentKey, Field::TaxId, Field::IssueDate]
    );
    assert_eq!(summary.field_review_counts[&Field::Total], 1);
    assert_eq!(summary.failed, 0);
}

#[test]
fn fixture_formatting_differences_agree() {
    let batch = reconcile_batch(load_invoices(), &tolerant_config());
    let (_, fe277) = &batch.invoices[0];
    for field in [
        Field::InvoiceNumber,
        Field::TaxId,
        Field::IssueDate,
        Field::Subtotal,
        Field::TaxAmount,
        Field::Total,
    ] {
        assert_eq!(fe277.get(field).unwrap().reason, ReasonCode::Agreed, "{field}");
    }
    let due = fe277.get(Field::DueDate).unwrap();
    assert_eq!(due.chosen_source, ChosenSource::Structured);
}

#[test]
fn fixture_subtotal_within_tolerance_only_when_configured() {
    let invoices = load_invoices();
    let fe278 = invoices.iter().find(|i| i.id == "FE-278").unwrap();

    let tolerant = reconcile_invoice(fe278.structured.as_ref(), fe278.unstructured.as_ref(), &tolerant_config());
    let subtotal = tolerant.get(Field::Subtotal).unwrap();
    assert_eq!(subtotal.reason, ReasonCode::ToleranceOk);
    assert_eq!(subtotal.resolved.as_ref().unwrap().to_string(), "1000000");

    let strict = reconcile_invoice(
        fe278.structured.as_ref(),
        fe278.unstructured.as_ref(),
        &ReconciliationConfig::default(),
    );
    assert_eq!(strict.fields_to_review(), vec![Field::Subtotal, Field::Total]);
}

#[test]
fn fixture_identifier_conflict_is_not_escalated() {
    let invoices = load_invoices();
    let fe280 = invoices.iter().find(|i| i.id == "FE-280").unwrap();
    let result = reconcile_invoice(fe280.structured.as_ref(), fe280.unstructured.as_ref(), &tolerant_config());

    let tax_id = result.get(Field::TaxId).unwrap();
    assert_eq!(tax_id.reason, ReasonCode::PriorityNonamount);
    assert_eq!(tax_id.resolved.as_ref().unwrap().to_string(), "800111222");
    assert!(!result.requires_review());
}

#[test]
fn fixture_structured_null_is_empty_map() {
    let invoices = load_invoices();
    let fe279 = invoices.iter().find(|i| i.id == "FE-279").unwrap();
    assert!(fe279.structured.is_none());

    let result = reconcile_invoice(None, fe279.unstructured.as_ref(), &tolerant_config());
    let number = result.get(Field::InvoiceNumber).unwrap();
    assert_eq!(number.chosen_source, ChosenSource::Structured);
    assert_eq!(number.resolved, None);
    assert!(!number.requires_review);

    // "N/A" does not normalize to an amount.
    let total = result.get(Field::Total).unwrap();
    assert_eq!(total.reason, ReasonCode::BothAbsentNoncritical);
}

#[test]
fn verdicts_serialize_for_audit() {
    let invoices = load_invoices();
    let result = reconcile_invoice(
        invoices[1].structured.as_ref(),
        invoices[1].unstructured.as_ref(),
        &tolerant_config(),
    );
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["requires_review"], true);
    assert_eq!(json["fields"]["total"]["reason"], "PRIORITY_AMOUNT_REVIEW");
    assert_eq!(json["fields"]["total"]["resolved"], "1190000.00");
    assert_eq!(json["fields"]["issue-date"]["resolved"], "2024-11-18");
    assert!(json["fields"]["total"]["rationale"].as_str().unwrap().contains("exceeds tolerance"));
}

// -------------------------------------------------------------------------
// Fallback + concurrency
// -------------------------------------------------------------------------

#[test]
fn fallback_fills_gaps_before_reconciliation() {
    let invoices = load_invoices();
    let fe279 = invoices.iter().find(|i| i.id == "FE-279").unwrap();
    let mut unstructured = fe279.unstructured.clone().unwrap();
    assert_eq!(
        missing_key_fields(&unstructured),
        vec![Field::DocumentKey, Field::TaxId, Field::Total]
    );

    let fallback = FallbackExtraction::from_json(
        r#"{"tax-id": "800 111 222", "total": "500000", "invoice-number": "X", "confidence": 55}"#,
    )
    .unwrap();
    let filled = fill_missing(&mut unstructured, &fallback);
    assert_eq!(filled, vec!["tax-id", "total"]);

    let structured = RawFieldMap::from_iter([("tax-id", "800111222")]);
    let result = reconcile_invoice(Some(&structured), Some(&unstructured), &tolerant_config());
    assert_eq!(result.get(Field::TaxId).unwrap().reason, ReasonCode::Agreed);
    let total = result.get(Field::Total).unwrap();
    assert_eq!(total.unstructured, Some(NormalizedValue::Amount(Decimal::from(500000))));
    // Structured has no total, so the filled value stands alone and is taken
    // by free-text priority without review.
    assert_eq!(total.reason, ReasonCode::PriorityNonamount);
    assert_eq!(total.resolved, Some(NormalizedValue::Amount(Decimal::from(500000))));
    assert!(!total.requires_review);
}

#[test]
fn concurrent_invoices_share_one_config() {
    let config = tolerant_config();
    let invoices = load_invoices();
    let sequential: Vec<_> = invoices
        .iter()
        .map(|i| reconcile_invoice(i.structured.as_ref(), i.unstructured.as_ref(), &config))
        .collect();

    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = invoices
            .iter()
            .map(|i| {
                let config = &config;
                scope.spawn(move || {
                    reconcile_invoice(i.structured.as_ref(), i.unstructured.as_ref(), config)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}
