//! `invoice-recon`: two-source invoice field reconciliation engine.
//!
//! Pure engine crate: receives the raw field maps produced by a structured
//! and an unstructured extractor, returns one verdict per header field.
//! No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod fallback;
pub mod field;
pub mod model;
pub mod normalize;

pub use config::{ReconciliationConfig, Source, SourcePriority};
pub use engine::{reconcile_batch, reconcile_invoice, BatchResult, InvoiceSources};
pub use error::ReconError;
pub use evidence::RunSummary;
pub use field::reconcile_field;
pub use model::{
    ChosenSource, Field, FieldVerdict, InvoiceReconciliation, NormalizedValue, RawFieldMap,
    RawValue, ReasonCode,
};
