//! Extraction pipeline: raw provider text to validated pins.
//!
//! ```text
//! raw ─► candidate ─► repair ─► document parse ─┬─► validate ─► Extraction
//!                                  (fails) ─► partial recovery ─┘
//! ```
//!
//! The pipeline never errors. Text with no recoverable structure yields an
//! empty [`Extraction`] with [`ExtractionMethod::Nothing`], and the caller
//! decides whether that warrants a retry.

mod candidate;
mod document;
mod partial;
mod repair;
mod scan;
mod validate;

pub use candidate::extract_candidate;
pub use document::{parse_document, records_from_value, RECORDS_FIELD};
pub use partial::recover_records;
pub use repair::{repair, RepairPass, REPAIR_PASSES};
pub use validate::{
    validate_record, validate_records, RecordOutcome, Rejection, RejectionCounts, ValidatedBatch,
    REQUIRED_FIELDS,
};

use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{Pin, TimeWindow};

/// How the candidate records were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// The repaired candidate parsed as a document.
    Document,
    /// Parsing failed; records were recovered by pattern.
    Partial,
    /// No structure could be recovered.
    Nothing,
}

/// Diagnostics for one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub method: ExtractionMethod,
    /// Candidate records found before validation.
    pub candidates: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: RejectionCounts,
}

/// Validated pins plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub pins: Vec<Pin>,
    pub report: ExtractionReport,
}

impl Extraction {
    /// True when no structure at all was recovered, as opposed to records
    /// that were all rejected.
    pub fn is_unstructured(&self) -> bool {
        self.report.method == ExtractionMethod::Nothing
    }
}

/// Run the whole pipeline over a raw generation.
///
/// When `window` is set, records dated outside it are dropped.
pub fn extract_pins(raw: &str, window: Option<&TimeWindow>) -> Extraction {
    let candidate = extract_candidate(raw);
    let repaired = repair(candidate);

    let (method, records) = match parse_document(&repaired) {
        Ok(records) => (ExtractionMethod::Document, records),
        Err(e) => {
            warn!(error = %e, "repaired text did not parse, trying partial recovery");
            let records = recover_records(raw);
            if records.is_empty() {
                (ExtractionMethod::Nothing, records)
            } else {
                (ExtractionMethod::Partial, records)
            }
        }
    };

    let candidates = records.len();
    let batch = validate_records(records, window);
    let report = ExtractionReport {
        method,
        candidates,
        accepted: batch.pins.len(),
        duplicates: batch.duplicates,
        rejected: batch.rejected,
    };
    debug!(
        method = ?report.method,
        candidates,
        accepted = report.accepted,
        rejected = report.rejected.total(),
        duplicates = report.duplicates,
        "extraction complete"
    );

    Extraction {
        pins: batch.pins,
        report,
    }
}
