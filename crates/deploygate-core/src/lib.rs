//! # deploygate-core
//!
//! Deterministic evaluation of check-only deployment validation reports.
//!
//! This crate answers one question for a CI gate: may this change merge?
//! It reads the JSON report written by a deploy/validate CLI and classifies
//! it as SKIPPED, PASSED or FAILED.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same bytes always produce the same verdict
//! 2. **Pure**: No I/O, no shared state, safe to call concurrently
//! 3. **Blocking on ambiguity**: A report that cannot be read unambiguously
//!    is an error, never a pass
//!
//! ## Example
//!
//! ```rust
//! use deploygate_core::{evaluate, Outcome};
//!
//! let verdict = evaluate(br#"{"result": {"success": true, "details": {}}}"#)?;
//! assert_eq!(verdict.outcome, Outcome::Passed);
//!
//! let verdict = evaluate(br#"{"status": 1, "message": "auth error"}"#)?;
//! assert_eq!(verdict.outcome, Outcome::Failed);
//! assert_eq!(verdict.reason, "auth error");
//! # Ok::<(), deploygate_core::MalformedReportError>(())
//! ```

pub mod evaluator;
pub mod report;
pub mod summary;
pub mod types;

// Re-export main types at crate root
pub use evaluator::{Evaluator, CLI_ERROR_WITHOUT_DETAILS, DEFAULT_SKIP_REASON};
pub use report::{
    strip_cli_noise, ComponentFailure, MalformedReportError, ReportError, TestFailure,
    ValidationReport,
};
pub use summary::render_summary;
pub use types::{Outcome, Verdict, EXIT_BLOCKED, EXIT_OK};

/// Evaluate a raw JSON validation report.
///
/// This is the main entry point for deploygate evaluation.
///
/// # Errors
///
/// Returns `MalformedReportError` when the input is not JSON, its root is
/// not an object, or a numeric field holds a non-numeric value. Callers must
/// treat that as a blocked build.
pub fn evaluate(raw: &[u8]) -> Result<Verdict, MalformedReportError> {
    let report = ValidationReport::from_slice(raw)?;
    Ok(evaluate_report(&report))
}

/// Evaluate captured CLI stdout that may surround the report with noise.
pub fn evaluate_cli_output(output: &str) -> Result<Verdict, MalformedReportError> {
    let report = ValidationReport::from_cli_output(output)?;
    Ok(evaluate_report(&report))
}

/// Evaluate an already parsed report.
pub fn evaluate_report(report: &ValidationReport) -> Verdict {
    Evaluator::new().evaluate(report)
}
