//! Evaluator: classifies a validation report into a verdict.
//!
//! Rules are applied in order, first match wins:
//! 1. `skipped` set → SKIPPED
//! 2. CLI-level error status and no `result.details` → FAILED
//! 3. not successful, any component failure, or any test failure → FAILED
//! 4. Otherwise → PASSED
//!
//! Anything the report leaves unsaid counts against it: a missing `result`
//! is not a success.

use tracing::{debug, info};

use crate::report::{ComponentFailure, DeployResult, TestFailure, ValidationReport};
use crate::types::Verdict;

/// Reason used when a skipped report does not carry one.
pub const DEFAULT_SKIP_REASON: &str = "no deployable metadata";

/// Reason used when the CLI failed without a message.
pub const CLI_ERROR_WITHOUT_DETAILS: &str = "CLI error with no details";

/// Stateless report evaluator.
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Classify a parsed report.
    pub fn evaluate(&self, report: &ValidationReport) -> Verdict {
        let verdict = self.decide(report);
        info!(
            outcome = %verdict.outcome,
            component_failures = verdict.component_failure_count,
            test_failures = verdict.test_failure_count,
            "validation report evaluated"
        );
        verdict
    }

    fn decide(&self, report: &ValidationReport) -> Verdict {
        // Rule 1: skipped short-circuits every failure check
        if report.is_skipped() {
            let reason = non_blank(report.reason.as_deref()).unwrap_or(DEFAULT_SKIP_REASON);
            debug!(reason, "report marked as skipped");
            return Verdict::skipped(reason);
        }

        // Rule 2: the CLI failed before producing structured details
        if report.is_cli_error() && report.details().is_none() {
            let reason = non_blank(report.message.as_deref()).unwrap_or(CLI_ERROR_WITHOUT_DETAILS);
            debug!(status = ?report.status, "CLI error without result details");
            return Verdict::failed(reason, Vec::new(), Vec::new(), 0);
        }

        // Rule 3: inspect the structured result
        let success = report.result.as_ref().is_some_and(DeployResult::is_success);
        let component_failures = report.component_failures().to_vec();
        let (test_failure_count, test_failures) = self.collect_test_failures(report);

        debug!(
            success,
            component_failures = component_failures.len(),
            test_failures = test_failure_count,
            "structured result inspected"
        );

        if !success || !component_failures.is_empty() || test_failure_count > 0 {
            let reason = self.build_failure_reason(
                report,
                success,
                &component_failures,
                test_failure_count,
            );
            return Verdict::failed(reason, component_failures, test_failures, test_failure_count);
        }

        // Rule 4
        Verdict::passed(self.build_pass_reason(report))
    }

    /// Failing test count and the reported failure entries.
    ///
    /// The count is never lower than the number of listed failures.
    fn collect_test_failures(&self, report: &ValidationReport) -> (u64, Vec<TestFailure>) {
        match report.run_test_result() {
            Some(tests) => {
                let listed = tests.failures.len() as u64;
                let count = tests.num_failures.unwrap_or(0).max(listed);
                (count, tests.failures.clone())
            }
            None => (0, Vec::new()),
        }
    }

    /// States all three contributing values and enumerates component failures.
    fn build_failure_reason(
        &self,
        report: &ValidationReport,
        success: bool,
        component_failures: &[ComponentFailure],
        test_failure_count: u64,
    ) -> String {
        let mut reason = format!(
            "validation failed: success={}, component failures={}, test failures={}",
            success,
            component_failures.len(),
            test_failure_count
        );

        if report.result.is_none() {
            reason.push_str(" (report has no result)");
        }

        if !component_failures.is_empty() {
            let listed: Vec<String> = component_failures.iter().map(ToString::to_string).collect();
            reason.push_str(" [");
            reason.push_str(&listed.join("; "));
            reason.push(']');
        }

        reason
    }

    fn build_pass_reason(&self, report: &ValidationReport) -> String {
        match report.run_test_result().and_then(|tests| tests.num_tests_run) {
            Some(0) | None => "validation succeeded with no component or test failures".to_string(),
            Some(run) => format!("validation succeeded; {} tests run, none failed", run),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}
