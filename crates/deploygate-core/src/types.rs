//! Verdict types produced by evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::report::{ComponentFailure, TestFailure};

/// Exit code for a build that may proceed.
pub const EXIT_OK: u8 = 0;

/// Exit code for a build blocked by a failed validation.
pub const EXIT_BLOCKED: u8 = 1;

/// Classification of a validation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Nothing to validate
    Skipped,
    Passed,
    Failed,
}

impl Outcome {
    /// Whether this outcome blocks the merge.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Outcome::Failed)
    }

    /// Process exit code the CI host should see.
    pub fn exit_code(&self) -> u8 {
        if self.is_blocking() {
            EXIT_BLOCKED
        } else {
            EXIT_OK
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Skipped => "SKIPPED",
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evaluator's decision for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub outcome: Outcome,

    /// Human-readable explanation, always populated
    pub reason: String,

    pub component_failure_count: usize,

    pub test_failure_count: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_failures: Vec<ComponentFailure>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_failures: Vec<TestFailure>,
}

impl Verdict {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::without_failures(Outcome::Skipped, reason)
    }

    pub fn passed(reason: impl Into<String>) -> Self {
        Self::without_failures(Outcome::Passed, reason)
    }

    /// A failed verdict carrying the failures that caused it.
    pub fn failed(
        reason: impl Into<String>,
        component_failures: Vec<ComponentFailure>,
        test_failures: Vec<TestFailure>,
        test_failure_count: u64,
    ) -> Self {
        Self {
            outcome: Outcome::Failed,
            reason: reason.into(),
            component_failure_count: component_failures.len(),
            test_failure_count,
            component_failures,
            test_failures,
        }
    }

    fn without_failures(outcome: Outcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
            component_failure_count: 0,
            test_failure_count: 0,
            component_failures: Vec::new(),
            test_failures: Vec::new(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.outcome.is_blocking()
    }

    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Skipped.exit_code(), EXIT_OK);
        assert_eq!(Outcome::Passed.exit_code(), EXIT_OK);
        assert_eq!(Outcome::Failed.exit_code(), EXIT_BLOCKED);
    }

    #[test]
    fn test_failed_counts_components() {
        let verdict = Verdict::failed(
            "broken",
            vec![ComponentFailure::new("Foo.cls", "Missing field")],
            vec![],
            3,
        );
        assert_eq!(verdict.component_failure_count, 1);
        assert_eq!(verdict.test_failure_count, 3);
        assert!(verdict.is_blocking());
    }

    #[test]
    fn test_serialized_shape() {
        let verdict = Verdict::passed("ok");
        let json = serde_json::to_value(&verdict).unwrap();

        assert_eq!(json["outcome"], "passed");
        assert_eq!(json["componentFailureCount"], 0);
        assert_eq!(json["testFailureCount"], 0);
        assert!(json.get("componentFailures").is_none());
    }
}
