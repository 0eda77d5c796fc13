//! Human-readable rendering of verdicts for console logs and archived
//! build artifacts.

use std::fmt::Write as _;

use crate::types::{Outcome, Verdict};

/// Render a verdict, listing at most `max_listed` entries per failure list.
pub fn render_summary(verdict: &Verdict, max_listed: usize) -> String {
    let mut out = headline(verdict);

    if verdict.component_failure_count > 0 {
        let _ = write!(out, "\nComponent failures ({}):", verdict.component_failure_count);
        push_listed(&mut out, &verdict.component_failures, max_listed);
    }

    if verdict.test_failure_count > 0 {
        let _ = write!(out, "\nTest failures ({}):", verdict.test_failure_count);
        push_listed(&mut out, &verdict.test_failures, max_listed);

        let unlisted = verdict
            .test_failure_count
            .saturating_sub(verdict.test_failures.len() as u64);
        if verdict.test_failures.is_empty() {
            out.push_str("\n  (no per-test details in report)");
        } else if unlisted > 0 {
            let _ = write!(out, "\n  ({} without details)", unlisted);
        }
    }

    out
}

fn headline(verdict: &Verdict) -> String {
    let has_counts = verdict.component_failure_count > 0 || verdict.test_failure_count > 0;
    match verdict.outcome {
        Outcome::Failed if has_counts => format!(
            "{}: {} component failure(s), {} test failure(s)",
            verdict.outcome, verdict.component_failure_count, verdict.test_failure_count
        ),
        _ => format!("{}: {}", verdict.outcome, verdict.reason),
    }
}

fn push_listed<T: std::fmt::Display>(out: &mut String, items: &[T], max_listed: usize) {
    for item in items.iter().take(max_listed) {
        let _ = write!(out, "\n  - {}", item);
    }
    if items.len() > max_listed {
        let _ = write!(out, "\n  ... and {} more", items.len() - max_listed);
    }
}

impl Verdict {
    /// Full summary with every failure listed.
    pub fn summary(&self) -> String {
        render_summary(self, usize::MAX)
    }
}
