//! Validation report parsing.
//!
//! Reports are JSON documents written by a check-only deployment. Field
//! presence and types vary across CLI versions; this module normalizes them
//! into typed values and rejects anything it cannot read unambiguously.

mod lenient;
mod noise;
mod parser;

pub use noise::strip_cli_noise;
pub use parser::{
    ComponentFailure, DeployDetails, DeployResult, MalformedReportError, ReportError,
    ResultStatus, RunTestResult, TestFailure, ValidationReport,
};
