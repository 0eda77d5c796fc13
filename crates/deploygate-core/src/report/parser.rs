//! Report parsing from the JSON emitted by check-only deployments.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::{lenient, noise};

/// The report could not be trusted as a validation result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReportError {
    #[error("report is not valid JSON: {0}")]
    Syntax(String),

    #[error("report root must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("report has an invalid field value: {0}")]
    InvalidField(String),
}

impl From<serde_json::Error> for MalformedReportError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => Self::InvalidField(err.to_string()),
            Category::Syntax | Category::Eof | Category::Io => Self::Syntax(err.to_string()),
        }
    }
}

/// Errors that can occur when loading a report from disk.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read report file: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Malformed(#[from] MalformedReportError),
}

/// One metadata component that failed to validate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFailure {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,

    /// "Error" or "Warning" as reported by the platform
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub line_number: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub column_number: Option<String>,
}

impl ComponentFailure {
    /// Create a failure for a file with a problem description.
    pub fn new(file_name: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            problem: Some(problem.into()),
            ..Default::default()
        }
    }

    /// The best available name for the failing component.
    pub fn label(&self) -> &str {
        self.file_name
            .as_deref()
            .or(self.full_name.as_deref())
            .unwrap_or("<unknown component>")
    }
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())?;
        match (&self.line_number, &self.column_number) {
            (Some(line), Some(column)) => write!(f, " (line {line}, column {column})")?,
            (Some(line), None) => write!(f, " (line {line})")?,
            _ => {}
        }
        write!(
            f,
            ": {}",
            self.problem.as_deref().unwrap_or("no problem description")
        )
    }
}

/// One failing unit test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFailure {
    /// Test class name
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = self.name.as_deref().unwrap_or("<unknown test>");
        match &self.method_name {
            Some(method) => write!(f, "{class}.{method}")?,
            None => write!(f, "{class}")?,
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// `result.details.runTestResult`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestResult {
    #[serde(default, deserialize_with = "lenient::num_failures", skip_serializing_if = "Option::is_none")]
    pub num_failures: Option<u64>,

    #[serde(default, deserialize_with = "lenient::num_tests_run", skip_serializing_if = "Option::is_none")]
    pub num_tests_run: Option<u64>,

    #[serde(default, deserialize_with = "lenient::one_or_many")]
    pub failures: Vec<TestFailure>,
}

/// `result.details`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployDetails {
    #[serde(default, deserialize_with = "lenient::one_or_many")]
    pub component_failures: Vec<ComponentFailure>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_test_result: Option<RunTestResult>,
}

/// Secondary status carried inside `result`.
///
/// Older CLI versions emit a numeric code, newer ones a label such as
/// `"Succeeded"` or `"Failed"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultStatus {
    Code(i64),
    Label(String),
}

impl ResultStatus {
    pub fn is_success(&self) -> bool {
        match self {
            ResultStatus::Code(code) => *code == 0,
            ResultStatus::Label(label) => label.trim().eq_ignore_ascii_case("succeeded"),
        }
    }
}

impl<'de> Deserialize<'de> for ResultStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match lenient::integer(&value) {
            Some(code) => ResultStatus::Code(code),
            None => match value {
                Value::String(label) => ResultStatus::Label(label),
                other => ResultStatus::Label(other.to_string()),
            },
        })
    }
}

/// The nested `result` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResultStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DeployDetails>,
}

impl DeployResult {
    /// Every success indicator present says success, and at least one is
    /// present. An explicit `success: false` is never outvoted by `status`.
    pub fn is_success(&self) -> bool {
        match (self.success, &self.status) {
            (None, None) => false,
            (flag, status) => {
                flag.unwrap_or(true) && status.as_ref().map_or(true, ResultStatus::is_success)
            }
        }
    }
}

/// A validation report as produced by the deploy/validate CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Top-level CLI exit indicator (0 success)
    #[serde(default, deserialize_with = "lenient::status", skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,

    /// Top-level error text when the CLI failed before producing a result
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DeployResult>,

    /// Set by the caller when there was nothing to validate
    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationReport {
    /// Parse a report from raw bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, MalformedReportError> {
        let value: Value = serde_json::from_slice(raw)?;
        Self::from_value(value)
    }

    /// Parse a report from an already decoded JSON value.
    ///
    /// A skipped report is returned without inspecting any other field.
    pub fn from_value(value: Value) -> Result<Self, MalformedReportError> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(MalformedReportError::NotAnObject {
                    found: json_kind(&other),
                })
            }
        };

        if lenient::is_true(map.get("skipped")) {
            return Ok(Self::skipped_from(&map));
        }

        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Parse a report from raw CLI stdout that may carry colour codes,
    /// warnings before the document, or text after it.
    pub fn from_cli_output(output: &str) -> Result<Self, MalformedReportError> {
        let cleaned = noise::strip_cli_noise(output);
        let mut documents = serde_json::Deserializer::from_str(&cleaned).into_iter::<Value>();

        match documents.next() {
            Some(value) => Self::from_value(value?),
            None => Err(MalformedReportError::Syntax(
                "no JSON document found in CLI output".to_string(),
            )),
        }
    }

    /// Parse a report from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let raw = fs::read(path)?;
        Ok(Self::from_slice(&raw)?)
    }

    fn skipped_from(map: &Map<String, Value>) -> Self {
        Self {
            skipped: Some(true),
            reason: map.get("reason").cloned().and_then(lenient::scalar_text),
            ..Default::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped == Some(true)
    }

    /// Top-level status reports a CLI-level error.
    pub fn is_cli_error(&self) -> bool {
        self.status.is_some_and(|status| status != 0)
    }

    pub fn details(&self) -> Option<&DeployDetails> {
        self.result.as_ref().and_then(|result| result.details.as_ref())
    }

    /// Component failures, empty when absent.
    pub fn component_failures(&self) -> &[ComponentFailure] {
        self.details()
            .map(|details| details.component_failures.as_slice())
            .unwrap_or_default()
    }

    pub fn run_test_result(&self) -> Option<&RunTestResult> {
        self.details()
            .and_then(|details| details.run_test_result.as_ref())
    }
}

impl FromStr for ValidationReport {
    type Err = MalformedReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s.as_bytes())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT: &str = r#"{
  "status": 1,
  "result": {
    "success": false,
    "status": "Failed",
    "numberComponentErrors": 2,
    "details": {
      "componentFailures": [
        {
          "fileName": "force-app/main/default/classes/Foo.cls",
          "fullName": "Foo",
          "componentType": "ApexClass",
          "problem": "Variable does not exist: bar",
          "problemType": "Error",
          "lineNumber": "12",
          "columnNumber": 9
        },
        {
          "fullName": "Account.Rating__c",
          "componentType": "CustomField",
          "problem": "Picklist value missing"
        }
      ],
      "runTestResult": {
        "numTestsRun": "14",
        "numFailures": "1",
        "failures": {
          "name": "FooTest",
          "methodName": "testBar",
          "message": "System.AssertException: Assertion Failed"
        }
      }
    }
  }
}"#;

    #[test]
    fn test_parse_full_report() {
        let report: ValidationReport = FULL_REPORT.parse().unwrap();

        assert_eq!(report.status, Some(1));
        assert!(report.is_cli_error());
        assert_eq!(report.component_failures().len(), 2);

        let tests = report.run_test_result().unwrap();
        assert_eq!(tests.num_failures, Some(1));
        assert_eq!(tests.num_tests_run, Some(14));
        assert_eq!(tests.failures.len(), 1);
        assert_eq!(tests.failures[0].method_name.as_deref(), Some("testBar"));

        let result = report.result.as_ref().unwrap();
        assert_eq!(result.status, Some(ResultStatus::Label("Failed".to_string())));
        assert!(!result.is_success());
    }

    #[test]
    fn test_component_failure_display() {
        let report: ValidationReport = FULL_REPORT.parse().unwrap();
        let failures = report.component_failures();

        assert_eq!(
            failures[0].to_string(),
            "force-app/main/default/classes/Foo.cls (line 12, column 9): Variable does not exist: bar"
        );
        assert_eq!(failures[1].to_string(), "Account.Rating__c: Picklist value missing");
    }

    #[test]
    fn test_test_failure_display() {
        let failure = TestFailure {
            name: Some("FooTest".to_string()),
            method_name: Some("testBar".to_string()),
            message: Some("boom".to_string()),
        };
        assert_eq!(failure.to_string(), "FooTest.testBar: boom");
        assert_eq!(TestFailure::default().to_string(), "<unknown test>");
    }

    #[test]
    fn test_result_status_success_forms() {
        let zero: ResultStatus = serde_json::from_str("0").unwrap();
        let zero_text: ResultStatus = serde_json::from_str("\"0\"").unwrap();
        let succeeded: ResultStatus = serde_json::from_str("\"Succeeded\"").unwrap();
        let failed: ResultStatus = serde_json::from_str("\"Failed\"").unwrap();

        assert!(zero.is_success());
        assert!(zero_text.is_success());
        assert!(succeeded.is_success());
        assert!(!failed.is_success());
        assert!(!ResultStatus::Code(1).is_success());
    }

    #[test]
    fn test_success_flag_and_status_must_agree() {
        let result = |success, status| DeployResult {
            success,
            status,
            details: None,
        };
        let zero = || Some(ResultStatus::Code(0));
        let failed = || Some(ResultStatus::Label("Failed".to_string()));

        assert!(result(Some(true), None).is_success());
        assert!(result(None, zero()).is_success());
        assert!(result(Some(true), zero()).is_success());
        assert!(!result(Some(false), zero()).is_success());
        assert!(!result(Some(false), Some(ResultStatus::Label("Succeeded".to_string()))).is_success());
        assert!(!result(Some(true), failed()).is_success());
        assert!(!result(None, None).is_success());
    }

    #[test]
    fn test_skipped_report_ignores_other_fields() {
        let report: ValidationReport =
            r#"{"skipped": true, "reason": "no_metadata", "result": {"details": {"runTestResult": {"numFailures": "lots"}}}}"#
                .parse()
                .unwrap();

        assert!(report.is_skipped());
        assert_eq!(report.reason.as_deref(), Some("no_metadata"));
        assert!(report.result.is_none());
    }

    #[test]
    fn test_non_numeric_failure_count_is_malformed() {
        let err = r#"{"result": {"details": {"runTestResult": {"numFailures": "lots"}}}}"#
            .parse::<ValidationReport>()
            .unwrap_err();
        assert!(matches!(err, MalformedReportError::InvalidField(_)));
    }

    #[test]
    fn test_non_numeric_status_is_malformed() {
        let err = r#"{"status": "broken"}"#.parse::<ValidationReport>().unwrap_err();
        assert!(matches!(err, MalformedReportError::InvalidField(_)));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            "not json".parse::<ValidationReport>(),
            Err(MalformedReportError::Syntax(_))
        ));
        assert!(matches!(
            "".parse::<ValidationReport>(),
            Err(MalformedReportError::Syntax(_))
        ));
        assert!(matches!(
            r#"{"result": {"success": tr"#.parse::<ValidationReport>(),
            Err(MalformedReportError::Syntax(_))
        ));
    }

    #[test]
    fn test_non_object_root() {
        assert_eq!(
            "[1, 2]".parse::<ValidationReport>().unwrap_err(),
            MalformedReportError::NotAnObject { found: "an array" }
        );
        assert_eq!(
            "null".parse::<ValidationReport>().unwrap_err(),
            MalformedReportError::NotAnObject { found: "null" }
        );
    }

    #[test]
    fn test_from_cli_output_strips_noise() {
        let output = "\u{1b}[33mWarning: sf update available\u{1b}[0m\n{\"result\": {\"success\": true}}\nDone.\n";
        let report = ValidationReport::from_cli_output(output).unwrap();
        assert_eq!(report.result.unwrap().success, Some(true));
    }

    #[test]
    fn test_from_cli_output_without_document() {
        assert!(matches!(
            ValidationReport::from_cli_output("Error: no org authorized\n"),
            Err(MalformedReportError::Syntax(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let err = ValidationReport::from_file("/nonexistent/deploygate/report.json").unwrap_err();
        assert!(matches!(err, ReportError::IoError(_)));
    }
}
