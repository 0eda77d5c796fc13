//! Tolerant deserializers for report fields whose JSON type drifts between
//! CLI versions.
//!
//! Text fields accept any scalar. Numeric fields accept integers or numeric
//! strings and reject everything else, so a garbled count can never be read
//! as zero. A number and its quoted form always read the same.

use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_json::{Number, Value};

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Render a scalar as text. Objects, arrays and null yield `None`.
pub(crate) fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A JSON number, or a string holding one.
fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Float form of a number with no fractional part, within exact range.
fn integral_float(n: &Number) -> Option<f64> {
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT)
}

/// Interpret a JSON value as an integer, if it unambiguously is one.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    let n = number(value)?;
    n.as_i64().or_else(|| integral_float(&n).map(|f| f as i64))
}

/// Interpret a JSON value as a count, explaining why it is not one.
pub(crate) fn count(value: &Value) -> Result<u64, &'static str> {
    let n = number(value).ok_or("must be a non-negative integer")?;
    if let Some(exact) = n.as_u64() {
        return Ok(exact);
    }
    if n.is_i64() {
        return Err("must not be negative");
    }
    match integral_float(&n) {
        Some(f) if f >= 0.0 => Ok(f as u64),
        Some(_) => Err("must not be negative"),
        None => Err("must be a non-negative integer"),
    }
}

/// Whether a `skipped`-style flag is set to true.
pub(crate) fn is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_text))
}

/// Boolean that may arrive as `true` or `"true"`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!(
                "expected a boolean flag, found \"{s}\""
            ))),
        },
        Some(other) => Err(D::Error::custom(format!(
            "expected a boolean flag, found {other}"
        ))),
    }
}

/// A single object or a sequence of them, normalized to a sequence.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<Item> {
        Many(Vec<Item>),
        One(Item),
    }

    match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(OneOrMany::Many(items)) => Ok(items),
        Some(OneOrMany::One(item)) => Ok(vec![item]),
    }
}

pub(crate) fn status<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    integer_field(deserializer, "status")
}

pub(crate) fn num_failures<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    count_field(deserializer, "numFailures")
}

pub(crate) fn num_tests_run<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    count_field(deserializer, "numTestsRun")
}

fn integer_field<'de, D>(deserializer: D, field: &str) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => integer(&value).map(Some).ok_or_else(|| {
            D::Error::custom(format!("`{field}` must be an integer, found {value}"))
        }),
    }
}

fn count_field<'de, D>(deserializer: D, field: &str) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => count(&value)
            .map(Some)
            .map_err(|problem| D::Error::custom(format!("`{field}` {problem}, found {value}"))),
    }
}
