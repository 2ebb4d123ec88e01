//! Rule evaluation
//!
//! One function per [`CheckKind`]. A type mismatch between the resolved
//! property and the expected value is a failed check, never an error.

use compliance_core::value::display_value;
use compliance_core::{CheckKind, Resolved, ValidationRule};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single rule against a single resolved property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub passed: bool,
    /// One line, used verbatim as audit evidence
    pub explanation: String,
}

/// Evaluate a rule against the value resolved from a resource
pub fn evaluate(rule: &ValidationRule, resolved: Resolved<'_>) -> RuleEvaluation {
    let expected = &rule.expected_value;
    let passed = match resolved {
        Resolved::NotFound => false,
        Resolved::Found(actual) => match rule.check_kind {
            CheckKind::Exists => true,
            CheckKind::Equals => check_equals(actual, expected),
            CheckKind::Contains => check_contains(actual, expected),
            CheckKind::ContainsAny => check_contains_any(actual, expected),
            CheckKind::GreaterThan => compare_numbers(actual, expected, |a, e| a > e),
            CheckKind::GreaterThanOrEqual => compare_numbers(actual, expected, |a, e| a >= e),
            CheckKind::In => check_in(actual, expected),
        },
    };

    RuleEvaluation {
        passed,
        explanation: explain(rule, resolved, passed),
    }
}

fn explain(rule: &ValidationRule, resolved: Resolved<'_>, passed: bool) -> String {
    let actual = match resolved.value() {
        Some(v) => format!("{} = {}", rule.property_path, display_value(v)),
        None => format!("{} not found", rule.property_path),
    };
    let expected = if rule.check_kind.needs_expected() {
        format!("expected {} {}", rule.check_kind, display_value(&rule.expected_value))
    } else {
        format!("expected {}", rule.check_kind)
    };
    let verdict = if passed { "passed" } else { "failed" };
    format!("{}, {}, {}", actual, expected, verdict)
}

/// Comparable scalar after normalization
#[derive(Debug, Clone, Copy, PartialEq)]
enum Primitive<'a> {
    Str(&'a str),
    Num(f64),
    Bool(bool),
    Null,
}

fn primitive(value: &Value) -> Option<Primitive<'_>> {
    match value {
        Value::String(s) => Some(Primitive::Str(s)),
        Value::Number(n) => n.as_f64().map(Primitive::Num),
        Value::Bool(b) => Some(Primitive::Bool(*b)),
        Value::Null => Some(Primitive::Null),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn primitives_equal(a: Primitive<'_>, b: Primitive<'_>) -> bool {
    match (a, b) {
        (Primitive::Str(x), Primitive::Str(y)) => x == y,
        (Primitive::Num(x), Primitive::Num(y)) => x == y,
        (Primitive::Bool(x), Primitive::Bool(y)) => x == y,
        (Primitive::Null, Primitive::Null) => true,
        (Primitive::Str(s), Primitive::Num(n)) | (Primitive::Num(n), Primitive::Str(s)) => {
            s.trim().parse::<f64>().map(|p| p == n).unwrap_or(false)
        }
        (Primitive::Str(s), Primitive::Bool(b)) | (Primitive::Bool(b), Primitive::Str(s)) => {
            parse_bool(s) == Some(b)
        }
        _ => false,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Equality with scalar normalization; lists and maps compare structurally
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (primitive(actual), primitive(expected)) {
        (Some(a), Some(e)) => primitives_equal(a, e),
        _ => actual == expected,
    }
}

fn check_equals(actual: &Value, expected: &Value) -> bool {
    values_equal(actual, expected)
}

fn check_contains(actual: &Value, needle: &Value) -> bool {
    match actual {
        Value::String(haystack) => match needle {
            Value::Array(_) | Value::Object(_) | Value::Null => false,
            scalar => haystack.contains(display_value(scalar).as_str()),
        },
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => false,
    }
}

fn check_contains_any(actual: &Value, expected: &Value) -> bool {
    as_candidates(expected)
        .iter()
        .any(|candidate| check_contains(actual, candidate))
}

fn check_in(actual: &Value, expected: &Value) -> bool {
    if primitive(actual).is_none() {
        return false;
    }
    as_candidates(expected)
        .iter()
        .any(|candidate| values_equal(actual, candidate))
}

/// A list expected value as-is; any other value as a one-element list
fn as_candidates(expected: &Value) -> Vec<Value> {
    match expected {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn compare_numbers<F>(actual: &Value, expected: &Value, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
