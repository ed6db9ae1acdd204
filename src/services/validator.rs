//! Assertion evaluation against the response document.
//!
//! A rule never aborts anything: broken paths, bad patterns and type
//! mismatches all come back as failed outcomes with a message, so one bad
//! assertion cannot take the whole run down.

use regex::Regex;
use serde_json::Value;

use crate::models::{Operator, ValidationOutcome, ValidationRule};
use crate::services::document;

/// Evaluate every rule in order against the document
pub fn run_validations(document: &Value, rules: &[ValidationRule]) -> Vec<ValidationOutcome> {
    rules.iter().map(|rule| check_rule(document, rule)).collect()
}

fn check_rule(doc: &Value, rule: &ValidationRule) -> ValidationOutcome {
    let actual = match document::lookup_path(doc, &rule.field) {
        Ok(actual) => actual,
        Err(err) => {
            return ValidationOutcome {
                rule: rule.clone(),
                success: false,
                actual: None,
                message: Some(err.to_string()),
            }
        }
    };

    let (success, message) = evaluate(rule.operator, actual.as_ref(), &rule.expected);
    ValidationOutcome {
        rule: rule.clone(),
        success,
        actual,
        message,
    }
}

fn evaluate(operator: Operator, actual: Option<&Value>, expected: &Value) -> (bool, Option<String>) {
    // Presence checks look only at whether the path resolved; a JSON null
    // sitting at the path still counts as present
    if operator == Operator::Exists {
        return (actual.is_some(), None);
    }
    if operator == Operator::NotExists {
        return (actual.is_none(), None);
    }

    let Some(actual) = actual else {
        return (
            false,
            Some("path not found in response document".to_string()),
        );
    };

    match operator {
        Operator::Eq => {
            let ok = lenient_eq(actual, expected);
            let message = (!ok).then(|| format!("expected {}, got {}", expected, actual));
            (ok, message)
        }
        Operator::Ne => {
            let ok = !lenient_eq(actual, expected);
            let message = (!ok).then(|| format!("expected a value other than {}", expected));
            (ok, message)
        }
        Operator::Contains => match contains(actual, expected) {
            Ok(true) => (true, None),
            Ok(false) => (false, Some(format!("{} does not contain {}", actual, expected))),
            Err(message) => (false, Some(message)),
        },
        Operator::NotContains => match contains(actual, expected) {
            Ok(false) => (true, None),
            Ok(true) => (false, Some(format!("{} contains {}", actual, expected))),
            Err(message) => (false, Some(message)),
        },
        Operator::Gt => ordered(actual, expected, "gt", |a, b| a > b),
        Operator::Lt => ordered(actual, expected, "lt", |a, b| a < b),
        Operator::Gte => ordered(actual, expected, "gte", |a, b| a >= b),
        Operator::Lte => ordered(actual, expected, "lte", |a, b| a <= b),
        Operator::Regex => regex_match(actual, expected),
        Operator::StartsWith => {
            let (text, prefix) = (as_text(actual), as_text(expected));
            let ok = text.starts_with(&prefix);
            let message = (!ok).then(|| format!("'{}' does not start with '{}'", text, prefix));
            (ok, message)
        }
        Operator::EndsWith => {
            let (text, suffix) = (as_text(actual), as_text(expected));
            let ok = text.ends_with(&suffix);
            let message = (!ok).then(|| format!("'{}' does not end with '{}'", text, suffix));
            (ok, message)
        }
        Operator::LengthEq => length_eq(actual, expected),
        // Handled above
        Operator::Exists | Operator::NotExists => (false, None),
    }
}

/// Equality with scalar coercion: `"200"` equals `200`; arrays and objects
/// compare structurally only.
fn lenient_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    match (a, b) {
        (Value::Object(_) | Value::Array(_), _) => false,
        (_, Value::Object(_) | Value::Array(_)) => false,
        _ => as_text(a) == as_text(b),
    }
}

fn contains(actual: &Value, expected: &Value) -> Result<bool, String> {
    match actual {
        Value::String(s) => Ok(s.contains(&as_text(expected))),
        Value::Array(items) => Ok(items.iter().any(|item| lenient_eq(item, expected))),
        Value::Object(map) => Ok(map.contains_key(&as_text(expected))),
        other => Err(format!(
            "contains requires a string, array or object, got {}",
            other
        )),
    }
}

fn ordered(
    actual: &Value,
    expected: &Value,
    name: &str,
    cmp: impl Fn(f64, f64) -> bool,
) -> (bool, Option<String>) {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => {
            let ok = cmp(a, b);
            let message = (!ok).then(|| format!("{} is not {} {}", a, name, b));
            (ok, message)
        }
        _ => (
            false,
            Some(format!(
                "cannot order {} against {} numerically",
                actual, expected
            )),
        ),
    }
}

fn regex_match(actual: &Value, expected: &Value) -> (bool, Option<String>) {
    let Some(pattern) = expected.as_str() else {
        return (false, Some("regex operator expects a string pattern".to_string()));
    };

    match Regex::new(pattern) {
        Ok(re) => {
            let text = as_text(actual);
            let ok = re.is_match(&text);
            let message = (!ok).then(|| format!("'{}' does not match /{}/", text, pattern));
            (ok, message)
        }
        Err(err) => (false, Some(format!("invalid regex: {}", err))),
    }
}

fn length_eq(actual: &Value, expected: &Value) -> (bool, Option<String>) {
    let length = match actual {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return (
                false,
                Some(format!("{} has no length to compare", other)),
            )
        }
    };

    match as_number(expected) {
        Some(want) => {
            let ok = length as f64 == want;
            let message = (!ok).then(|| format!("length is {}, expected {}", length, expected));
            (ok, message)
        }
        None => (
            false,
            Some(format!("length_eq expects a number, got {}", expected)),
        ),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(field: &str, operator: Operator, expected: Value) -> ValidationRule {
        ValidationRule {
            field: field.to_string(),
            operator,
            expected,
            description: None,
        }
    }

    fn doc() -> Value {
        json!({
            "status_code": 200,
            "response_time": 154,
            "headers": {"content-type": "application/json; charset=utf-8"},
            "body": {
                "id": "a1b2",
                "count": "12",
                "nullable": null,
                "tags": ["alpha", "beta"],
                "user": {"name": "jo", "age": 30}
            }
        })
    }

    fn check(field: &str, operator: Operator, expected: Value) -> ValidationOutcome {
        check_rule(&doc(), &rule(field, operator, expected))
    }

    #[test]
    fn eq_coerces_scalar_types() {
        assert!(check("status_code", Operator::Eq, json!("200")).success);
        assert!(check("body.count", Operator::Eq, json!(12)).success);
        assert!(!check("status_code", Operator::Eq, json!(404)).success);
    }

    #[test]
    fn eq_on_structures_is_exact() {
        assert!(check("body.tags", Operator::Eq, json!(["alpha", "beta"])).success);
        assert!(!check("body.tags", Operator::Eq, json!(["beta", "alpha"])).success);
    }

    #[test]
    fn failed_eq_reports_both_sides() {
        let outcome = check("status_code", Operator::Eq, json!(500));
        assert!(!outcome.success);
        assert_eq!(outcome.actual, Some(json!(200)));
        assert!(outcome.message.unwrap().contains("500"));
    }

    #[test]
    fn contains_handles_strings_arrays_and_objects() {
        assert!(check("headers.Content-Type", Operator::Contains, json!("json")).success);
        assert!(check("body.tags", Operator::Contains, json!("beta")).success);
        assert!(check("body.user", Operator::Contains, json!("age")).success);
        assert!(!check("body.tags", Operator::Contains, json!("gamma")).success);
    }

    #[test]
    fn not_contains_inverts() {
        assert!(check("body.tags", Operator::NotContains, json!("gamma")).success);
        assert!(!check("body.tags", Operator::NotContains, json!("alpha")).success);
    }

    #[test]
    fn ordering_coerces_numeric_strings() {
        assert!(check("body.count", Operator::Gt, json!(10)).success);
        assert!(check("body.count", Operator::Lte, json!("12")).success);
        assert!(check("response_time", Operator::Lt, json!(1000)).success);
        assert!(!check("response_time", Operator::Gte, json!(200)).success);
    }

    #[test]
    fn ordering_non_numbers_fails_with_message() {
        let outcome = check("body.id", Operator::Gt, json!(5));
        assert!(!outcome.success);
        assert!(outcome.message.is_some());
    }

    #[test]
    fn regex_matches_stringified_actual() {
        assert!(check("body.id", Operator::Regex, json!("^[a-z0-9]+$")).success);
        assert!(check("status_code", Operator::Regex, json!("^2..$")).success);
    }

    #[test]
    fn invalid_regex_fails_the_rule_only() {
        let outcome = check("body.id", Operator::Regex, json!("[unclosed"));
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("invalid regex"));
    }

    #[test]
    fn exists_counts_null_as_present() {
        assert!(check("body.nullable", Operator::Exists, Value::Null).success);
        assert!(check("body.user.name", Operator::Exists, Value::Null).success);
        assert!(!check("body.ghost", Operator::Exists, Value::Null).success);
        assert!(check("body.ghost", Operator::NotExists, Value::Null).success);
    }

    #[test]
    fn missing_path_fails_value_operators() {
        let outcome = check("body.ghost", Operator::Eq, json!(1));
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("not found"));
    }

    #[test]
    fn affix_operators_compare_text() {
        assert!(check("body.id", Operator::StartsWith, json!("a1")).success);
        assert!(check("headers.content-type", Operator::EndsWith, json!("utf-8")).success);
        assert!(!check("body.id", Operator::EndsWith, json!("zz")).success);
    }

    #[test]
    fn length_eq_measures_strings_arrays_objects() {
        assert!(check("body.id", Operator::LengthEq, json!(4)).success);
        assert!(check("body.tags", Operator::LengthEq, json!(2)).success);
        assert!(check("body.user", Operator::LengthEq, json!("2")).success);
        assert!(!check("body.tags", Operator::LengthEq, json!(3)).success);

        let outcome = check("status_code", Operator::LengthEq, json!(3));
        assert!(!outcome.success);
    }

    #[test]
    fn broken_field_path_fails_without_aborting() {
        let outcome = check("body.tags[x]", Operator::Eq, json!(1));
        assert!(!outcome.success);
        assert!(outcome.message.is_some());
    }

    #[test]
    fn rules_evaluate_in_order() {
        let outcomes = run_validations(
            &doc(),
            &[
                rule("status_code", Operator::Eq, json!(200)),
                rule("body.ghost", Operator::Exists, Value::Null),
                rule("body.count", Operator::Gte, json!(12)),
            ],
        );

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[2].success);
    }
}
