//! Enablement expressions for post-submission actions.
//!
//! A deliberately small grammar evaluated against the flattened encounter
//! data of a successful submission:
//!
//! - `true` / `false`
//! - `!<expr>` negation
//! - `isEmpty(<path>)`
//! - `<path> == <literal>` and `<path> != <literal>`
//!
//! Paths are dot-separated keys resolved against the first encounter entry;
//! literals are single- or double-quoted strings, numbers, or booleans.

use serde_json::Value;

use crate::error::{FormError, FormResult};

/// Evaluates an enablement expression against flattened encounter data.
pub fn evaluate(expression: &str, encounters: &[Value]) -> FormResult<bool> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(error(expression, "expression is empty"));
    }

    if let Some(inner) = trimmed.strip_prefix('!') {
        return Ok(!evaluate(inner, encounters)?);
    }

    match trimmed {
        "true" => return Ok(true),
        "false" => return Ok(false),
        _ => {}
    }

    if let Some(path) = trimmed
        .strip_prefix("isEmpty(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let resolved = lookup(encounters, path.trim());
        return Ok(match resolved {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        });
    }

    if let Some((path, literal)) = split_comparison(trimmed, "==") {
        return Ok(compare(expression, encounters, path, literal)?);
    }
    if let Some((path, literal)) = split_comparison(trimmed, "!=") {
        return Ok(!compare(expression, encounters, path, literal)?);
    }

    Err(error(expression, "unsupported expression form"))
}

fn error(expression: &str, reason: &str) -> FormError {
    FormError::Expression {
        expression: expression.to_owned(),
        reason: reason.to_owned(),
    }
}

fn split_comparison<'a>(input: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let (lhs, rhs) = input.split_once(op)?;
    Some((lhs.trim(), rhs.trim()))
}

fn compare(expression: &str, encounters: &[Value], path: &str, literal: &str) -> FormResult<bool> {
    let expected = parse_literal(literal).ok_or_else(|| error(expression, "invalid literal"))?;
    Ok(lookup(encounters, path) == Some(&expected))
}

fn parse_literal(literal: &str) -> Option<Value> {
    let literal = literal.trim();
    if let Some(inner) = strip_quotes(literal) {
        return Some(Value::String(inner.to_owned()));
    }
    match literal {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    if let Ok(int) = literal.parse::<i64>() {
        return Some(Value::from(int));
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn strip_quotes(literal: &str) -> Option<&str> {
    literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .or_else(|| {
            literal
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
        })
}

/// Resolves a dot-separated path against the first encounter entry.
fn lookup<'a>(encounters: &'a [Value], path: &str) -> Option<&'a Value> {
    let mut current = encounters.first()?;
    for key in path.split('.') {
        current = current.get(key)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encounters() -> Vec<Value> {
        vec![json!({
            "uuid": "e1",
            "obs": [{ "concept": "weight" }],
            "visit": { "status": "active", "count": 2 },
            "meta": {}
        })]
    }

    #[test]
    fn boolean_literals_evaluate_directly() {
        assert!(evaluate("true", &encounters()).expect("evaluates"));
        assert!(!evaluate("false", &encounters()).expect("evaluates"));
    }

    #[test]
    fn negation_inverts_the_inner_expression() {
        assert!(!evaluate("!true", &encounters()).expect("evaluates"));
        assert!(evaluate("!isEmpty(obs)", &encounters()).expect("evaluates"));
    }

    #[test]
    fn is_empty_handles_missing_paths() {
        assert!(evaluate("isEmpty(unknown.path)", &encounters()).expect("evaluates"));
        assert!(!evaluate("isEmpty(uuid)", &encounters()).expect("evaluates"));
    }

    #[test]
    fn is_empty_inspects_object_contents() {
        assert!(evaluate("isEmpty(meta)", &encounters()).expect("evaluates"));
        assert!(!evaluate("isEmpty(visit)", &encounters()).expect("evaluates"));
    }

    #[test]
    fn equality_compares_nested_paths() {
        assert!(evaluate("visit.status == 'active'", &encounters()).expect("evaluates"));
        assert!(evaluate("visit.status != 'closed'", &encounters()).expect("evaluates"));
        assert!(evaluate("visit.count == 2", &encounters()).expect("evaluates"));
    }

    #[test]
    fn no_encounters_resolves_paths_to_nothing() {
        assert!(evaluate("isEmpty(uuid)", &[]).expect("evaluates"));
        assert!(!evaluate("uuid == 'e1'", &[]).expect("evaluates"));
    }

    #[test]
    fn unsupported_forms_are_rejected() {
        let err = evaluate("visit.count > 1", &encounters()).expect_err("expected failure");
        assert!(matches!(err, FormError::Expression { .. }));
    }

    #[test]
    fn invalid_literal_is_rejected() {
        let err = evaluate("uuid == e1", &encounters()).expect_err("expected failure");
        assert!(matches!(err, FormError::Expression { ref reason, .. } if reason == "invalid literal"));
    }
}
