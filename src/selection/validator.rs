use crate::catalog::{ParamType, ParameterSpec, ToolCatalog};
use crate::error::{DispatchError, DispatchResult};
use crate::selection::extractor::json_kind;
use crate::selection::types::Selection;
use serde_json::{Number, Value};

/// Check a candidate selection against the catalog before anything is invoked.
///
/// # Checks, in order
/// 1. The tool name is a catalog key (`UnknownTool`)
/// 2. Every required parameter is present (`MissingArguments`, naming all of them)
/// 3. Each declared argument is type-compatible (`TypeMismatch`, first offender
///    in declaration order)
///
/// Coercion is permissive but explicit: numeric strings are accepted for
/// `number`/`integer`, `"true"`/`"false"` for `boolean`, and the returned
/// selection carries the coerced values. Keys the tool does not declare pass
/// through unchanged.
pub fn validate_selection(selection: Selection, catalog: &ToolCatalog) -> DispatchResult<Selection> {
    let Some(tool) = catalog.get(&selection.name) else {
        return Err(DispatchError::UnknownTool {
            available: catalog.names(),
            selection,
        });
    };

    let missing: Vec<String> = tool
        .required_parameters()
        .filter(|p| !selection.arguments.contains_key(&p.name))
        .map(|p| p.name.clone())
        .collect();

    if !missing.is_empty() {
        return Err(DispatchError::MissingArguments { selection, missing });
    }

    let mut coerced = Vec::new();
    for spec in &tool.parameters {
        let Some(value) = selection.arguments.get(&spec.name) else {
            continue;
        };
        match coerce_argument(value, spec) {
            Some(new_value) => {
                if &new_value != value {
                    coerced.push((spec.name.clone(), new_value));
                }
            }
            None => {
                return Err(DispatchError::TypeMismatch {
                    parameter: spec.name.clone(),
                    expected: spec.param_type,
                    found: json_kind(value).to_string(),
                    selection,
                });
            }
        }
    }

    let mut selection = selection;
    for (name, value) in coerced {
        selection.arguments.insert(name, value);
    }

    Ok(selection)
}

/// Return the value to send for `spec`, or `None` if it is incompatible.
fn coerce_argument(value: &Value, spec: &ParameterSpec) -> Option<Value> {
    match (spec.param_type, value) {
        (_, Value::Null) if spec.nullable => Some(Value::Null),
        (ParamType::Any, _) => Some(value.clone()),
        (ParamType::String, Value::String(_))
        | (ParamType::Number, Value::Number(_))
        | (ParamType::Boolean, Value::Bool(_))
        | (ParamType::Object, Value::Object(_))
        | (ParamType::Array, Value::Array(_)) => Some(value.clone()),
        (ParamType::Number, Value::String(s)) => parse_number(s),
        (ParamType::Integer, Value::Number(n)) => integer_from_number(n),
        (ParamType::Integer, Value::String(s)) => parse_integer(s),
        (ParamType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(int) = s.parse::<i64>() {
        return Some(Value::from(int));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_integer(s: &str) -> Option<Value> {
    let s = s.trim();
    if let Ok(int) = s.parse::<i64>() {
        return Some(Value::from(int));
    }
    s.parse::<f64>()
        .ok()
        .and_then(|f| Number::from_f64(f).and_then(|n| integer_from_number(&n)))
}

/// Integers, and floats with no fractional part (`7.0` → `7`).
fn integer_from_number(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}
