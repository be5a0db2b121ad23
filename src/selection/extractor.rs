//! Recovery of a `{name, arguments}` selection from raw model output.
//!
//! Models that cannot be held to a schema tend to wrap the object in prose
//! ("Sure! {...} Let me know..."). The extractor tries, in order:
//!
//! 1. an already-structured object, used as is
//! 2. a strict parse of the whole text
//! 3. the first balanced `{...}` substring that parses as JSON
//!
//! Anything else is an [`DispatchError::Extraction`]; no partial or guessed
//! selection is ever returned.

use crate::error::{DispatchError, DispatchResult};
use crate::selection::types::{ModelOutput, Selection};
use serde_json::{Map, Value};

pub fn extract_selection(output: &ModelOutput) -> DispatchResult<Selection> {
    let raw_output = output.to_raw_string();

    let value = match output {
        ModelOutput::Structured(value @ Value::Object(_)) => value.clone(),
        // Some backends hand back the JSON as a string even in structured mode
        ModelOutput::Structured(Value::String(text)) | ModelOutput::Text(text) => {
            parse_object(text).ok_or_else(|| DispatchError::Extraction {
                reason: "no JSON object found in model output".into(),
                raw_output: raw_output.clone(),
            })?
        }
        ModelOutput::Structured(other) => {
            return Err(DispatchError::Extraction {
                reason: format!("structured output is not an object: {}", json_kind(other)),
                raw_output,
            })
        }
    };

    selection_from_value(value).map_err(|reason| DispatchError::Extraction { reason, raw_output })
}

/// Strict parse first, then the balanced-delimiter scan.
fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => first_json_object(text),
    }
}

/// Find the first substring that is a balanced, well-formed JSON object.
///
/// Candidates are tried in order of their opening brace; the outermost
/// object at the earliest position wins. A balanced span that fails to
/// parse (e.g. `{like this}` in prose) is skipped.
pub fn first_json_object(text: &str) -> Option<Value> {
    let starts = text
        .char_indices()
        .filter(|&(_, ch)| ch == '{')
        .map(|(idx, _)| idx);

    for start in starts {
        let Some(end) = balanced_object_end(&text[start..]) else {
            continue;
        };
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..start + end]) {
            return Some(value);
        }
    }

    None
}

/// Byte length of the object that opens at `input[0]`, tracking nesting depth.
///
/// Braces inside string literals (and escaped quotes within them) do not count.
fn balanced_object_end(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in input.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Pull `name` and `arguments` out of a parsed object.
///
/// `arguments` may be an object, `null` (no arguments), or a string holding
/// a JSON object, which some models emit for nested payloads.
fn selection_from_value(value: Value) -> Result<Selection, String> {
    let Value::Object(mut object) = value else {
        return Err("parsed value is not an object".into());
    };

    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        Some(other) => return Err(format!("'name' must be a non-empty string, got {}", json_kind(&other))),
        None => return Err("object has no 'name' key".into()),
    };

    let arguments = match object.remove("arguments") {
        Some(Value::Object(arguments)) => arguments,
        Some(Value::Null) => Map::new(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(arguments)) => arguments,
            _ => return Err("'arguments' string does not hold a JSON object".into()),
        },
        Some(other) => return Err(format!("'arguments' must be an object, got {}", json_kind(&other))),
        None => return Err("object has no 'arguments' key".into()),
    };

    Ok(Selection { name, arguments })
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
