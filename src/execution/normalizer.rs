//! Rendering of heterogeneous tool results into display lines.

use crate::error::{DispatchError, DispatchResult};
use crate::execution::types::{ContentItem, ResultPayload};
use serde_json::Value;

/// Turn a result payload into an ordered list of display strings.
///
/// # Rules
/// 1. If any text items exist, return exactly their contents in payload
///    order; structured items are ignored.
/// 2. Else, if there is a single structured item, pretty-print it as the
///    only line.
/// 3. Else, pretty-print the payload itself (the raw result object when the
///    transport kept one).
///
/// An empty payload has nothing to show and is reported as
/// [`DispatchError::UnrepresentableResult`] rather than returning no lines.
pub fn normalize_result(payload: &ResultPayload) -> DispatchResult<Vec<String>> {
    let texts: Vec<String> = payload
        .items
        .iter()
        .filter_map(|item| match item {
            ContentItem::Text { text } => Some(text.clone()),
            ContentItem::Structured { .. } => None,
        })
        .collect();

    if !texts.is_empty() {
        return Ok(texts);
    }

    if let [ContentItem::Structured { value }] = payload.items.as_slice() {
        return pretty(value, payload).map(|line| vec![line]);
    }

    if payload.is_empty() {
        return Err(unrepresentable(payload));
    }

    match &payload.raw {
        Some(raw) if !raw.is_null() => pretty(raw, payload).map(|line| vec![line]),
        _ => {
            let whole = serde_json::to_value(payload).map_err(|_| unrepresentable(payload))?;
            pretty(&whole, payload).map(|line| vec![line])
        }
    }
}

fn pretty(value: &Value, payload: &ResultPayload) -> DispatchResult<String> {
    serde_json::to_string_pretty(value).map_err(|_| unrepresentable(payload))
}

fn unrepresentable(payload: &ResultPayload) -> DispatchError {
    DispatchError::UnrepresentableResult {
        payload: payload.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> ContentItem {
        ContentItem::Text { text: s.into() }
    }

    fn structured(value: Value) -> ContentItem {
        ContentItem::Structured { value }
    }

    #[test]
    fn test_text_items_in_order() {
        let payload = ResultPayload::new(vec![text("a"), text("b")]);
        assert_eq!(normalize_result(&payload).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_structured_ignored_when_text_present() {
        let payload = ResultPayload::new(vec![
            structured(json!({ "x": 1 })),
            text("Result: 7 + 5 = 12"),
        ]);
        assert_eq!(
            normalize_result(&payload).unwrap(),
            vec!["Result: 7 + 5 = 12"]
        );
    }

    #[test]
    fn test_empty_text_item_is_still_returned() {
        let payload = ResultPayload::new(vec![text("")]);
        assert_eq!(normalize_result(&payload).unwrap(), vec![""]);
    }

    #[test]
    fn test_single_structured_item_is_one_line() {
        let payload = ResultPayload::structured(json!({ "x": 1 }));
        let lines = normalize_result(&payload).unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], serde_json::to_string_pretty(&json!({ "x": 1 })).unwrap());
    }

    #[test]
    fn test_multiple_structured_fall_back_to_raw() {
        let raw = json!({ "content": [{ "type": "image" }], "structuredContent": { "x": 1 } });
        let payload = ResultPayload::new(vec![
            structured(json!({ "type": "image" })),
            structured(json!({ "x": 1 })),
        ])
        .with_raw(raw.clone());

        let lines = normalize_result(&payload).unwrap();
        assert_eq!(lines, vec![serde_json::to_string_pretty(&raw).unwrap()]);
    }

    #[test]
    fn test_multiple_structured_without_raw_serializes_payload() {
        let payload = ResultPayload::new(vec![structured(json!(1)), structured(json!(2))]);

        let lines = normalize_result(&payload).unwrap();
        assert_eq!(lines.len(), 1);
        let round: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(round["items"][1]["value"], 2);
    }

    #[test]
    fn test_raw_only_payload_is_serialized() {
        let payload = ResultPayload::default().with_raw(json!({ "content": [] }));
        let lines = normalize_result(&payload).unwrap();
        assert!(lines[0].contains("\"content\""));
    }

    #[test]
    fn test_empty_payload_fails_loudly() {
        let err = normalize_result(&ResultPayload::default()).unwrap_err();
        assert!(matches!(err, DispatchError::UnrepresentableResult { .. }));
    }
}
