use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One typed content item returned by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    Structured { value: Value },
}

/// Everything a single tool call returned, in server order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub items: Vec<ContentItem>,
    /// The complete result object as received, if the transport has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ResultPayload {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items, raw: None }
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Payload holding a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentItem::Text { text: text.into() }])
    }

    /// Payload holding a single structured item.
    pub fn structured(value: Value) -> Self {
        Self::new(vec![ContentItem::Structured { value }])
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.raw.as_ref().map_or(true, Value::is_null)
    }
}
